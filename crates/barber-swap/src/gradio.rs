//! Gradio REST client for the hosted face-swap Space.
//!
//! One swap is four HTTP round trips against `{endpoint}{api_prefix}`:
//!
//! 1. `POST /upload` (multipart `files`) for each input image → server paths
//! 2. `POST /call/{api_name}` with the positional inputs → `event_id`
//! 3. `GET /call/{api_name}/{event_id}` → server-sent events, ending in
//!    `complete` (outputs) or `error`
//! 4. `GET` the first output file and decode it
//!
//! Every request carries the bearer token. The whole sequence runs under a
//! single deadline.

use crate::client::{FaceSwapClient, SwapParams, SwapRequest};
use crate::SwapError;
use image::DynamicImage;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://felixrosberg-face-swap.hf.space";
pub const DEFAULT_API_PREFIX: &str = "/gradio_api";
pub const DEFAULT_API_NAME: &str = "run_inference";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const NO_ERROR_MESSAGE: &str = "the model reported an error without a message";

/// Connection settings for [`GradioClient`].
#[derive(Clone)]
pub struct SwapConfig {
    pub endpoint: String,
    pub api_prefix: String,
    pub api_name: String,
    /// Hugging Face access token; required.
    pub token: Option<String>,
    /// Deadline for one whole swap.
    pub timeout: Duration,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            api_name: DEFAULT_API_NAME.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for SwapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapConfig")
            .field("endpoint", &self.endpoint)
            .field("api_prefix", &self.api_prefix)
            .field("api_name", &self.api_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct EventId {
    event_id: String,
}

/// HTTP face-swap client backed by a Gradio Space.
pub struct GradioClient {
    http: reqwest::Client,
    base_url: String,
    api_name: String,
    token: String,
    timeout: Duration,
}

impl GradioClient {
    /// Build a client. Fails immediately when no token is configured so the
    /// problem surfaces before any upload starts.
    pub fn new(config: SwapConfig) -> Result<Self, SwapError> {
        let token = config
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SwapError::Configuration("no API token configured".into()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SwapError::Configuration(format!("HTTP client setup failed: {e}")))?;

        let base_url = format!(
            "{}{}",
            config.endpoint.trim_end_matches('/'),
            config.api_prefix.trim_end_matches('/')
        );
        let api_name = config.api_name.trim_start_matches('/').to_string();

        tracing::debug!(base_url = %base_url, api = %api_name, "face-swap client ready");
        Ok(Self {
            http,
            base_url,
            api_name,
            token,
            timeout: config.timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport(&self) -> impl Fn(reqwest::Error) -> SwapError {
        let timeout = self.timeout;
        move |e| SwapError::from_transport(e, timeout)
    }

    /// Upload one local image, returning its server-side path.
    async fn upload(&self, path: &Path) -> Result<String, SwapError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| SwapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))
            .map_err(self.transport())?;

        let response = self
            .http
            .post(self.url("upload"))
            .bearer_auth(&self.token)
            .multipart(Form::new().part("files", part))
            .send()
            .await
            .map_err(self.transport())?;
        let response = check_status(response).await?;

        let paths: Vec<String> = response
            .json()
            .await
            .map_err(|e| SwapError::RemoteModel(format!("unexpected upload response: {e}")))?;
        let server_path = paths
            .into_iter()
            .next()
            .ok_or_else(|| SwapError::RemoteModel("upload returned no file path".into()))?;

        tracing::debug!(local = %path.display(), server = %server_path, "uploaded image");
        Ok(server_path)
    }

    /// Queue the prediction, returning the event id to poll.
    async fn submit(&self, payload: &Value) -> Result<String, SwapError> {
        let response = self
            .http
            .post(self.url(&format!("call/{}", self.api_name)))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(self.transport())?;
        let response = check_status(response).await?;

        let id: EventId = response
            .json()
            .await
            .map_err(|e| SwapError::RemoteModel(format!("unexpected call response: {e}")))?;
        Ok(id.event_id)
    }

    /// Read the event stream for `event_id` until it completes.
    async fn await_result(&self, event_id: &str) -> Result<Value, SwapError> {
        let response = self
            .http
            .get(self.url(&format!("call/{}/{event_id}", self.api_name)))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(self.transport())?;
        let response = check_status(response).await?;
        let body = response.text().await.map_err(self.transport())?;
        parse_event_stream(&body)
    }

    async fn fetch_output(&self, outputs: &Value) -> Result<DynamicImage, SwapError> {
        let url = output_location(outputs, &self.base_url)?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(self.transport())?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(self.transport())?;

        image::load_from_memory(&bytes).map_err(|e| SwapError::Decode(e.to_string()))
    }

    async fn run(&self, request: &SwapRequest) -> Result<DynamicImage, SwapError> {
        let source = self.upload(&request.source_path).await?;
        let target = self.upload(&request.target_path).await?;

        let payload = build_payload(&source, &target, &request.params);
        let event_id = self.submit(&payload).await?;
        tracing::info!(event_id = %event_id, "face-swap queued");

        let outputs = self.await_result(&event_id).await?;
        let image = self.fetch_output(&outputs).await?;
        tracing::info!(
            width = image.width(),
            height = image.height(),
            "face-swap result received"
        );
        Ok(image)
    }
}

impl FaceSwapClient for GradioClient {
    async fn swap(&self, request: &SwapRequest) -> Result<DynamicImage, SwapError> {
        request.params.validate()?;
        match tokio::time::timeout(self.timeout, self.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(SwapError::Timeout(self.timeout)),
        }
    }
}

/// Turn a non-2xx response into a remote error carrying the response body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SwapError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SwapError::RemoteModel(format!("HTTP {status}: {}", body.trim())))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

fn file_data(server_path: &str) -> Value {
    json!({ "path": server_path, "meta": { "_type": "gradio.FileData" } })
}

/// Positional inputs for the swap endpoint: source, target, intensity,
/// advanced intensity, settings.
pub fn build_payload(source: &str, target: &str, params: &SwapParams) -> Value {
    json!({
        "data": [
            file_data(source),
            file_data(target),
            params.intensity,
            params.advanced_intensity,
            params.settings,
        ]
    })
}

/// Extract the outputs of a finished prediction from its event stream.
///
/// Each event is an `event: <name>` line followed by `data: <json>` lines.
/// `complete` carries the outputs, `error` the remote failure message;
/// `generating` and `heartbeat` are ignored.
pub fn parse_event_stream(body: &str) -> Result<Value, SwapError> {
    let mut event = "";
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();

        match event {
            "complete" => {
                return serde_json::from_str(data)
                    .map_err(|e| SwapError::RemoteModel(format!("malformed result event: {e}")));
            }
            "error" => {
                let message = match serde_json::from_str::<Value>(data) {
                    Ok(Value::String(s)) => s,
                    Ok(Value::Null) => NO_ERROR_MESSAGE.to_string(),
                    Ok(other) => other.to_string(),
                    Err(_) if data.is_empty() => NO_ERROR_MESSAGE.to_string(),
                    Err(_) => data.to_string(),
                };
                return Err(SwapError::RemoteModel(message));
            }
            _ => {}
        }
    }
    Err(SwapError::RemoteModel(
        "event stream ended without a result".into(),
    ))
}

/// Where to download the first output image from.
pub fn output_location(outputs: &Value, base_url: &str) -> Result<String, SwapError> {
    let first = outputs
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| SwapError::RemoteModel("swap returned no outputs".into()))?;

    let from_path = |path: &str| format!("{base_url}/file={path}");
    match first {
        Value::Object(file) => {
            if let Some(url) = file.get("url").and_then(Value::as_str) {
                return Ok(url.to_string());
            }
            file.get("path")
                .and_then(Value::as_str)
                .map(from_path)
                .ok_or_else(|| SwapError::RemoteModel("swap output has no file".into()))
        }
        Value::String(path) => Ok(from_path(path.as_str())),
        _ => Err(SwapError::RemoteModel("swap returned no image".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with_token() -> SwapConfig {
        SwapConfig {
            // Nothing listens here; tests below never get as far as the network.
            endpoint: "http://127.0.0.1:9".into(),
            token: Some("hf_test".into()),
            ..SwapConfig::default()
        }
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let err = GradioClient::new(SwapConfig::default()).err().unwrap();
        assert!(matches!(err, SwapError::Configuration(_)));

        let blank = SwapConfig {
            token: Some("   ".into()),
            ..SwapConfig::default()
        };
        assert!(matches!(
            GradioClient::new(blank),
            Err(SwapError::Configuration(_))
        ));
    }

    #[test]
    fn test_urls_are_joined_cleanly() {
        let client = GradioClient::new(SwapConfig {
            endpoint: "https://example.hf.space/".into(),
            api_name: "/run_inference".into(),
            token: Some("t".into()),
            ..SwapConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("upload"), "https://example.hf.space/gradio_api/upload");
        assert_eq!(
            client.url(&format!("call/{}", client.api_name)),
            "https://example.hf.space/gradio_api/call/run_inference"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", config_with_token());
        assert!(!rendered.contains("hf_test"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_payload_layout() {
        let params = SwapParams {
            intensity: 80,
            advanced_intensity: 100,
            settings: vec!["Adversarial Defense".into()],
        };
        let payload = build_payload("/tmp/gradio/a.jpg", "/tmp/gradio/b.jpg", &params);
        assert_eq!(
            payload,
            json!({
                "data": [
                    { "path": "/tmp/gradio/a.jpg", "meta": { "_type": "gradio.FileData" } },
                    { "path": "/tmp/gradio/b.jpg", "meta": { "_type": "gradio.FileData" } },
                    80,
                    100,
                    ["Adversarial Defense"],
                ]
            })
        );
    }

    #[test]
    fn test_event_stream_complete() {
        let body = "event: generating\ndata: null\n\nevent: complete\ndata: [{\"path\": \"/tmp/out.png\", \"url\": \"https://x/file=/tmp/out.png\"}]\n\n";
        let outputs = parse_event_stream(body).unwrap();
        assert_eq!(outputs[0]["path"], "/tmp/out.png");
    }

    #[test]
    fn test_event_stream_error_keeps_remote_message() {
        let body = "event: error\r\ndata: \"No face found in source image\"\r\n\r\n";
        let err = parse_event_stream(body).unwrap_err();
        assert!(matches!(err, SwapError::RemoteModel(ref m) if m == "No face found in source image"));
    }

    #[test]
    fn test_event_stream_error_without_message() {
        let err = parse_event_stream("event: error\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, SwapError::RemoteModel(ref m) if m.contains("without a message")));
    }

    #[test]
    fn test_event_stream_truncated() {
        let err = parse_event_stream("event: heartbeat\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, SwapError::RemoteModel(ref m) if m.contains("without a result")));
    }

    #[test]
    fn test_output_location_prefers_url() {
        let outputs = json!([{ "path": "/tmp/out.webp", "url": "https://cdn/out.webp" }]);
        assert_eq!(
            output_location(&outputs, "https://s/gradio_api").unwrap(),
            "https://cdn/out.webp"
        );
    }

    #[test]
    fn test_output_location_falls_back_to_path() {
        let outputs = json!([{ "path": "/tmp/out.webp", "url": null }]);
        assert_eq!(
            output_location(&outputs, "https://s/gradio_api").unwrap(),
            "https://s/gradio_api/file=/tmp/out.webp"
        );
        let bare = json!(["/tmp/out.webp"]);
        assert_eq!(
            output_location(&bare, "https://s/gradio_api").unwrap(),
            "https://s/gradio_api/file=/tmp/out.webp"
        );
    }

    #[test]
    fn test_output_location_requires_an_output() {
        assert!(output_location(&json!([]), "b").is_err());
        assert!(output_location(&json!([null]), "b").is_err());
        assert!(output_location(&json!({}), "b").is_err());
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("a.jpg")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_invalid_params_are_rejected_before_upload() {
        let client = GradioClient::new(config_with_token()).unwrap();
        let request = SwapRequest {
            source_path: PathBuf::from("a.jpg"),
            target_path: PathBuf::from("b.jpg"),
            params: SwapParams {
                intensity: 150,
                ..SwapParams::default()
            },
        };
        assert!(matches!(
            client.swap(&request).await,
            Err(SwapError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = GradioClient::new(config_with_token()).unwrap();
        let request = SwapRequest {
            source_path: dir.path().join("missing.jpg"),
            target_path: dir.path().join("also-missing.jpg"),
            params: SwapParams::default(),
        };
        assert!(matches!(
            client.swap(&request).await,
            Err(SwapError::Io { .. })
        ));
    }
}
