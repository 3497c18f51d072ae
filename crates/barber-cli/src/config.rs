use barber_core::{Canvas, CatalogError, EphemeralStore, ImageEncoding, StyleCatalog};
use barber_session::SessionOptions;
use barber_swap::gradio::{DEFAULT_API_NAME, DEFAULT_API_PREFIX, DEFAULT_ENDPOINT};
use barber_swap::{SwapConfig, SwapParams};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

const MAX_INTENSITY: u8 = 100;

/// CLI configuration, loaded from environment variables.
#[derive(Serialize)]
pub struct Config {
    /// Directory the catalog's asset file names are resolved against (default: styles).
    pub styles_dir: PathBuf,
    /// Alternate catalog TOML; the embedded catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Display canvas size in pixels (default: 400×400).
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Gallery styles per page.
    pub page_size: usize,
    /// Where temp images are written (default: system temp dir).
    pub temp_dir: Option<PathBuf>,
    pub swap_endpoint: String,
    pub swap_api_prefix: String,
    pub swap_api_name: String,
    /// Deadline in seconds for one whole swap, at least 1.
    pub swap_timeout_secs: u64,
    /// Swap strength, capped at 100.
    pub swap_intensity: u8,
    pub swap_adv_intensity: u8,
    #[serde(serialize_with = "redact")]
    pub hf_token: Option<String>,
}

impl Config {
    /// Load configuration from `BARBER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let hf_token = var("BARBER_HF_TOKEN")
            .or_else(|| var("HF_TOKEN"))
            .filter(|t| !t.trim().is_empty());

        Self {
            styles_dir: var("BARBER_STYLES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("styles")),
            catalog_path: var("BARBER_CATALOG").map(PathBuf::from),
            canvas_width: parse_or(var("BARBER_CANVAS_WIDTH"), 400),
            canvas_height: parse_or(var("BARBER_CANVAS_HEIGHT"), 400),
            page_size: parse_or(var("BARBER_PAGE_SIZE"), barber_core::catalog::DEFAULT_PAGE_SIZE),
            temp_dir: var("BARBER_TEMP_DIR").map(PathBuf::from),
            swap_endpoint: var("BARBER_SWAP_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            swap_api_prefix: var("BARBER_SWAP_API_PREFIX")
                .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            swap_api_name: var("BARBER_SWAP_API_NAME")
                .unwrap_or_else(|| DEFAULT_API_NAME.to_string()),
            swap_timeout_secs: parse_or(var("BARBER_SWAP_TIMEOUT_SECS"), 60_u64).max(1),
            swap_intensity: parse_or(var("BARBER_SWAP_INTENSITY"), MAX_INTENSITY)
                .min(MAX_INTENSITY),
            swap_adv_intensity: parse_or(var("BARBER_SWAP_ADV_INTENSITY"), MAX_INTENSITY)
                .min(MAX_INTENSITY),
            hf_token,
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.canvas_width, self.canvas_height)
    }

    /// The embedded catalog, or the one at `BARBER_CATALOG`.
    pub fn catalog(&self) -> Result<StyleCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => StyleCatalog::from_file(path, self.styles_dir.clone()),
            None => StyleCatalog::builtin(self.styles_dir.clone()),
        }
    }

    pub fn swap_timeout(&self) -> Duration {
        Duration::from_secs(self.swap_timeout_secs)
    }

    pub fn swap_config(&self) -> SwapConfig {
        SwapConfig {
            endpoint: self.swap_endpoint.clone(),
            api_prefix: self.swap_api_prefix.clone(),
            api_name: self.swap_api_name.clone(),
            token: self.hf_token.clone(),
            timeout: self.swap_timeout(),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            canvas: self.canvas(),
            page_size: self.page_size.max(1),
            encoding: ImageEncoding::Jpeg,
            swap_params: SwapParams {
                intensity: self.swap_intensity,
                advanced_intensity: self.swap_adv_intensity,
                settings: Vec::new(),
            },
            swap_deadline: Some(self.swap_timeout()),
        }
    }

    pub fn store(&self) -> EphemeralStore {
        match &self.temp_dir {
            Some(dir) => EphemeralStore::new(dir.clone()),
            None => EphemeralStore::in_system_temp(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn redact<S: Serializer>(token: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match token {
        Some(_) => s.serialize_str("<redacted>"),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.styles_dir, PathBuf::from("styles"));
        assert_eq!(config.canvas(), Canvas::default());
        assert_eq!(config.page_size, 6);
        assert_eq!(config.swap_timeout_secs, 60);
        assert_eq!(config.swap_endpoint, DEFAULT_ENDPOINT);
        assert!(config.hf_token.is_none());
        assert_eq!(config.session_options().swap_params, SwapParams::default());
    }

    #[test]
    fn test_token_fallback_and_precedence() {
        assert_eq!(
            config(&[("HF_TOKEN", "hf_b")]).hf_token.as_deref(),
            Some("hf_b")
        );
        assert_eq!(
            config(&[("HF_TOKEN", "hf_b"), ("BARBER_HF_TOKEN", "hf_a")])
                .hf_token
                .as_deref(),
            Some("hf_a")
        );
        assert!(config(&[("BARBER_HF_TOKEN", "  ")]).hf_token.is_none());
    }

    #[test]
    fn test_bad_values_fall_back_and_intensity_is_capped() {
        let config = config(&[
            ("BARBER_PAGE_SIZE", "lots"),
            ("BARBER_SWAP_INTENSITY", "250"),
            ("BARBER_SWAP_ADV_INTENSITY", "40"),
            ("BARBER_SWAP_TIMEOUT_SECS", " 5 "),
        ]);
        assert_eq!(config.page_size, 6);
        // 250 overflows u8 and falls back to the default.
        assert_eq!(config.swap_intensity, 100);
        assert_eq!(config.swap_adv_intensity, 40);
        assert_eq!(config.swap_config().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_timeout_is_raised_to_one_second() {
        let config = config(&[("BARBER_SWAP_TIMEOUT_SECS", "0")]);
        assert_eq!(config.swap_config().timeout, Duration::from_secs(1));
        assert_eq!(
            config.session_options().swap_deadline,
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_serialized_config_hides_token() {
        let config = config(&[("BARBER_HF_TOKEN", "hf_secret")]);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hf_secret"));
        assert!(json.contains("<redacted>"));
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = config(&[]).catalog().unwrap();
        assert_eq!(catalog.categories().count(), 4);
    }
}
