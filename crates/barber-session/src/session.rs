//! Capture session: source photo, selected style, swap result.
//!
//! State flow:
//!
//! ```text
//! NoSource → SourceReady → SourceAndStyleReady → Processing → ResultReady
//!                                   ↑                       ↘ SwapFailed
//!                                   └── new source / style ──┘
//! ```
//!
//! A style without a source stays in `NoSource`. The last successful result
//! survives failed attempts and input changes until a new swap succeeds.
//! Only one swap is in flight at a time; a second request while busy is a
//! no-op.

use crate::error::SessionError;
use crate::upload::Upload;
use barber_capture::frame::{is_dark_frame, DARK_FRAME_THRESHOLD};
use barber_capture::{BgrFrame, FrameSource};
use barber_core::catalog::DEFAULT_PAGE_SIZE;
use barber_core::normalize::{self, normalize};
use barber_core::{
    Canvas, CatalogPage, DownloadArtifact, EphemeralStore, ImageEncoding, Pagination,
    RenderedPage, StyleCatalog, StyleEntry,
};
use barber_swap::{FaceSwapClient, SwapError, SwapParams, SwapRequest};
use image::{DynamicImage, RgbImage};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed per-session settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub canvas: Canvas,
    pub page_size: usize,
    /// Encoding of the temp files handed to the swap client.
    pub encoding: ImageEncoding,
    pub swap_params: SwapParams,
    /// Upper bound on one swap, on top of whatever the client enforces.
    pub swap_deadline: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            page_size: DEFAULT_PAGE_SIZE,
            encoding: ImageEncoding::Jpeg,
            swap_params: SwapParams::default(),
            swap_deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoSource,
    SourceReady,
    SourceAndStyleReady,
    Processing,
    ResultReady,
    SwapFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Upload,
    Camera,
}

/// The user's face photo, normalized. At most one mode holds an image.
#[derive(Debug, Clone, Default)]
pub enum SourceImage {
    #[default]
    None,
    FromUpload(RgbImage),
    FromCamera(RgbImage),
}

impl SourceImage {
    pub fn image(&self) -> Option<&RgbImage> {
        match self {
            Self::None => None,
            Self::FromUpload(img) | Self::FromCamera(img) => Some(img),
        }
    }

    pub fn mode(&self) -> Option<SourceMode> {
        match self {
            Self::None => None,
            Self::FromUpload(_) => Some(SourceMode::Upload),
            Self::FromCamera(_) => Some(SourceMode::Camera),
        }
    }

    pub fn uploaded(&self) -> Option<&RgbImage> {
        match self {
            Self::FromUpload(img) => Some(img),
            _ => None,
        }
    }

    pub fn camera(&self) -> Option<&RgbImage> {
        match self {
            Self::FromCamera(img) => Some(img),
            _ => None,
        }
    }
}

/// The chosen style, with its normalized image kept on disk for the swap.
#[derive(Debug, Clone)]
pub struct Selection {
    pub entry: StyleEntry,
    pub image: RgbImage,
    pub materialized_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Busy,
    NoSource,
    NoStyle,
    NotInFlight,
}

/// What a swap request led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Nothing was sent; the session is unchanged.
    Skipped(SkipReason),
    Succeeded,
    /// The attempt failed; carries the user-facing message.
    Failed(String),
}

/// Render-ready view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub source_mode: Option<SourceMode>,
    pub style: Option<String>,
    pub has_result: bool,
    pub busy: bool,
    pub last_error: Option<String>,
}

/// One user's capture session.
pub struct Session {
    options: SessionOptions,
    store: EphemeralStore,
    source: SourceImage,
    selection: Option<Selection>,
    result: Option<RgbImage>,
    last_error: Option<String>,
    busy: bool,
    state: SessionState,
    pagination: Pagination,
    /// Temp copy of the source for the swap in flight.
    pending_source: Option<PathBuf>,
}

impl Session {
    pub fn new(options: SessionOptions, store: EphemeralStore) -> Self {
        Self {
            options,
            store,
            source: SourceImage::None,
            selection: None,
            result: None,
            last_error: None,
            busy: false,
            state: SessionState::NoSource,
            pagination: Pagination::default(),
            pending_source: None,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Last successful swap output, normalized to the canvas.
    pub fn result(&self) -> Option<&RgbImage> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            source_mode: self.source.mode(),
            style: self.selection.as_ref().map(|s| s.entry.key()),
            has_result: self.result.is_some(),
            busy: self.busy,
            last_error: self.last_error.clone(),
        }
    }

    /// Recompute the input-driven state. A swap in flight keeps `Processing`.
    fn settle(&mut self) {
        if self.busy {
            return;
        }
        self.state = match (self.source.image().is_some(), self.selection.is_some()) {
            (false, _) => SessionState::NoSource,
            (true, false) => SessionState::SourceReady,
            (true, true) => SessionState::SourceAndStyleReady,
        };
    }

    // --- Source ---

    /// Validate, decode and normalize an uploaded photo. Replaces any camera snapshot.
    pub fn set_source_from_upload(&mut self, upload: &Upload) -> Result<(), SessionError> {
        let format = upload.validate()?;
        let decoded = normalize::decode(upload.bytes())?;
        let image = normalize(&decoded, self.options.canvas);

        tracing::info!(
            name = upload.file_name().unwrap_or("<unnamed>"),
            format = ?format,
            width = decoded.width(),
            height = decoded.height(),
            "source set from upload"
        );
        self.source = SourceImage::FromUpload(image);
        self.settle();
        Ok(())
    }

    /// Normalize a camera frame. Replaces any uploaded photo.
    pub fn set_source_from_camera(&mut self, frame: &BgrFrame) -> Result<(), SessionError> {
        let rgb = frame.to_rgb_image()?;
        if is_dark_frame(&rgb, DARK_FRAME_THRESHOLD) {
            tracing::warn!(sequence = frame.sequence, "camera snapshot is almost black");
        }
        let image = normalize(&DynamicImage::ImageRgb8(rgb), self.options.canvas);

        tracing::info!(
            sequence = frame.sequence,
            width = frame.width,
            height = frame.height,
            "source set from camera"
        );
        self.source = SourceImage::FromCamera(image);
        self.settle();
        Ok(())
    }

    /// Take a snapshot from the most recent frame of `camera`.
    pub fn capture_from<S: FrameSource + ?Sized>(&mut self, camera: &S) -> Result<(), SessionError> {
        let frame = camera.latest_frame().ok_or(SessionError::NoFrame)?;
        self.set_source_from_camera(&frame)
    }

    /// Drop the source photo, whichever mode supplied it.
    pub fn clear_source(&mut self) {
        self.source = SourceImage::None;
        tracing::debug!("source cleared");
        self.settle();
    }

    // --- Style ---

    /// Load, normalize and materialize a catalog style, releasing the previous one.
    pub fn select_style(&mut self, entry: &StyleEntry) -> Result<(), SessionError> {
        let asset = normalize::load_image(&entry.asset_path)?;
        let image = normalize(&asset, self.options.canvas);
        let materialized_path = self.store.materialize(&image, self.options.encoding)?;

        let previous = self.selection.replace(Selection {
            entry: entry.clone(),
            image,
            materialized_path,
        });
        if let Some(previous) = previous {
            if let Err(err) = self.store.release(&previous.materialized_path) {
                tracing::warn!(error = %err, "failed to release previous style image");
            }
        }

        tracing::info!(style = %entry.key(), "style selected");
        self.settle();
        Ok(())
    }

    // --- Gallery ---

    /// Current page of `category` for this session.
    pub fn page<'c>(&self, catalog: &'c StyleCatalog, category: &str) -> CatalogPage<'c> {
        catalog.page(
            category,
            self.pagination.current(category),
            self.options.page_size,
        )
    }

    /// Current page of `category` with tiles loaded at canvas size.
    pub fn render_gallery(&self, catalog: &StyleCatalog, category: &str) -> RenderedPage {
        catalog.render_page(
            category,
            self.pagination.current(category),
            self.options.page_size,
            self.options.canvas,
        )
    }

    pub fn next_page(&mut self, catalog: &StyleCatalog, category: &str) -> usize {
        self.pagination
            .next(catalog, category, self.options.page_size)
    }

    pub fn prev_page(&mut self, category: &str) -> usize {
        self.pagination.prev(category)
    }

    // --- Swap ---

    /// Run one swap through `client`. A no-op unless a source and a style are
    /// present and no other swap is in flight.
    ///
    /// If the returned future is dropped before the client answers, the
    /// attempt is recorded as interrupted and the session is usable again.
    pub async fn request_swap<C: FaceSwapClient>(&mut self, client: &C) -> SwapOutcome {
        let request = match self.begin_swap() {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };
        let deadline = self.options.swap_deadline;
        let in_flight = InFlight {
            session: Some(self),
        };

        let result = match deadline {
            Some(limit) => tokio::time::timeout(limit, client.swap(&request))
                .await
                .unwrap_or(Err(SwapError::Timeout(limit))),
            None => client.swap(&request).await,
        };
        in_flight.finish(result)
    }

    /// First half of [`request_swap`](Self::request_swap): mark the session
    /// busy and build the request. `Err` is the final outcome when nothing
    /// could be sent.
    pub fn begin_swap(&mut self) -> Result<SwapRequest, SwapOutcome> {
        if self.busy {
            tracing::debug!("swap already in flight; ignoring request");
            return Err(SwapOutcome::Skipped(SkipReason::Busy));
        }
        let Some(source) = self.source.image() else {
            return Err(SwapOutcome::Skipped(SkipReason::NoSource));
        };
        let Some(selection) = &self.selection else {
            return Err(SwapOutcome::Skipped(SkipReason::NoStyle));
        };
        let target_path = selection.materialized_path.clone();

        self.busy = true;
        self.state = SessionState::Processing;

        let source_path = match self.store.materialize(source, self.options.encoding) {
            Ok(path) => path,
            Err(err) => return Err(self.fail(err.into())),
        };
        self.pending_source = Some(source_path.clone());

        tracing::info!(
            source = %source_path.display(),
            target = %target_path.display(),
            "face swap started"
        );
        Ok(SwapRequest {
            source_path,
            target_path,
            params: self.options.swap_params.clone(),
        })
    }

    /// Second half of [`request_swap`](Self::request_swap): record the
    /// client's answer and clear the busy flag.
    pub fn finish_swap(&mut self, result: Result<DynamicImage, SwapError>) -> SwapOutcome {
        self.complete(result.map_err(SessionError::from))
    }

    fn abandon_swap(&mut self) {
        if self.busy {
            self.complete(Err(SessionError::Interrupted));
        }
    }

    fn complete(&mut self, result: Result<DynamicImage, SessionError>) -> SwapOutcome {
        if !self.busy {
            tracing::warn!("swap result arrived with no swap in flight; dropping it");
            return SwapOutcome::Skipped(SkipReason::NotInFlight);
        }
        if let Some(path) = self.pending_source.take() {
            if let Err(err) = self.store.release(&path) {
                tracing::warn!(error = %err, "failed to release source temp image");
            }
        }

        let outcome = match result {
            Ok(image) => {
                self.result = Some(normalize(&image, self.options.canvas));
                self.last_error = None;
                self.busy = false;
                self.state = SessionState::ResultReady;
                tracing::info!("face swap succeeded");
                SwapOutcome::Succeeded
            }
            Err(err) => self.fail(err),
        };

        // Inputs cleared while the swap ran: fall back to what is left.
        if self.source.image().is_none() || self.selection.is_none() {
            self.settle();
        }
        outcome
    }

    fn fail(&mut self, err: SessionError) -> SwapOutcome {
        tracing::warn!(error = %err, "face swap failed");
        let message = err.user_message();
        self.last_error = Some(message.clone());
        self.busy = false;
        self.state = SessionState::SwapFailed;
        SwapOutcome::Failed(message)
    }

    // --- Output ---

    /// The last result as a JPEG download, if there is one.
    pub fn download(&self) -> Result<Option<DownloadArtifact>, SessionError> {
        let Some(result) = &self.result else {
            return Ok(None);
        };
        Ok(Some(DownloadArtifact::from_image(result, ImageEncoding::Jpeg)?))
    }

    /// End the session, deleting every temp file it created.
    /// Returns how many files could not be removed.
    pub fn close(mut self) -> usize {
        self.selection = None;
        self.pending_source = None;
        self.store.release_all()
    }
}

/// Holds the session while a swap is awaited. Dropped without
/// [`finish`](Self::finish), it abandons the attempt.
struct InFlight<'a> {
    session: Option<&'a mut Session>,
}

impl InFlight<'_> {
    fn finish(mut self, result: Result<DynamicImage, SwapError>) -> SwapOutcome {
        match self.session.take() {
            Some(session) => session.finish_swap(result),
            None => SwapOutcome::Skipped(SkipReason::NotInFlight),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::warn!("face swap dropped before the client answered");
            session.abandon_swap();
        }
    }
}
