//! barber-core: Image normalization, temp-file store and style catalog.
//!
//! Everything the capture session needs that does not touch the network
//! or the camera: fitting images onto a fixed white canvas, writing them to
//! uniquely named temp files, and enumerating the static hairstyle catalog.

pub mod catalog;
pub mod download;
pub mod normalize;
pub mod store;
pub mod types;

pub use catalog::{CatalogError, CatalogPage, Pagination, RenderedPage, StyleCatalog};
pub use download::DownloadArtifact;
pub use normalize::{normalize, normalize_opt, NormalizeError};
pub use store::{EphemeralStore, ImageEncoding, StoreError};
pub use types::{Canvas, StyleEntry};
