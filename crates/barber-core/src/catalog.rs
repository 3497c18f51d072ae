//! Hairstyle catalog.
//!
//! A static category → style → asset table. The built-in table is embedded
//! at compile time from `contrib/styles.toml`; alternate tables can be
//! loaded from a TOML file with the same layout. Asset files are never
//! scanned for: existence is checked lazily when a page is rendered, and a
//! missing asset only drops its own tile.

use crate::normalize::{self, NormalizeError};
use crate::types::{Canvas, StyleEntry};
use image::RgbImage;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../../../contrib/styles.toml");

/// Styles per gallery page (3 columns × 2 rows).
pub const DEFAULT_PAGE_SIZE: usize = 6;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("bad catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("duplicate style {category}/{name} in catalog")]
    DuplicateEntry { category: String, name: String },
    #[error("duplicate category {0} in catalog")]
    DuplicateCategory(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    category: Vec<CategorySection>,
}

#[derive(Debug, Deserialize)]
struct CategorySection {
    name: String,
    #[serde(default)]
    styles: Vec<StyleSection>,
}

#[derive(Debug, Deserialize)]
struct StyleSection {
    name: String,
    file: String,
}

#[derive(Debug, Clone)]
struct Category {
    name: String,
    entries: Vec<StyleEntry>,
}

/// One page of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage<'a> {
    pub entries: &'a [StyleEntry],
    pub page_index: usize,
    pub total_pages: usize,
}

/// A style tile with its asset loaded and normalized.
#[derive(Debug, Clone)]
pub struct StyleTile {
    pub entry: StyleEntry,
    pub image: RgbImage,
}

/// A tile whose asset could not be loaded.
#[derive(Debug)]
pub struct MissingAsset {
    pub entry: StyleEntry,
    pub error: NormalizeError,
}

/// A page with assets resolved; unusable tiles are skipped into `missing`.
#[derive(Debug)]
pub struct RenderedPage {
    pub tiles: Vec<StyleTile>,
    pub missing: Vec<MissingAsset>,
    pub page_index: usize,
    pub total_pages: usize,
}

/// Immutable, ordered style catalog.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    categories: Vec<Category>,
    styles_dir: PathBuf,
}

impl StyleCatalog {
    /// The embedded catalog with assets resolved against `styles_dir`.
    pub fn builtin(styles_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG, styles_dir)
    }

    /// Load a catalog file with the same layout as `contrib/styles.toml`.
    pub fn from_file(path: &Path, styles_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let src = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&src, styles_dir)
    }

    pub fn from_toml_str(src: &str, styles_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let styles_dir = styles_dir.into();
        let file: CatalogFile = toml::from_str(src)?;

        let mut seen_categories = HashSet::new();
        let mut categories = Vec::with_capacity(file.category.len());
        for section in file.category {
            if !seen_categories.insert(section.name.clone()) {
                return Err(CatalogError::DuplicateCategory(section.name));
            }

            let mut seen_names = HashSet::new();
            let mut entries = Vec::with_capacity(section.styles.len());
            for style in section.styles {
                if !seen_names.insert(style.name.clone()) {
                    return Err(CatalogError::DuplicateEntry {
                        category: section.name,
                        name: style.name,
                    });
                }
                entries.push(StyleEntry {
                    category: section.name.clone(),
                    display_name: style.name,
                    asset_path: styles_dir.join(style.file),
                });
            }
            categories.push(Category {
                name: section.name,
                entries,
            });
        }

        tracing::debug!(
            categories = categories.len(),
            styles_dir = %styles_dir.display(),
            "style catalog loaded"
        );
        Ok(Self {
            categories,
            styles_dir,
        })
    }

    pub fn styles_dir(&self) -> &Path {
        &self.styles_dir
    }

    /// Category names in display order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Entries of `category` in display order; empty for an unknown category.
    pub fn entries(&self, category: &str) -> &[StyleEntry] {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, category: &str, display_name: &str) -> Option<&StyleEntry> {
        self.entries(category)
            .iter()
            .find(|e| e.display_name == display_name)
    }

    /// Page count for `category`: `ceil(len / page_size)`, at least 1.
    pub fn total_pages(&self, category: &str, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        self.entries(category).len().div_ceil(page_size).max(1)
    }

    /// Slice out one page. An out-of-range index yields an empty slice.
    pub fn page(&self, category: &str, page_index: usize, page_size: usize) -> CatalogPage<'_> {
        let page_size = page_size.max(1);
        let entries = self.entries(category);
        let start = page_index.saturating_mul(page_size).min(entries.len());
        let end = start.saturating_add(page_size).min(entries.len());

        CatalogPage {
            entries: &entries[start..end],
            page_index,
            total_pages: self.total_pages(category, page_size),
        }
    }

    /// Load and normalize every tile of a page, skipping unusable assets.
    pub fn render_page(
        &self,
        category: &str,
        page_index: usize,
        page_size: usize,
        canvas: Canvas,
    ) -> RenderedPage {
        let page = self.page(category, page_index, page_size);
        let mut tiles = Vec::with_capacity(page.entries.len());
        let mut missing = Vec::new();

        for entry in page.entries {
            match normalize::load_image(&entry.asset_path) {
                Ok(img) => tiles.push(StyleTile {
                    entry: entry.clone(),
                    image: normalize::normalize(&img, canvas),
                }),
                Err(error) => {
                    tracing::warn!(
                        style = %entry.key(),
                        path = %entry.asset_path.display(),
                        error = %error,
                        "style asset unavailable; skipping tile"
                    );
                    missing.push(MissingAsset {
                        entry: entry.clone(),
                        error,
                    });
                }
            }
        }

        RenderedPage {
            tiles,
            missing,
            page_index: page.page_index,
            total_pages: page.total_pages,
        }
    }
}

/// Per-category gallery page index, clamped to the category's bounds.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pages: HashMap<String, usize>,
}

impl Pagination {
    pub fn current(&self, category: &str) -> usize {
        self.pages.get(category).copied().unwrap_or(0)
    }

    /// Advance one page, stopping at the last page.
    pub fn next(&mut self, catalog: &StyleCatalog, category: &str, page_size: usize) -> usize {
        let last = catalog.total_pages(category, page_size) - 1;
        let page = (self.current(category) + 1).min(last);
        self.pages.insert(category.to_string(), page);
        page
    }

    /// Go back one page, stopping at the first page.
    pub fn prev(&mut self, category: &str) -> usize {
        let page = self.current(category).saturating_sub(1);
        self.pages.insert(category.to_string(), page);
        page
    }
}
