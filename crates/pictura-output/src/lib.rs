//! On-disk storage for generated image batches
//!
//! Images live at `<base>/<timestamp>/<slug>/<ratio>.png`, one directory per
//! prompt per generation run.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod slug;

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use pictura_core::{ImageResult, SupportedRatio};
use regex::Regex;
use serde::Serialize;

pub use error::{OutputError, Result};
pub use slug::{DEFAULT_SLUG_LENGTH, filename_to_ratio, generate_slug, generate_timestamp, ratio_to_filename};

/// Batches returned by [`OutputManager::list_batches`] when no limit is given
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// How many recent batches [`OutputManager::load_batch`] searches
const LOAD_SEARCH_LIMIT: usize = 100;

/// A saved image inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchImage {
    pub ratio: SupportedRatio,
    pub path: PathBuf,
}

/// One prompt's images from one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchInfo {
    pub timestamp: String,
    pub slug: String,
    pub path: PathBuf,
    pub images: Vec<BatchImage>,
}

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}-\d{6}$").expect("must be valid regex"))
}

/// Reads and writes image batches under a base directory
#[derive(Debug, Clone)]
pub struct OutputManager {
    base_dir: PathBuf,
}

impl OutputManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where an image for `ratio` in a batch is stored
    pub fn image_path(&self, slug: &str, timestamp: &str, ratio: SupportedRatio) -> PathBuf {
        self.base_dir
            .join(timestamp)
            .join(slug)
            .join(format!("{}.png", ratio_to_filename(ratio)))
    }

    /// Write one image into its batch directory
    pub async fn save_image(&self, image: &ImageResult, slug: &str, timestamp: &str) -> Result<PathBuf> {
        check_component(slug)?;
        check_timestamp(timestamp)?;

        let path = self.image_path(slug, timestamp, image.ratio);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| OutputError::io(dir, source))?;
        }

        tokio::fs::write(&path, &image.data)
            .await
            .map_err(|source| OutputError::io(&path, source))?;

        tracing::debug!(path = %path.display(), bytes = image.data.len(), "saved image");
        Ok(path)
    }

    /// Write images one after another, returning their paths in order
    pub async fn save_batch(&self, images: &[ImageResult], slug: &str, timestamp: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(images.len());
        for image in images {
            paths.push(self.save_image(image, slug, timestamp).await?);
        }

        tracing::info!(slug, timestamp, count = paths.len(), "saved batch");
        Ok(paths)
    }

    /// Most recent batches first, skipping anything that is not a batch
    pub async fn list_batches(&self, limit: usize) -> Result<Vec<BatchInfo>> {
        let Some(mut timestamps) = read_dir_names(&self.base_dir).await? else {
            return Ok(Vec::new());
        };

        timestamps.retain(|name| timestamp_re().is_match(name));
        timestamps.sort_unstable_by(|a, b| b.cmp(a));

        let mut batches = Vec::new();

        'timestamps: for timestamp in timestamps {
            let timestamp_dir = self.base_dir.join(&timestamp);
            if !is_dir(&timestamp_dir).await {
                continue;
            }

            let Some(mut slugs) = read_dir_names(&timestamp_dir).await? else {
                continue;
            };
            slugs.sort_unstable();

            for slug in slugs {
                if batches.len() >= limit {
                    break 'timestamps;
                }

                let slug_dir = timestamp_dir.join(&slug);
                if !is_dir(&slug_dir).await {
                    continue;
                }

                let images = list_images(&slug_dir).await?;
                if images.is_empty() {
                    continue;
                }

                batches.push(BatchInfo {
                    timestamp: timestamp.clone(),
                    slug,
                    path: slug_dir,
                    images,
                });
            }
        }

        Ok(batches)
    }

    /// Newest batch with this slug among recent ones
    pub async fn load_batch(&self, slug: &str) -> Result<Option<BatchInfo>> {
        Ok(self
            .list_batches(LOAD_SEARCH_LIMIT)
            .await?
            .into_iter()
            .find(|batch| batch.slug == slug))
    }

    /// Remove a batch, and its timestamp directory once empty
    ///
    /// Returns `false` when the batch does not exist.
    pub async fn delete_batch(&self, timestamp: &str, slug: &str) -> Result<bool> {
        check_component(slug)?;
        check_timestamp(timestamp)?;

        let timestamp_dir = self.base_dir.join(timestamp);
        let batch_dir = timestamp_dir.join(slug);

        match tokio::fs::remove_dir_all(&batch_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(OutputError::io(&batch_dir, source)),
        }

        if read_dir_names(&timestamp_dir).await?.is_some_and(|rest| rest.is_empty()) {
            tokio::fs::remove_dir(&timestamp_dir)
                .await
                .map_err(|source| OutputError::io(&timestamp_dir, source))?;
        }

        tracing::info!(timestamp, slug, "deleted batch");
        Ok(true)
    }
}

fn check_component(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(OutputError::InvalidName(name.to_owned()));
    }
    Ok(())
}

fn check_timestamp(timestamp: &str) -> Result<()> {
    if !timestamp_re().is_match(timestamp) {
        return Err(OutputError::InvalidName(timestamp.to_owned()));
    }
    Ok(())
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_dir())
}

/// Entry names in a directory, or `None` when it does not exist
async fn read_dir_names(dir: &Path) -> Result<Option<Vec<String>>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(OutputError::io(dir, source)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| OutputError::io(dir, source))?
    {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }

    Ok(Some(names))
}

async fn list_images(dir: &Path) -> Result<Vec<BatchImage>> {
    let mut names = read_dir_names(dir).await?.unwrap_or_default();
    names.sort_unstable();

    Ok(names
        .into_iter()
        .filter(|name| name.ends_with(".png"))
        .filter_map(|name| {
            filename_to_ratio(&name).map(|ratio| BatchImage {
                ratio,
                path: dir.join(&name),
            })
        })
        .collect())
}
