//! Upload session configuration.
//!
//! Raw values are stored as given; the effective values come from the
//! accessor methods, which clamp the part size to the store's minimum
//! allowed part size and the concurrency limit to a floor of 1.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Minimum part size accepted by the store for any part other than the
/// final one (5 MiB).
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Configuration for an upload session.
///
/// # Examples
///
/// ```
/// use partstream_core::config::{MIN_PART_SIZE, UploadConfig};
///
/// let config = UploadConfig::default();
/// assert_eq!(config.part_size(), MIN_PART_SIZE);
/// assert_eq!(config.concurrent_parts(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    /// Requested part size in bytes. The effective threshold is read via
    /// [`UploadConfig::part_size`].
    #[builder(default = MIN_PART_SIZE)]
    part_size: usize,

    /// Requested number of simultaneously in-flight part uploads. The
    /// effective limit is read via [`UploadConfig::concurrent_parts`].
    #[builder(default = 1)]
    concurrent_parts: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: MIN_PART_SIZE,
            concurrent_parts: 1,
        }
    }
}

impl UploadConfig {
    /// Set the requested part size in bytes.
    pub fn set_part_size(&mut self, bytes: usize) -> &mut Self {
        self.part_size = bytes;
        self
    }

    /// Set the requested number of concurrent part uploads.
    pub fn set_concurrent_parts(&mut self, parts: usize) -> &mut Self {
        self.concurrent_parts = parts;
        self
    }

    /// Effective part-size threshold: the requested size, floored at
    /// [`MIN_PART_SIZE`].
    #[must_use]
    pub fn part_size(&self) -> usize {
        self.part_size.max(MIN_PART_SIZE)
    }

    /// Effective concurrency limit: the requested count, floored at 1.
    #[must_use]
    pub fn concurrent_parts(&self) -> usize {
        self.concurrent_parts.max(1)
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PARTSTREAM_PART_SIZE` | `5242880` |
    /// | `PARTSTREAM_CONCURRENT_PARTS` | `1` |
    ///
    /// Values are parsed as signed integers so that out-of-range inputs
    /// still land on the clamping floors rather than being ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("PARTSTREAM_PART_SIZE") {
            if let Ok(n) = v.parse::<i64>() {
                config.part_size = usize::try_from(n).unwrap_or(0);
            }
        }
        if let Ok(v) = std::env::var("PARTSTREAM_CONCURRENT_PARTS") {
            if let Ok(n) = v.parse::<i64>() {
                config.concurrent_parts = usize::try_from(n).unwrap_or(0);
            }
        }

        config
    }
}
