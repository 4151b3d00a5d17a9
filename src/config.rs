//! ncflat global configuration options.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::{
    chunk_layout::ChunkLayoutConfiguration,
    error::ConfigurationError,
    format::FileFormat,
    name::{DEFAULT_EMBED_SEPARATOR, DEFAULT_NAME_PREFIX},
};

/// Configuration options for a transform.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// A [`TransformContext`](crate::transform::TransformContext) takes a snapshot of the configuration when it is created.
///
/// A configuration can also be loaded from JSON with [`Config::from_json`]. Missing fields take their default.
///
/// # Naming
/// ## Name Prefix
/// > default: `"nc_"`
///
/// Prepended to names that do not start with a letter or `_`, unless the source dataset declares a container kind.
///
/// ## Embed Separator
/// > default: `"."`
///
/// Joins the names of enclosing structures and a member into a flat variable name.
///
/// ## Unwrap Suffix
/// > default: `"_unwrap"`
///
/// Structures whose name ends with this suffix are flattened into their parent with
/// [`Dataset::promote_suffixed_structures`](crate::source::Dataset::promote_suffixed_structures).
///
/// # Output
/// ## File Format
/// > default: [`FileFormat::Netcdf4`]
///
/// ## Chunk Layout
/// > default: [`ChunkLayoutConfiguration::default`]
///
/// ## Chunking
/// > default: [`true`]
///
/// If disabled, netCDF-4 variables are stored contiguously.
///
/// ## Compression
/// > default: [`true`], level `4`, no shuffle
///
/// Deflate compression of chunked netCDF-4 variables.
///
/// ## No Global Attributes
/// > default: [`false`]
///
/// If enabled, the source dataset attributes are not written as global attributes.
///
/// ## History JSON
/// > default: [`false`]
///
/// If enabled, history updates also maintain a `history_json` global attribute.
///
/// # Admission
/// ## Max Response Size
/// > default: `0` (unlimited)
///
/// The largest estimated response size in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    name_prefix: String,
    embed_separator: String,
    unwrap_suffix: String,
    file_format: FileFormat,
    chunk_layout: ChunkLayoutConfiguration,
    chunking: bool,
    compression: bool,
    compression_level: u32,
    shuffle: bool,
    no_global_attributes: bool,
    history_json: bool,
    max_response_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            embed_separator: DEFAULT_EMBED_SEPARATOR.to_string(),
            unwrap_suffix: "_unwrap".to_string(),
            file_format: FileFormat::default(),
            chunk_layout: ChunkLayoutConfiguration::default(),
            chunking: true,
            compression: true,
            compression_level: 4,
            shuffle: false,
            no_global_attributes: false,
            history_json: false,
            max_response_size: 0,
        }
    }
}

impl Config {
    /// Load a configuration from JSON.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the JSON is malformed or the configuration is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ConfigurationError::new(format!("invalid configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the compression level exceeds 9, the embed separator is empty,
    /// or a chunk layout parameter is zero.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.compression_level > 9 {
            return Err(ConfigurationError::new(format!(
                "compression level {} is not in the range 0 to 9",
                self.compression_level
            )));
        }
        if self.embed_separator.is_empty() {
            return Err(ConfigurationError::new(
                "the embed separator must not be empty".to_string(),
            ));
        }
        self.chunk_layout.validate()
    }

    /// Get the [name prefix](#name-prefix) configuration.
    #[must_use]
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Set the [name prefix](#name-prefix) configuration.
    pub fn set_name_prefix(&mut self, name_prefix: String) -> &mut Self {
        self.name_prefix = name_prefix;
        self
    }

    /// Get the [embed separator](#embed-separator) configuration.
    #[must_use]
    pub fn embed_separator(&self) -> &str {
        &self.embed_separator
    }

    /// Set the [embed separator](#embed-separator) configuration.
    pub fn set_embed_separator(&mut self, embed_separator: String) -> &mut Self {
        self.embed_separator = embed_separator;
        self
    }

    /// Get the [unwrap suffix](#unwrap-suffix) configuration.
    #[must_use]
    pub fn unwrap_suffix(&self) -> &str {
        &self.unwrap_suffix
    }

    /// Set the [unwrap suffix](#unwrap-suffix) configuration.
    pub fn set_unwrap_suffix(&mut self, unwrap_suffix: String) -> &mut Self {
        self.unwrap_suffix = unwrap_suffix;
        self
    }

    /// Get the [file format](#file-format) configuration.
    #[must_use]
    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    /// Set the [file format](#file-format) configuration.
    pub fn set_file_format(&mut self, file_format: FileFormat) -> &mut Self {
        self.file_format = file_format;
        self
    }

    /// Get the [chunk layout](#chunk-layout) configuration.
    #[must_use]
    pub fn chunk_layout(&self) -> &ChunkLayoutConfiguration {
        &self.chunk_layout
    }

    /// Set the [chunk layout](#chunk-layout) configuration.
    pub fn set_chunk_layout(&mut self, chunk_layout: ChunkLayoutConfiguration) -> &mut Self {
        self.chunk_layout = chunk_layout;
        self
    }

    /// Get the [chunking](#chunking) configuration.
    #[must_use]
    pub fn chunking(&self) -> bool {
        self.chunking
    }

    /// Set the [chunking](#chunking) configuration.
    pub fn set_chunking(&mut self, chunking: bool) -> &mut Self {
        self.chunking = chunking;
        self
    }

    /// Get the [compression](#compression) configuration.
    #[must_use]
    pub fn compression(&self) -> bool {
        self.compression
    }

    /// Set the [compression](#compression) configuration.
    pub fn set_compression(&mut self, compression: bool) -> &mut Self {
        self.compression = compression;
        self
    }

    /// Get the [compression](#compression) level.
    #[must_use]
    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Set the [compression](#compression) level.
    pub fn set_compression_level(&mut self, compression_level: u32) -> &mut Self {
        self.compression_level = compression_level;
        self
    }

    /// Get the [compression](#compression) shuffle configuration.
    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Set the [compression](#compression) shuffle configuration.
    pub fn set_shuffle(&mut self, shuffle: bool) -> &mut Self {
        self.shuffle = shuffle;
        self
    }

    /// Get the [no global attributes](#no-global-attributes) configuration.
    #[must_use]
    pub fn no_global_attributes(&self) -> bool {
        self.no_global_attributes
    }

    /// Set the [no global attributes](#no-global-attributes) configuration.
    pub fn set_no_global_attributes(&mut self, no_global_attributes: bool) -> &mut Self {
        self.no_global_attributes = no_global_attributes;
        self
    }

    /// Get the [history JSON](#history-json) configuration.
    #[must_use]
    pub fn history_json(&self) -> bool {
        self.history_json
    }

    /// Set the [history JSON](#history-json) configuration.
    pub fn set_history_json(&mut self, history_json: bool) -> &mut Self {
        self.history_json = history_json;
        self
    }

    /// Get the [max response size](#max-response-size) configuration.
    #[must_use]
    pub fn max_response_size(&self) -> u64 {
        self.max_response_size
    }

    /// Set the [max response size](#max-response-size) configuration.
    pub fn set_max_response_size(&mut self, max_response_size: u64) -> &mut Self {
        self.max_response_size = max_response_size;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global ncflat configuration.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global ncflat configuration.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_no_global_attributes() {
        assert!(!global_config().no_global_attributes());
        global_config_mut().set_no_global_attributes(true);
        assert!(global_config().no_global_attributes());
        global_config_mut().set_no_global_attributes(false);
    }

    #[test]
    fn config_from_json() {
        let config = Config::from_json(
            r#"{
                "file_format": "classic",
                "max_response_size": 1000,
                "chunk_layout": {"max_extent": 512}
            }"#,
        )
        .unwrap();
        assert_eq!(config.file_format(), FileFormat::Classic);
        assert_eq!(config.max_response_size(), 1000);
        assert_eq!(config.chunk_layout().max_extent, 512);
        assert_eq!(config.name_prefix(), "nc_");

        assert!(Config::from_json(r#"{"compression_level": 12}"#).is_err());
        assert!(Config::from_json(r#"{"unknown": 1}"#).is_err());
    }

    #[test]
    fn config_setters_chain() {
        let mut config = Config::default();
        config
            .set_file_format(FileFormat::Netcdf4Classic)
            .set_compression(false)
            .set_embed_separator("_".to_string());
        assert_eq!(config.file_format(), FileFormat::Netcdf4Classic);
        assert!(!config.compression());
        assert_eq!(config.embed_separator(), "_");
        assert!(config.validate().is_ok());
    }
}
