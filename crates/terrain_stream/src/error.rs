//! Error types for the streaming engine.
//!
//! Only unrecoverable conditions are errors. Cache exhaustion and missing
//! layer data are handled locally (deferral and nodata substitution) and never
//! show up here.

use std::io;
use std::path::PathBuf;

use crate::data::Layer;

/// Errors surfaced by the streaming engine.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
  /// Settings file could not be read.
  #[error("failed to read settings file {path}: {source}")]
  SettingsIo {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Settings file is not valid TOML for [`crate::Settings`].
  #[error("failed to parse settings: {0}")]
  SettingsParse(#[from] toml::de::Error),

  /// A settings value is out of range.
  #[error("invalid settings: {0}")]
  InvalidSettings(String),

  /// A pyramid file could not be opened.
  #[error("cannot open pyramid file {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A pyramid file exists but is corrupt or does not match the data source.
  #[error("incompatible pyramid file {path}: {reason}")]
  Incompatible { path: PathBuf, reason: String },

  /// A single tile could not be read.
  #[error("tile {tile} of patch {patch} ({layer}) is unreadable: {reason}")]
  TileRead {
    layer: Layer,
    patch: u8,
    tile: u32,
    reason: String,
  },

  /// A base patch has no root tile in any layer.
  #[error("patch {0} has no root tile in any layer")]
  MissingRoot(u8),

  /// The main pool cannot hold one pinned root per base patch.
  #[error("pool '{pool}' has capacity {capacity} but {needed} base patch roots must stay resident")]
  RootCapacity {
    pool: String,
    capacity: usize,
    needed: usize,
  },

  /// Generic I/O failure while writing pyramid files.
  #[error(transparent)]
  Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TerrainError>;
