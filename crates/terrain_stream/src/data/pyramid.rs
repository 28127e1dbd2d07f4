//! FilePyramid - directory of per-patch quadtree files.
//!
//! ```text
//! <root>/
//!   elevation/0.qtf .. {n-1}.qtf     f32 texels
//!   color/0.qtf .. {n-1}.qtf         RGB8 texels
//!   layers/<name>/0.qtf ..           f32 texels, one directory per layer
//! ```
//!
//! A missing layer directory means the layer is absent. A layer directory
//! that is present must hold a valid file for every patch, and every file
//! must agree on the tile resolution.

use std::path::{Path, PathBuf};

use tracing::info;

use super::layer::Layer;
use super::quadtree_file::QuadtreeFile;
use super::source::{TileHeader, TileIndex, TileSource};
use crate::error::{Result, TerrainError};

/// Extension of per-patch quadtree files.
pub const PATCH_FILE_EXTENSION: &str = "qtf";

struct LayerFiles {
  files: Vec<QuadtreeFile>,
  nodata: Vec<u8>,
}

/// Tile pyramid stored as one [`QuadtreeFile`] per patch and layer.
pub struct FilePyramid {
  root: PathBuf,
  num_patches: usize,
  tile_resolution: usize,
  elevation: Option<LayerFiles>,
  color: Option<LayerFiles>,
  scalars: Vec<(String, LayerFiles)>,
}

impl FilePyramid {
  /// Open every layer found under `root`.
  ///
  /// Fails if no layer exists, if a present layer lacks a patch file, or if
  /// any file is corrupt or disagrees on texel size or tile resolution.
  pub fn open(root: impl AsRef<Path>, num_patches: usize) -> Result<Self> {
    let root = root.as_ref().to_path_buf();
    let mut resolution = None;

    let elevation = open_layer(&root.join("elevation"), num_patches, Layer::Elevation, &mut resolution)?;
    let color = open_layer(&root.join("color"), num_patches, Layer::Color, &mut resolution)?;

    let mut scalars = Vec::new();
    let layers_dir = root.join("layers");
    if layers_dir.is_dir() {
      let mut names = Vec::new();
      let entries = std::fs::read_dir(&layers_dir).map_err(|source| TerrainError::Open {
        path: layers_dir.clone(),
        source,
      })?;
      for entry in entries {
        let entry = entry.map_err(|source| TerrainError::Open {
          path: layers_dir.clone(),
          source,
        })?;
        if entry.path().is_dir() {
          names.push(entry.file_name().to_string_lossy().into_owned());
        }
      }
      names.sort();
      if names.len() > u8::MAX as usize {
        return Err(TerrainError::Incompatible {
          path: layers_dir,
          reason: format!("{} scalar layers, at most {} supported", names.len(), u8::MAX),
        });
      }
      for (n, name) in names.into_iter().enumerate() {
        let dir = layers_dir.join(&name);
        if let Some(files) = open_layer(&dir, num_patches, Layer::Scalar(n as u8), &mut resolution)? {
          scalars.push((name, files));
        }
      }
    }

    let Some(tile_resolution) = resolution else {
      return Err(TerrainError::Incompatible {
        path: root,
        reason: "no elevation, color or scalar layer found".into(),
      });
    };

    info!(
      root = %root.display(),
      num_patches,
      tile_resolution,
      elevation = elevation.is_some(),
      color = color.is_some(),
      scalar_layers = scalars.len(),
      "opened tile pyramid"
    );

    Ok(Self {
      root,
      num_patches,
      tile_resolution,
      elevation,
      color,
      scalars,
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Names of the scalar layers in `Layer::Scalar` order.
  pub fn layer_names(&self) -> impl Iterator<Item = &str> {
    self.scalars.iter().map(|(name, _)| name.as_str())
  }

  fn layer(&self, layer: Layer) -> Option<&LayerFiles> {
    match layer {
      Layer::Elevation => self.elevation.as_ref(),
      Layer::Color => self.color.as_ref(),
      Layer::Scalar(n) => self.scalars.get(n as usize).map(|(_, files)| files),
    }
  }

  fn layer_mut(&mut self, layer: Layer) -> Option<&mut LayerFiles> {
    match layer {
      Layer::Elevation => self.elevation.as_mut(),
      Layer::Color => self.color.as_mut(),
      Layer::Scalar(n) => self.scalars.get_mut(n as usize).map(|(_, files)| files),
    }
  }
}

fn open_layer(
  dir: &Path,
  num_patches: usize,
  layer: Layer,
  resolution: &mut Option<usize>,
) -> Result<Option<LayerFiles>> {
  if !dir.is_dir() {
    return Ok(None);
  }
  let mut files = Vec::with_capacity(num_patches);
  for patch in 0..num_patches {
    let path = dir.join(format!("{patch}.{PATCH_FILE_EXTENSION}"));
    let file = QuadtreeFile::open(&path)?;
    if file.texel_size() != layer.texel_size() {
      return Err(TerrainError::Incompatible {
        path,
        reason: format!(
          "{layer} needs {}-byte texels, file has {}",
          layer.texel_size(),
          file.texel_size()
        ),
      });
    }
    match *resolution {
      Some(expected) if expected != file.tile_resolution() => {
        return Err(TerrainError::Incompatible {
          path,
          reason: format!(
            "tile resolution {} differs from {expected}",
            file.tile_resolution()
          ),
        });
      }
      _ => *resolution = Some(file.tile_resolution()),
    }
    files.push(file);
  }
  let nodata = files
    .first()
    .map(|f| f.nodata().to_vec())
    .unwrap_or_else(|| vec![0; layer.texel_size()]);
  Ok(Some(LayerFiles { files, nodata }))
}

/// Zero texel returned as nodata for absent layers.
const ZERO_TEXEL: [u8; 4] = [0; 4];

impl TileSource for FilePyramid {
  fn num_patches(&self) -> usize {
    self.num_patches
  }

  fn tile_resolution(&self) -> usize {
    self.tile_resolution
  }

  fn has_layer(&self, layer: Layer) -> bool {
    self.layer(layer).is_some()
  }

  fn scalar_layer_count(&self) -> usize {
    self.scalars.len()
  }

  fn root_tile(&self, layer: Layer, patch: u8) -> Option<TileIndex> {
    self.layer(layer)?.files.get(patch as usize)?.root()
  }

  fn nodata(&self, layer: Layer) -> &[u8] {
    match self.layer(layer) {
      Some(files) => &files.nodata,
      None => &ZERO_TEXEL[..layer.texel_size()],
    }
  }

  fn read_tile(&mut self, layer: Layer, patch: u8, tile: TileIndex, texels: &mut [u8]) -> Result<TileHeader> {
    let unreadable = |reason: String| TerrainError::TileRead {
      layer,
      patch,
      tile,
      reason,
    };
    let file = self
      .layer_mut(layer)
      .and_then(|files| files.files.get_mut(patch as usize))
      .ok_or_else(|| unreadable("layer or patch not present".into()))?;
    file.read_tile(tile, texels).map_err(|e| unreadable(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::layer::Rgb8;
  use crate::data::quadtree_file::QuadtreeFileWriter;
  use crate::data::source::read_texels;

  fn write_layer<T: crate::data::Texel>(dir: &Path, patches: usize, resolution: usize, nodata: T, value: T) {
    std::fs::create_dir_all(dir).unwrap();
    for patch in 0..patches {
      let path = dir.join(format!("{patch}.qtf"));
      let mut writer = QuadtreeFileWriter::create_typed(&path, resolution, nodata).unwrap();
      let root = writer
        .append_texels([None; 4], [patch as f32, patch as f32 + 1.0], &vec![value; resolution * resolution])
        .unwrap();
      writer.finish(Some(root)).unwrap();
    }
  }

  #[test]
  fn test_open_all_layers() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(&dir.path().join("elevation"), 6, 3, -9999.0f32, 5.0f32);
    write_layer(&dir.path().join("color"), 6, 3, Rgb8::BLACK, Rgb8([1, 2, 3]));
    write_layer(&dir.path().join("layers/temperature"), 6, 3, f32::NAN, 21.0f32);
    write_layer(&dir.path().join("layers/moisture"), 6, 3, -1.0f32, 0.5f32);

    let mut pyramid = FilePyramid::open(dir.path(), 6).unwrap();
    assert_eq!(pyramid.tile_resolution(), 3);
    assert!(pyramid.has_layer(Layer::Elevation));
    assert!(pyramid.has_layer(Layer::Color));
    assert_eq!(pyramid.scalar_layer_count(), 2);
    assert_eq!(pyramid.layer_names().collect::<Vec<_>>(), ["moisture", "temperature"]);
    assert_eq!(pyramid.root_tile(Layer::Elevation, 5), Some(0));

    let mut scratch = Vec::new();
    let mut out = [0.0f32; 9];
    let header = read_texels(&mut pyramid, Layer::Scalar(0), 4, 0, &mut scratch, &mut out).unwrap();
    assert_eq!(header.range, [4.0, 5.0]);
    assert_eq!(out, [0.5; 9]);
  }

  #[test]
  fn test_missing_layer_directory_means_absent() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(&dir.path().join("elevation"), 2, 5, 0.0f32, 1.0f32);

    let pyramid = FilePyramid::open(dir.path(), 2).unwrap();
    assert!(!pyramid.has_layer(Layer::Color));
    assert_eq!(pyramid.root_tile(Layer::Color, 0), None);
    assert_eq!(pyramid.nodata(Layer::Color), &[0, 0, 0]);
    assert_eq!(pyramid.scalar_layer_count(), 0);
  }

  #[test]
  fn test_missing_patch_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(&dir.path().join("elevation"), 2, 5, 0.0f32, 1.0f32);
    let err = FilePyramid::open(dir.path(), 3).err().unwrap();
    assert!(matches!(err, TerrainError::Open { .. }));
  }

  #[test]
  fn test_resolution_mismatch_is_incompatible() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(&dir.path().join("elevation"), 1, 5, 0.0f32, 1.0f32);
    write_layer(&dir.path().join("color"), 1, 9, Rgb8::BLACK, Rgb8::BLACK);
    let err = FilePyramid::open(dir.path(), 1).err().unwrap();
    assert!(matches!(err, TerrainError::Incompatible { .. }));
  }

  #[test]
  fn test_texel_size_mismatch_is_incompatible() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(&dir.path().join("color"), 1, 5, 0.0f32, 1.0f32);
    let err = FilePyramid::open(dir.path(), 1).err().unwrap();
    assert!(matches!(err, TerrainError::Incompatible { ref reason, .. } if reason.contains("color")));
  }

  #[test]
  fn test_empty_directory_is_incompatible() {
    let dir = tempfile::tempdir().unwrap();
    assert!(FilePyramid::open(dir.path(), 6).is_err());
  }

  #[test]
  fn test_bad_tile_read_names_the_tile() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(&dir.path().join("elevation"), 1, 3, 0.0f32, 1.0f32);
    let mut pyramid = FilePyramid::open(dir.path(), 1).unwrap();
    let mut bytes = vec![0u8; 36];
    let err = pyramid.read_tile(Layer::Elevation, 0, 42, &mut bytes).unwrap_err();
    assert!(matches!(
      err,
      TerrainError::TileRead {
        layer: Layer::Elevation,
        patch: 0,
        tile: 42,
        ..
      }
    ));
  }
}
