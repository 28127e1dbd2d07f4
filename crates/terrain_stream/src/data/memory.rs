//! MemoryTileSource - in-memory tile pyramid.
//!
//! Deterministic fixture for tests and benches, and a drop-in source for
//! procedurally generated terrain.

use std::collections::HashSet;

use super::layer::{encode_texels, Layer, Rgb8, Texel};
use super::source::{TileHeader, TileIndex, TileSource, NO_TILE};
use crate::error::{Result, TerrainError};
use crate::index::TreeIndex;

struct MemoryLayer {
  nodata: Vec<u8>,
  roots: Vec<Option<TileIndex>>,
  tiles: Vec<(TileHeader, Vec<u8>)>,
}

impl MemoryLayer {
  fn new(nodata: Vec<u8>, num_patches: usize) -> Self {
    Self {
      nodata,
      roots: vec![None; num_patches],
      tiles: Vec::new(),
    }
  }
}

/// Tile source backed by vectors.
///
/// Tiles are shared across patches: any patch may reference any tile of a
/// layer.
pub struct MemoryTileSource {
  num_patches: usize,
  tile_resolution: usize,
  elevation: Option<MemoryLayer>,
  color: Option<MemoryLayer>,
  scalars: Vec<MemoryLayer>,
  unreadable: HashSet<(Layer, TileIndex)>,
  reads: usize,
}

impl MemoryTileSource {
  /// Empty source without any layer.
  pub fn new(num_patches: usize, tile_resolution: usize) -> Self {
    debug_assert!(tile_resolution > 0);
    Self {
      num_patches,
      tile_resolution,
      elevation: None,
      color: None,
      scalars: Vec::new(),
      unreadable: HashSet::new(),
      reads: 0,
    }
  }

  pub fn with_elevation(mut self, nodata: f32) -> Self {
    self.elevation = Some(MemoryLayer::new(encode_texels(&[nodata]), self.num_patches));
    self
  }

  pub fn with_color(mut self, nodata: Rgb8) -> Self {
    self.color = Some(MemoryLayer::new(encode_texels(&[nodata]), self.num_patches));
    self
  }

  /// Add a scalar layer; it becomes `Layer::Scalar(previous count)`.
  pub fn with_scalar_layer(mut self, nodata: f32) -> Self {
    self
      .scalars
      .push(MemoryLayer::new(encode_texels(&[nodata]), self.num_patches));
    self
  }

  fn layer(&self, layer: Layer) -> Option<&MemoryLayer> {
    match layer {
      Layer::Elevation => self.elevation.as_ref(),
      Layer::Color => self.color.as_ref(),
      Layer::Scalar(n) => self.scalars.get(n as usize),
    }
  }

  fn layer_mut(&mut self, layer: Layer) -> &mut MemoryLayer {
    let found = match layer {
      Layer::Elevation => self.elevation.as_mut(),
      Layer::Color => self.color.as_mut(),
      Layer::Scalar(n) => self.scalars.get_mut(n as usize),
    };
    match found {
      Some(layer) => layer,
      None => panic!("{layer} was not added to this source"),
    }
  }

  /// Append a tile and return its index.
  ///
  /// # Panics
  ///
  /// If the layer was not added or the texel count does not match.
  pub fn push_tile<T: Texel>(
    &mut self,
    layer: Layer,
    children: [Option<TileIndex>; 4],
    range: [f32; 2],
    texels: &[T],
  ) -> TileIndex {
    assert_eq!(T::SIZE, layer.texel_size(), "texel type does not match {layer}");
    assert_eq!(texels.len(), self.tile_resolution * self.tile_resolution);
    let header = TileHeader {
      children: children.map(|c| c.unwrap_or(NO_TILE)),
      range,
    };
    let tiles = &mut self.layer_mut(layer).tiles;
    tiles.push((header, encode_texels(texels)));
    (tiles.len() - 1) as TileIndex
  }

  /// Replace a tile's child links.
  pub fn set_children(&mut self, layer: Layer, tile: TileIndex, children: [Option<TileIndex>; 4]) {
    self.layer_mut(layer).tiles[tile as usize].0.children = children.map(|c| c.unwrap_or(NO_TILE));
  }

  pub fn set_root(&mut self, layer: Layer, patch: u8, tile: TileIndex) {
    self.layer_mut(layer).roots[patch as usize] = Some(tile);
  }

  /// Make every future read of a tile fail.
  pub fn mark_unreadable(&mut self, layer: Layer, tile: TileIndex) {
    self.unreadable.insert((layer, tile));
  }

  /// Number of successful tile reads so far.
  pub fn reads(&self) -> usize {
    self.reads
  }

  pub fn tile_count(&self, layer: Layer) -> usize {
    self.layer(layer).map_or(0, |l| l.tiles.len())
  }

  /// Complete elevation + color pyramid of `depth` levels below each root.
  ///
  /// Every tile is flat at the middle of the range reported by `range_of`.
  pub fn full_pyramid(
    num_patches: usize,
    tile_resolution: usize,
    depth: u8,
    range_of: impl Fn(TreeIndex) -> [f32; 2],
  ) -> Self {
    let mut source = Self::new(num_patches, tile_resolution)
      .with_elevation(f32::MIN)
      .with_color(Rgb8::BLACK);
    for patch in 0..num_patches as u8 {
      let (dem, color) = source.build_subtree(TreeIndex::root(patch), depth, &range_of);
      source.set_root(Layer::Elevation, patch, dem);
      source.set_root(Layer::Color, patch, color);
    }
    source
  }

  fn build_subtree(
    &mut self,
    index: TreeIndex,
    remaining: u8,
    range_of: &impl Fn(TreeIndex) -> [f32; 2],
  ) -> (TileIndex, TileIndex) {
    let mut dem_children = [None; 4];
    let mut color_children = [None; 4];
    if remaining > 0 {
      for which in 0..4u8 {
        let (dem, color) = self.build_subtree(index.down(which), remaining - 1, range_of);
        dem_children[which as usize] = Some(dem);
        color_children[which as usize] = Some(color);
      }
    }
    let range = range_of(index);
    let texels = self.tile_resolution * self.tile_resolution;
    let height = 0.5 * (range[0] + range[1]);
    let shade = (index.level() as u8).wrapping_mul(40);
    let dem = self.push_tile(Layer::Elevation, dem_children, range, &vec![height; texels]);
    let color = self.push_tile(Layer::Color, color_children, [0.0, 0.0], &vec![Rgb8([shade; 3]); texels]);
    (dem, color)
  }
}

/// Zero texel returned as nodata for absent layers.
const ZERO_TEXEL: [u8; 4] = [0; 4];

impl TileSource for MemoryTileSource {
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
    self.layer(layer)?.roots.get(patch as usize).copied().flatten()
  }

  fn nodata(&self, layer: Layer) -> &[u8] {
    match self.layer(layer) {
      Some(l) => &l.nodata,
      None => &ZERO_TEXEL[..layer.texel_size()],
    }
  }

  fn read_tile(&mut self, layer: Layer, patch: u8, tile: TileIndex, texels: &mut [u8]) -> Result<TileHeader> {
    let unreadable = |reason: &str| TerrainError::TileRead {
      layer,
      patch,
      tile,
      reason: reason.to_string(),
    };
    if self.unreadable.contains(&(layer, tile)) {
      return Err(unreadable("marked unreadable"));
    }
    let (header, bytes) = self
      .layer(layer)
      .ok_or_else(|| unreadable("layer not present"))?
      .tiles
      .get(tile as usize)
      .ok_or_else(|| unreadable("tile out of range"))?;
    let n = texels.len().min(bytes.len());
    texels[..n].copy_from_slice(&bytes[..n]);
    let header = *header;
    self.reads += 1;
    Ok(header)
  }
}
