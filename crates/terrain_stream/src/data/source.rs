//! TileSource - boundary to the on-disk (or in-memory) tile pyramid.

use smallvec::SmallVec;

use super::layer::{decode_texels, Layer, Texel};
use crate::constants::CHILD_COUNT;
use crate::error::Result;

/// Tile offset inside one patch's pyramid for one layer.
pub type TileIndex = u32;

/// Marks "no tile" in headers and tile sets.
pub const NO_TILE: TileIndex = TileIndex::MAX;

/// Per-tile summary stored alongside the texels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileHeader {
  /// Child tile offsets in child-selector order ([`NO_TILE`] if absent).
  pub children: [TileIndex; CHILD_COUNT],
  /// Precomputed `[min, max]` of the tile's values.
  pub range: [f32; 2],
}

impl TileHeader {
  pub const LEAF: Self = Self {
    children: [NO_TILE; CHILD_COUNT],
    range: [0.0, 0.0],
  };
}

/// Tile offsets of one node across every layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileSet {
  pub dem: Option<TileIndex>,
  pub color: Option<TileIndex>,
  /// One entry per scalar layer.
  pub layers: SmallVec<[Option<TileIndex>; 4]>,
}

impl TileSet {
  /// Set with no tile in any of `scalar_layers + 2` layers.
  pub fn absent(scalar_layers: usize) -> Self {
    Self {
      dem: None,
      color: None,
      layers: SmallVec::from_elem(None, scalar_layers),
    }
  }

  pub fn get(&self, layer: Layer) -> Option<TileIndex> {
    match layer {
      Layer::Elevation => self.dem,
      Layer::Color => self.color,
      Layer::Scalar(n) => self.layers.get(n as usize).copied().flatten(),
    }
  }

  pub fn set(&mut self, layer: Layer, tile: Option<TileIndex>) {
    match layer {
      Layer::Elevation => self.dem = tile,
      Layer::Color => self.color = tile,
      Layer::Scalar(n) => {
        let n = n as usize;
        if self.layers.len() <= n {
          self.layers.resize(n + 1, None);
        }
        self.layers[n] = tile;
      }
    }
  }

  /// True when no layer has a tile (the node cannot be loaded or refined).
  pub fn is_empty(&self) -> bool {
    self.dem.is_none() && self.color.is_none() && self.layers.iter().all(Option::is_none)
  }
}

/// Converts a raw header child entry into an optional tile.
#[inline]
pub fn tile_or_none(tile: TileIndex) -> Option<TileIndex> {
  (tile != NO_TILE).then_some(tile)
}

/// Read access to a tiled multi-layer pyramid, one quadtree per base patch.
///
/// Reads are synchronous. Texels are little-endian, row-major, with
/// `tile_resolution()²` texels per tile.
pub trait TileSource {
  /// Number of base patches the pyramid covers.
  fn num_patches(&self) -> usize;

  /// Texels along one tile edge.
  fn tile_resolution(&self) -> usize;

  /// Whether the source carries this layer at all.
  fn has_layer(&self, layer: Layer) -> bool;

  /// Number of scalar layers.
  fn scalar_layer_count(&self) -> usize;

  /// Root tile of a patch for one layer.
  fn root_tile(&self, layer: Layer, patch: u8) -> Option<TileIndex>;

  /// Encoded nodata texel of a layer.
  fn nodata(&self, layer: Layer) -> &[u8];

  /// Read one tile's header and raw texels into `texels`
  /// (`tile_resolution()² * layer.texel_size()` bytes).
  fn read_tile(&mut self, layer: Layer, patch: u8, tile: TileIndex, texels: &mut [u8]) -> Result<TileHeader>;

  /// Root tiles of a patch across every layer.
  fn root_tiles(&self, patch: u8) -> TileSet {
    let mut tiles = TileSet::absent(self.scalar_layer_count());
    tiles.dem = self.root_tile(Layer::Elevation, patch);
    tiles.color = self.root_tile(Layer::Color, patch);
    for n in 0..self.scalar_layer_count() {
      tiles.set(Layer::Scalar(n as u8), self.root_tile(Layer::Scalar(n as u8), patch));
    }
    tiles
  }
}

/// Decoded nodata texel of a layer.
pub fn nodata_texel<S: TileSource + ?Sized, T: Texel>(source: &S, layer: Layer) -> T {
  T::decode(source.nodata(layer))
}

/// Read a tile and decode its texels, using `scratch` as the byte buffer.
pub fn read_texels<S: TileSource + ?Sized, T: Texel>(
  source: &mut S,
  layer: Layer,
  patch: u8,
  tile: TileIndex,
  scratch: &mut Vec<u8>,
  out: &mut [T],
) -> Result<TileHeader> {
  debug_assert_eq!(T::SIZE, layer.texel_size(), "texel type does not match {layer}");
  scratch.resize(out.len() * T::SIZE, 0);
  let header = source.read_tile(layer, patch, tile, scratch)?;
  decode_texels(scratch, out);
  Ok(header)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tile_set_get_set() {
    let mut tiles = TileSet::absent(2);
    assert!(tiles.is_empty());
    tiles.set(Layer::Scalar(1), Some(7));
    assert!(!tiles.is_empty());
    assert_eq!(tiles.get(Layer::Scalar(1)), Some(7));
    assert_eq!(tiles.get(Layer::Scalar(0)), None);
    assert_eq!(tiles.get(Layer::Scalar(5)), None);

    tiles.set(Layer::Scalar(3), Some(1));
    assert_eq!(tiles.layers.len(), 4);
    tiles.set(Layer::Elevation, Some(0));
    assert_eq!(tiles.get(Layer::Elevation), Some(0));
  }

  #[test]
  fn test_tile_or_none() {
    assert_eq!(tile_or_none(NO_TILE), None);
    assert_eq!(tile_or_none(0), Some(0));
  }
}
