//! QuadtreeFile - one layer of one patch's tile pyramid on disk.
//!
//! Little-endian, fixed-size records:
//!
//! ```text
//! header (28 bytes)
//!   magic        [u8; 4]   "QTRF"
//!   version      u32       1
//!   texel_size   u32       bytes per texel (1..=4)
//!   resolution   u32       texels per tile edge
//!   nodata       [u8; 4]   nodata texel, zero padded
//!   root         u32       root tile (u32::MAX = none)
//!   count        u32       number of records
//!
//! record i (24 + resolution² * texel_size bytes)
//!   children     [u32; 4]  child records (u32::MAX = none)
//!   min, max     f32, f32  value range of the tile
//!   texels       ...       row-major
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::layer::{encode_texels, Texel};
use super::source::{tile_or_none, TileHeader, TileIndex, NO_TILE};
use crate::error::{Result, TerrainError};

pub const MAGIC: [u8; 4] = *b"QTRF";
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: u64 = 28;
const RECORD_HEADER_SIZE: usize = 24;

/// Read-only handle to a quadtree file.
#[derive(Debug)]
pub struct QuadtreeFile {
  path: PathBuf,
  file: File,
  texel_size: usize,
  tile_resolution: usize,
  nodata: [u8; 4],
  root: Option<TileIndex>,
  count: u32,
  record: Vec<u8>,
}

impl QuadtreeFile {
  /// Open and validate a quadtree file.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let mut file = File::open(&path).map_err(|source| TerrainError::Open {
      path: path.clone(),
      source,
    })?;
    let incompatible = |reason: String| TerrainError::Incompatible {
      path: path.clone(),
      reason,
    };

    let mut header = [0u8; HEADER_SIZE as usize];
    file
      .read_exact(&mut header)
      .map_err(|e| incompatible(format!("cannot read header: {e}")))?;
    if header[0..4] != MAGIC {
      return Err(incompatible("bad magic".into()));
    }
    let word = |at: usize| u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]);
    let version = word(4);
    if version != VERSION {
      return Err(incompatible(format!("unsupported version {version}")));
    }
    let texel_size = word(8) as usize;
    if !(1..=4).contains(&texel_size) {
      return Err(incompatible(format!("texel size {texel_size} out of range")));
    }
    let tile_resolution = word(12) as usize;
    if tile_resolution == 0 {
      return Err(incompatible("zero tile resolution".into()));
    }
    let nodata = [header[16], header[17], header[18], header[19]];
    let root = tile_or_none(word(20));
    let count = word(24);

    let record_size = RECORD_HEADER_SIZE + tile_resolution * tile_resolution * texel_size;
    let expected = HEADER_SIZE + count as u64 * record_size as u64;
    let actual = file
      .metadata()
      .map_err(|source| TerrainError::Open {
        path: path.clone(),
        source,
      })?
      .len();
    if actual < expected {
      return Err(incompatible(format!("truncated: {actual} bytes, expected {expected}")));
    }
    if let Some(root) = root {
      if root >= count {
        return Err(incompatible(format!("root tile {root} beyond {count} records")));
      }
    }

    Ok(Self {
      path,
      file,
      texel_size,
      tile_resolution,
      nodata,
      root,
      count,
      record: vec![0u8; record_size],
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn texel_size(&self) -> usize {
    self.texel_size
  }

  pub fn tile_resolution(&self) -> usize {
    self.tile_resolution
  }

  /// Nodata texel (`texel_size` bytes).
  pub fn nodata(&self) -> &[u8] {
    &self.nodata[..self.texel_size]
  }

  pub fn root(&self) -> Option<TileIndex> {
    self.root
  }

  pub fn tile_count(&self) -> u32 {
    self.count
  }

  /// Read a record; `texels` receives `resolution² * texel_size` bytes.
  pub fn read_tile(&mut self, tile: TileIndex, texels: &mut [u8]) -> io::Result<TileHeader> {
    if tile >= self.count {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("tile {tile} beyond {} records", self.count),
      ));
    }
    let record_size = self.record.len();
    self
      .file
      .seek(SeekFrom::Start(HEADER_SIZE + tile as u64 * record_size as u64))?;
    self.file.read_exact(&mut self.record)?;

    let r = &self.record;
    let word = |at: usize| [r[at], r[at + 1], r[at + 2], r[at + 3]];
    let header = TileHeader {
      children: [0, 1, 2, 3].map(|c| u32::from_le_bytes(word(c * 4))),
      range: [f32::from_le_bytes(word(16)), f32::from_le_bytes(word(20))],
    };
    let n = texels.len().min(record_size - RECORD_HEADER_SIZE);
    texels[..n].copy_from_slice(&r[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + n]);
    Ok(header)
  }
}

/// Sequential writer for quadtree files.
///
/// Records get consecutive indices in append order; the root is written by
/// [`finish`](Self::finish).
pub struct QuadtreeFileWriter {
  out: BufWriter<File>,
  texel_size: usize,
  tile_resolution: usize,
  count: u32,
}

impl QuadtreeFileWriter {
  pub fn create(path: impl AsRef<Path>, texel_size: usize, tile_resolution: usize, nodata: &[u8]) -> Result<Self> {
    debug_assert!((1..=4).contains(&texel_size));
    debug_assert_eq!(nodata.len(), texel_size);
    let mut out = BufWriter::new(File::create(path)?);
    let mut padded = [0u8; 4];
    padded[..texel_size].copy_from_slice(nodata);

    out.write_all(&MAGIC)?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&(texel_size as u32).to_le_bytes())?;
    out.write_all(&(tile_resolution as u32).to_le_bytes())?;
    out.write_all(&padded)?;
    out.write_all(&NO_TILE.to_le_bytes())?;
    out.write_all(&0u32.to_le_bytes())?;
    Ok(Self {
      out,
      texel_size,
      tile_resolution,
      count: 0,
    })
  }

  /// Create a writer whose texel size and nodata come from `T`.
  pub fn create_typed<T: Texel>(path: impl AsRef<Path>, tile_resolution: usize, nodata: T) -> Result<Self> {
    Self::create(path, T::SIZE, tile_resolution, &encode_texels(&[nodata]))
  }

  /// Index the next appended record will get.
  pub fn next_index(&self) -> TileIndex {
    self.count
  }

  /// Append one raw record.
  pub fn append(&mut self, children: [Option<TileIndex>; 4], range: [f32; 2], texels: &[u8]) -> Result<TileIndex> {
    let expected = self.tile_resolution * self.tile_resolution * self.texel_size;
    if texels.len() != expected {
      return Err(TerrainError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("tile has {} bytes, expected {expected}", texels.len()),
      )));
    }
    for child in children {
      self.out.write_all(&child.unwrap_or(NO_TILE).to_le_bytes())?;
    }
    self.out.write_all(&range[0].to_le_bytes())?;
    self.out.write_all(&range[1].to_le_bytes())?;
    self.out.write_all(texels)?;
    let index = self.count;
    self.count += 1;
    Ok(index)
  }

  /// Append one typed record.
  pub fn append_texels<T: Texel>(
    &mut self,
    children: [Option<TileIndex>; 4],
    range: [f32; 2],
    texels: &[T],
  ) -> Result<TileIndex> {
    debug_assert_eq!(T::SIZE, self.texel_size);
    self.append(children, range, &encode_texels(texels))
  }

  /// Write the root and record count and flush.
  pub fn finish(mut self, root: Option<TileIndex>) -> Result<()> {
    self.out.seek(SeekFrom::Start(20))?;
    self.out.write_all(&root.unwrap_or(NO_TILE).to_le_bytes())?;
    self.out.write_all(&self.count.to_le_bytes())?;
    self.out.flush()?;
    Ok(())
  }
}

#[cfg(test)]
#[path = "quadtree_file_test.rs"]
mod quadtree_file_test;
