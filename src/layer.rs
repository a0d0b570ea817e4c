use log::debug;
use macroquad::math::{vec2, Vec2};

use crate::codec::{self, Encoding, RawTileStream};
use crate::error::DecodeError;
use crate::gid::{self, DecodedTile, TilesetId};
use crate::ir_map::{IrImageLayer, IrLayer};
use crate::properties::Properties;
use crate::tileset::{Image, Tileset};

/// A fully decoded grid of tiles covering the whole map.
#[derive(Debug, Clone)]
pub struct TileLayer {
    /// Layer name.
    pub name: String,
    /// Whether the layer is drawn.
    pub visible: bool,
    /// Opacity, `0.0` to `1.0`.
    pub opacity: f32,
    /// Pixel offset from the map origin.
    pub offset: Vec2,
    /// Custom properties.
    pub properties: Properties,
    /// How the tile data was written.
    pub encoding: Encoding,
    /// Width in tiles, equal to the map's.
    pub width: usize,
    /// Height in tiles, equal to the map's.
    pub height: usize,
    /// Row-major, top-left origin: cell (x, y) is `tiles[y * width + x]`.
    pub tiles: Vec<DecodedTile>,
    /// Every cell is nil.
    pub empty: bool,
    /// Set when all non-nil cells share one tileset.
    pub tileset: Option<TilesetId>,
}

impl TileLayer {
    /// Cell (`x`, `y`), top-left origin.
    pub fn tile(&self, x: usize, y: usize) -> Option<&DecodedTile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x)
    }

    /// Whether non-nil cells come from more than one tileset.
    pub fn uses_multiple_tilesets(&self) -> bool {
        !self.empty && self.tileset.is_none()
    }

    /// Non-nil cells with their flat index.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &DecodedTile)> {
        self.tiles.iter().enumerate().filter(|(_, t)| !t.is_nil())
    }
}

/// Which tilesets a decoded layer draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilesetUsage {
    /// Every cell is nil.
    Empty,
    /// All non-nil cells share this tileset.
    Single(TilesetId),
    /// Cells from two or more tilesets.
    Mixed,
}

/// Scans resolved tiles for the tilesets they draw from.
pub fn tileset_usage(tiles: &[DecodedTile]) -> TilesetUsage {
    let mut found = None;
    for ts in tiles.iter().filter_map(|t| t.tileset) {
        match found {
            None => found = Some(ts),
            Some(seen) if seen != ts => return TilesetUsage::Mixed,
            Some(_) => {}
        }
    }
    found.map_or(TilesetUsage::Empty, TilesetUsage::Single)
}

/// Decodes, validates and resolves one tile layer of a `width` x `height` map.
pub fn assemble(
    ir: IrLayer,
    width: usize,
    height: usize,
    tilesets: &[Tileset],
) -> Result<TileLayer, DecodeError> {
    let encoding = Encoding::from_tag(ir.data.encoding.as_deref())?;
    let stream = RawTileStream {
        encoding,
        compression: ir.data.compression.as_deref(),
        text: &ir.data.text,
        tiles: &ir.data.tiles,
    };
    let gids = codec::decode(&stream, width, height)?;

    let tiles = gids
        .into_iter()
        .map(|g| gid::resolve(g, tilesets))
        .collect::<Result<Vec<_>, _>>()?;

    let usage = tileset_usage(&tiles);
    if usage == TilesetUsage::Mixed {
        debug!("layer '{}' uses multiple tilesets", ir.name);
    }
    let (empty, tileset) = match usage {
        TilesetUsage::Empty => (true, None),
        TilesetUsage::Single(ts) => (false, Some(ts)),
        TilesetUsage::Mixed => (false, None),
    };

    Ok(TileLayer {
        name: ir.name,
        visible: ir.visible,
        opacity: ir.opacity,
        offset: vec2(ir.offset_x, ir.offset_y),
        properties: ir.properties,
        encoding,
        width,
        height,
        tiles,
        empty,
        tileset,
    })
}

/// Column and row (counted from the bottom) of flat index `index`.
#[inline]
pub fn tile_position(index: usize, map_width: usize, map_height: usize) -> (usize, usize) {
    (index % map_width, map_height - index / map_width - 1)
}

/// A single image placed over the map.
#[derive(Debug, Clone)]
pub struct ImageLayer {
    /// Layer name.
    pub name: String,
    /// Whether the layer is drawn.
    pub visible: bool,
    /// Opacity, `0.0` to `1.0`.
    pub opacity: f32,
    /// Pixel offset from the map origin.
    pub offset: Vec2,
    /// The image, if one is set.
    pub image: Option<Image>,
    /// Custom properties.
    pub properties: Properties,
}

impl From<IrImageLayer> for ImageLayer {
    fn from(ir: IrImageLayer) -> Self {
        ImageLayer {
            name: ir.name,
            visible: ir.visible,
            opacity: ir.opacity,
            offset: vec2(ir.offset_x, ir.offset_y),
            image: ir.image.map(Image::from),
            properties: ir.properties,
        }
    }
}
