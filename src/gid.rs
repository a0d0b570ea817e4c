//! Global tile IDs and their resolution against a map's tilesets.

use crate::error::DecodeError;
use crate::tileset::Tileset;

/// Horizontal flip flag.
pub const FLIP_H: u32 = 0x8000_0000; // bit 31
/// Vertical flip flag.
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
/// Diagonal (anti-diagonal transpose) flag.
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
/// All three orientation flags.
pub const FLIP_MASK: u32 = FLIP_H | FLIP_V | FLIP_D;
/// Bits holding the tile number.
pub const GID_MASK: u32 = !FLIP_MASK;

/// A global tile ID as stored in layer data: 29 bits of tile number plus three
/// orientation flags. `0` means "no tile".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Gid(pub u32);

impl Gid {
    /// The value with flags.
    #[inline] pub fn raw(self) -> u32 { self.0 }
    /// Tile number without flags.
    #[inline] pub fn bare(self) -> u32 { self.0 & GID_MASK }
    /// Horizontal flip flag.
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    /// Vertical flip flag.
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    /// Diagonal flip flag.
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
    /// Whether this is GID 0, "no tile".
    #[inline] pub fn is_empty(self) -> bool { self.0 == 0 }
}

impl From<u32> for Gid {
    fn from(raw: u32) -> Self {
        Gid(raw)
    }
}

/// Handle to a tileset: its position in [`Map::tilesets`](crate::Map::tilesets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilesetId(pub usize);

/// A GID resolved to a tile slot inside one tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedTile {
    /// Local index within the owning tileset.
    pub id: u32,
    /// Owning tileset; `None` for the nil tile.
    pub tileset: Option<TilesetId>,
    /// Mirrored left to right.
    pub flip_h: bool,
    /// Mirrored top to bottom.
    pub flip_v: bool,
    /// Transposed across the anti-diagonal.
    pub flip_d: bool,
}

impl DecodedTile {
    /// The empty cell.
    pub const NIL: DecodedTile = DecodedTile {
        id: 0,
        tileset: None,
        flip_h: false,
        flip_v: false,
        flip_d: false,
    };

    /// Whether this is the empty cell.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self.tileset.is_none()
    }

    fn in_tileset(gid: Gid, tileset: usize, first_gid: u32) -> Self {
        DecodedTile {
            id: gid.bare() - first_gid,
            tileset: Some(TilesetId(tileset)),
            flip_h: gid.flip_h(),
            flip_v: gid.flip_v(),
            flip_d: gid.flip_d(),
        }
    }
}

impl Default for DecodedTile {
    fn default() -> Self {
        DecodedTile::NIL
    }
}

/// Resolves `gid` against `tilesets` (declaration order).
///
/// Tilesets are scanned last to first and the first one whose `first_gid` does
/// not exceed the bare GID wins.
pub fn resolve(gid: Gid, tilesets: &[Tileset]) -> Result<DecodedTile, DecodeError> {
    resolve_in(gid, tilesets.iter().map(|t| t.first_gid))
}

/// [`resolve`] over bare `first_gid` values, for callers that have not built
/// their [`Tileset`]s yet.
pub fn resolve_in<I>(gid: Gid, first_gids: I) -> Result<DecodedTile, DecodeError>
where
    I: IntoIterator<Item = u32>,
    I::IntoIter: DoubleEndedIterator + ExactSizeIterator,
{
    if gid.is_empty() {
        return Ok(DecodedTile::NIL);
    }

    let bare = gid.bare();
    first_gids
        .into_iter()
        .enumerate()
        .rev()
        .find(|&(_, first_gid)| first_gid <= bare)
        .map(|(i, first_gid)| DecodedTile::in_tileset(gid, i, first_gid))
        .ok_or(DecodeError::InvalidGid(bare))
}
