/// How the GID of a tile object is turned into a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileObjectResolution {
    /// Same resolution as layer tiles: the tileset whose range holds the GID.
    #[default]
    ByGid,
    /// Always the first declared tileset, for maps authored against loaders
    /// that behaved this way.
    FirstTileset,
}

/// Knobs for [`Loader`](crate::Loader).
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// How tile objects pick their tileset.
    pub tile_objects: TileObjectResolution,
    /// Turn each tileset's per-tile collision objects into a map-level object
    /// group (see [`Map::generate_tile_object_groups`](crate::Map::generate_tile_object_groups)).
    pub generate_tile_object_groups: bool,
}
