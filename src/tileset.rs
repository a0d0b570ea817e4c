use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use macroquad::math::Rect;

use crate::config::TileObjectResolution;
use crate::error::MapError;
use crate::ir_map::{IrImage, IrTileMetadata, IrTileset, IrTilesetDef};
use crate::loader::{self, ResourceReader};
use crate::object::{self, ObjectGroup};
use crate::properties::Properties;

/// Reference to an image file, relative to the document that declared it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    /// Path relative to the declaring document.
    pub source: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Colour treated as transparent, `RRGGBB`.
    pub trans: Option<String>,
}

impl From<IrImage> for Image {
    fn from(ir: IrImage) -> Self {
        Image {
            source: ir.source,
            width: ir.width,
            height: ir.height,
            trans: ir.trans,
        }
    }
}

/// Extra data attached to a single tile of a tileset.
#[derive(Debug, Clone)]
pub struct TileMeta {
    /// Local tile id.
    pub id: u32,
    /// Per-tile image, for image-collection tilesets.
    pub image: Option<Image>,
    /// Custom properties.
    pub properties: Properties,
    /// Collision shapes, in the tile's own top-left coordinates.
    pub object_group: Option<ObjectGroup>,
}

/// A tileset with its atlas geometry and per-tile metadata.
#[derive(Debug, Clone)]
pub struct Tileset {
    /// Tileset name.
    pub name: String,
    /// GID of the first tile, from the map.
    pub first_gid: u32,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Pixels between neighbouring tiles.
    pub spacing: u32,
    /// Pixels around the edge of the image.
    pub margin: u32,
    /// Number of tiles.
    pub tile_count: u32,
    /// Tiles per row.
    pub columns: u32,
    /// Atlas image, if any.
    pub image: Option<Image>,
    /// Custom properties.
    pub properties: Properties,
    /// Tiles that carry extra data.
    pub tiles: Vec<TileMeta>,
    /// Directory of the external file this tileset came from; `None` when it
    /// was embedded in the map.
    pub dir: Option<PathBuf>,
}

impl Tileset {
    /// Builds and validates a tileset from its definition. `first_gids` are the
    /// ranges of every tileset in the map; tile-local tile objects resolve
    /// against them with `tile_objects`.
    pub fn from_def(
        def: IrTilesetDef,
        first_gid: u32,
        dir: Option<PathBuf>,
        first_gids: &[u32],
        tile_objects: TileObjectResolution,
    ) -> Result<Self, MapError> {
        validate(&def)?;

        let name = def.name;
        let tiles = def
            .tiles
            .into_iter()
            .map(|tile| tile_meta(tile, &name, first_gids, tile_objects))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Tileset {
            name,
            first_gid,
            tile_width: def.tile_w,
            tile_height: def.tile_h,
            spacing: def.spacing,
            margin: def.margin,
            tile_count: def.tilecount,
            columns: def.columns,
            image: def.image.map(Image::from),
            properties: def.properties,
            tiles,
            dir,
        })
    }

    /// Number of tile rows in the source image.
    pub fn rows(&self) -> u32 {
        self.tile_count / self.columns
    }

    /// Column and row of local tile `id`, with rows counted from the bottom of
    /// the image.
    pub fn tile_coord(&self, id: u32) -> Option<(u32, u32)> {
        let col = id % self.columns;
        let row = self.rows().checked_sub(id / self.columns + 1)?;
        Some((col, row))
    }

    /// Source rectangle of local tile `id` in image pixels (top-left origin).
    pub fn tile_rect(&self, id: u32) -> Option<Rect> {
        if id >= self.tile_count {
            return None;
        }
        let (tw, th) = (self.tile_width as f32, self.tile_height as f32);
        let (margin, spacing) = (self.margin as f32, self.spacing as f32);
        let col = (id % self.columns) as f32;
        let row = (id / self.columns) as f32;
        Some(Rect::new(
            margin + col * (tw + spacing),
            margin + row * (th + spacing),
            tw,
            th,
        ))
    }

    /// Metadata of local tile `id`, if it has any.
    pub fn tile_meta(&self, id: u32) -> Option<&TileMeta> {
        self.tiles.iter().find(|t| t.id == id)
    }

    /// Where the tileset image lives on disk, given the map's directory.
    pub fn image_path(&self, map_dir: &Path) -> Option<PathBuf> {
        let image = self.image.as_ref()?;
        let dir = self.dir.as_deref().unwrap_or(map_dir);
        Some(dir.join(&image.source))
    }
}

fn validate(def: &IrTilesetDef) -> Result<(), MapError> {
    let fail = |field, reason: &str| MapError::TilesetValidation {
        tileset: def.name.clone(),
        field,
        reason: reason.to_owned(),
    };

    if def.columns < 1 {
        return Err(fail("columns", "must be at least 1"));
    }
    if def.tile_w < 1 || def.tile_h < 1 {
        return Err(fail("tile size", "width and height must be at least 1"));
    }
    Ok(())
}

fn tile_meta(
    tile: IrTileMetadata,
    tileset: &str,
    first_gids: &[u32],
    tile_objects: TileObjectResolution,
) -> Result<TileMeta, MapError> {
    let object_group = tile
        .object_group
        .map(|group| object::hydrate_local(group, first_gids, tile_objects))
        .transpose()
        .map_err(|source| MapError::TileObjects {
            tileset: tileset.to_owned(),
            tile: tile.id,
            source,
        })?;

    Ok(TileMeta {
        id: tile.id,
        image: tile.image.map(Image::from),
        properties: tile.properties,
        object_group,
    })
}

/// Materializes the map's tilesets in declaration order, loading external
/// definitions through `reader` relative to `map_dir`.
///
/// The `first_gid` of an external tileset always comes from the referencing map.
pub fn resolve_tilesets<R>(
    raw: Vec<IrTileset>,
    map_dir: &Path,
    reader: &mut R,
    tile_objects: TileObjectResolution,
) -> Result<Vec<Tileset>, MapError>
where
    R: ResourceReader + ?Sized,
{
    let first_gids: Vec<u32> = raw.iter().map(IrTileset::first_gid).collect();
    if first_gids.windows(2).any(|w| w[0] >= w[1]) {
        warn!("tilesets are not declared in ascending firstgid order: {first_gids:?}");
    }

    let mut tilesets = Vec::with_capacity(raw.len());
    for ts in raw {
        let tileset = match ts {
            IrTileset::Embedded { first_gid, def } => {
                debug!("embedded tileset '{}' at firstgid {first_gid}", def.name);
                Tileset::from_def(def, first_gid, None, &first_gids, tile_objects)?
            }
            IrTileset::External { first_gid, source } => {
                let path = map_dir.join(&source);
                info!("loading external tileset {} at firstgid {first_gid}", path.display());
                let def = loader::read_tileset(reader, &path)?;
                let dir = path.parent().map(Path::to_path_buf);
                Tileset::from_def(def, first_gid, dir, &first_gids, tile_objects)?
            }
        };
        tilesets.push(tileset);
    }
    Ok(tilesets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn def(columns: u32, tilecount: u32) -> IrTilesetDef {
        IrTilesetDef {
            name: "terrain".into(),
            tile_w: 16,
            tile_h: 16,
            tilecount,
            columns,
            image: Some(IrImage {
                source: "terrain.png".into(),
                width: 64,
                height: 48,
                trans: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn zero_columns_fails_validation() {
        let err = Tileset::from_def(def(0, 12), 1, None, &[1], TileObjectResolution::ByGid).unwrap_err();
        assert!(matches!(err, MapError::TilesetValidation { field: "columns", .. }));
    }

    #[test]
    fn tile_coord_counts_rows_from_bottom() {
        let ts = Tileset::from_def(def(4, 12), 1, None, &[1], TileObjectResolution::ByGid).unwrap();
        assert_eq!(ts.rows(), 3);
        assert_eq!(ts.tile_coord(0), Some((0, 2)));
        assert_eq!(ts.tile_coord(5), Some((1, 1)));
        assert_eq!(ts.tile_coord(11), Some((3, 0)));
        assert_eq!(ts.tile_coord(12), None);
    }

    #[test]
    fn tile_rect_honours_margin_and_spacing() {
        let mut d = def(4, 12);
        d.margin = 1;
        d.spacing = 2;
        let ts = Tileset::from_def(d, 1, None, &[1], TileObjectResolution::ByGid).unwrap();
        let r = ts.tile_rect(5).unwrap();
        assert_eq!((r.x, r.y, r.w, r.h), (19.0, 19.0, 16.0, 16.0));
        assert!(ts.tile_rect(12).is_none());
    }

    #[test]
    fn external_tileset_takes_first_gid_from_reference() {
        let tsx = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.2" name="ext" tilewidth="8" tileheight="8" tilecount="4" columns="2">
 <image source="ext.png" width="16" height="16"/>
</tileset>"#;
        let mut reader = |path: &Path| -> io::Result<Vec<u8>> {
            assert_eq!(path, Path::new("maps/sets/ext.tsx"));
            Ok(tsx.as_bytes().to_vec())
        };
        let raw = vec![
            IrTileset::Embedded { first_gid: 1, def: def(4, 12) },
            IrTileset::External { first_gid: 13, source: "sets/ext.tsx".into() },
        ];

        let tilesets = resolve_tilesets(raw, Path::new("maps"), &mut reader, TileObjectResolution::ByGid).unwrap();
        assert_eq!(tilesets.len(), 2);
        assert_eq!(tilesets[1].name, "ext");
        assert_eq!(tilesets[1].first_gid, 13);
        assert_eq!(
            tilesets[1].image_path(Path::new("maps")),
            Some(PathBuf::from("maps/sets/ext.png"))
        );
        assert_eq!(
            tilesets[0].image_path(Path::new("maps")),
            Some(PathBuf::from("maps/terrain.png"))
        );
    }

    #[test]
    fn missing_external_tileset_is_io_error() {
        let mut reader = |_: &Path| -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        };
        let raw = vec![IrTileset::External { first_gid: 1, source: "nope.tsx".into() }];
        let err = resolve_tilesets(raw, Path::new("."), &mut reader, TileObjectResolution::ByGid).unwrap_err();
        assert!(matches!(err, MapError::Io { .. }));
    }
}
