use std::path::{Path, PathBuf};

use log::{debug, info};
use macroquad::math::{vec2, Rect, Vec2};

use crate::config::LoaderConfig;
use crate::error::{DecodeError, MapError};
use crate::gid::{self, DecodedTile, Gid, TilesetId};
use crate::ir_map::IrMap;
use crate::layer::{self, ImageLayer, TileLayer};
use crate::loader::{self, FileSystem, Format, ResourceReader};
use crate::object::{self, MapContext, Object, ObjectGroup};
use crate::properties::Properties;
use crate::tileset::{self, Tileset};

/// A fully decoded map. Immutable after loading apart from
/// [`generate_tile_object_groups`](Map::generate_tile_object_groups).
#[derive(Debug, Clone)]
pub struct Map {
    /// Tiled format version.
    pub version: String,
    /// Orientation tag, e.g. `orthogonal`.
    pub orientation: String,
    /// Width in tiles.
    pub width: usize,
    /// Height in tiles.
    pub height: usize,
    /// Cell width in pixels.
    pub tile_width: u32,
    /// Cell height in pixels.
    pub tile_height: u32,
    /// Map-level custom properties.
    pub properties: Properties,
    /// Declaration order; [`TilesetId`] indexes into this.
    pub tilesets: Vec<Tileset>,
    /// Draw order.
    pub tile_layers: Vec<TileLayer>,
    /// Object groups, in document order.
    pub object_groups: Vec<ObjectGroup>,
    /// Image layers, in document order.
    pub image_layers: Vec<ImageLayer>,
    /// Directory relative paths in the map document are resolved against.
    pub dir: PathBuf,
}

impl Map {
    /// Loads a `.tmx` or Tiled JSON map from disk with the default settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        Loader::new().load_file(path)
    }

    /// Map width in pixels.
    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_width as f32
    }

    /// Map height in pixels; objects are flipped against this.
    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * self.tile_height as f32
    }

    /// Map area in pixels, bottom-left at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.pixel_width(), self.pixel_height())
    }

    /// Centre of [`bounds`](Map::bounds).
    pub fn centre(&self) -> Vec2 {
        self.bounds().center()
    }

    /// Tileset behind a handle.
    pub fn tileset(&self, id: TilesetId) -> Option<&Tileset> {
        self.tilesets.get(id.0)
    }

    /// First tileset called `name`.
    pub fn tileset_by_name(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.name == name)
    }

    /// First tile layer called `name`.
    pub fn tile_layer_by_name(&self, name: &str) -> Option<&TileLayer> {
        self.tile_layers.iter().find(|l| l.name == name)
    }

    /// First object group called `name`.
    pub fn object_group_by_name(&self, name: &str) -> Option<&ObjectGroup> {
        self.object_groups.iter().find(|g| g.name == name)
    }

    /// First image layer called `name`.
    pub fn image_layer_by_name(&self, name: &str) -> Option<&ImageLayer> {
        self.image_layers.iter().find(|l| l.name == name)
    }

    /// Objects called `name` across every object group, in group order.
    pub fn objects_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Object> + 'a {
        self.object_groups
            .iter()
            .flat_map(move |g| g.objects_by_name(name))
    }

    /// Cell (`x`, `y`) of tile layer `layer`, top-left origin.
    pub fn tile_at(&self, layer: usize, x: usize, y: usize) -> Option<&DecodedTile> {
        self.tile_layers.get(layer)?.tile(x, y)
    }

    /// Pixel centre of the cell at flat `index`, bottom-left origin.
    pub fn tile_position(&self, index: usize) -> Option<Vec2> {
        if index >= self.width * self.height {
            return None;
        }
        let (col, row) = layer::tile_position(index, self.width, self.height);
        let (tw, th) = (self.tile_width as f32, self.tile_height as f32);
        Some(vec2(col as f32 * tw + tw / 2.0, row as f32 * th + th / 2.0))
    }

    /// Resolves a raw GID against this map's tilesets.
    pub fn resolve(&self, gid: u32) -> Result<DecodedTile, DecodeError> {
        gid::resolve(Gid(gid), &self.tilesets)
    }

    /// Appends one object group per tileset that defines tile-local objects,
    /// named `"<tileset>-objectgroup"`. Each placed tile contributes a copy of
    /// its objects, moved onto its cell and flipped into map space.
    pub fn generate_tile_object_groups(&mut self) {
        let (tw, th) = (self.tile_width as f32, self.tile_height as f32);
        let pixel_height = self.pixel_height();
        let width = self.width;

        let mut generated = Vec::new();
        for (ti, ts) in self.tilesets.iter().enumerate() {
            let has_objects = ts
                .tiles
                .iter()
                .any(|t| t.object_group.as_ref().is_some_and(|g| !g.objects.is_empty()));
            if !has_objects {
                continue;
            }

            let mut objects = Vec::new();
            for tl in &self.tile_layers {
                for (index, tile) in tl.occupied() {
                    if tile.tileset != Some(TilesetId(ti)) {
                        continue;
                    }
                    let Some(group) = ts.tile_meta(tile.id).and_then(|m| m.object_group.as_ref()) else {
                        continue;
                    };
                    let dx = (index % width) as f32 * tw;
                    let dy = (index / width) as f32 * th;
                    objects.extend(group.objects.iter().map(|o| o.placed(dx, dy, pixel_height)));
                }
            }

            debug!(
                "generated {} tile objects for tileset '{}'",
                objects.len(),
                ts.name
            );
            generated.push(ObjectGroup {
                name: format!("{}-objectgroup", ts.name),
                color: None,
                visible: true,
                opacity: 1.0,
                offset: Vec2::ZERO,
                properties: Properties::new(),
                objects,
            });
        }
        self.object_groups.extend(generated);
    }
}

/// Builds [`Map`]s, reading documents through `R`.
///
/// ```no_run
/// use macroquad_tmx::{Loader, LoaderConfig};
///
/// let config = LoaderConfig { generate_tile_object_groups: true, ..Default::default() };
/// let map = Loader::new().with_config(config).load_file("assets/level1.tmx")?;
/// println!("{} layers", map.tile_layers.len());
/// # Ok::<(), macroquad_tmx::MapError>(())
/// ```
#[derive(Debug)]
pub struct Loader<R = FileSystem> {
    reader: R,
    config: LoaderConfig,
}

impl Loader<FileSystem> {
    /// Loader reading from the file system.
    pub fn new() -> Self {
        Self::with_reader(FileSystem)
    }
}

impl Default for Loader<FileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ResourceReader> Loader<R> {
    /// Loader reading documents through `reader`.
    pub fn with_reader(reader: R) -> Self {
        Loader {
            reader,
            config: LoaderConfig::default(),
        }
    }

    /// Replaces the loader's settings.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Current settings.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Reads and decodes the map at `path`; the syntax follows the extension.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Map, MapError> {
        let path = path.as_ref();
        info!("loading map {}", path.display());
        let ir = loader::read_map(&mut self.reader, path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.build(ir, dir)
    }

    /// Decodes a map held in memory. External tilesets are looked up
    /// relative to `base_dir`.
    pub fn load_str(
        &mut self,
        format: Format,
        text: &str,
        base_dir: impl AsRef<Path>,
    ) -> Result<Map, MapError> {
        let dir = base_dir.as_ref().to_path_buf();
        let ir = loader::parse_map(format, text, &dir)?;
        self.build(ir, dir)
    }

    fn build(&mut self, ir: IrMap, dir: PathBuf) -> Result<Map, MapError> {
        if ir.infinite {
            return Err(MapError::UnsupportedStorageMode);
        }

        let width = ir.width as usize;
        let height = ir.height as usize;

        let tilesets = tileset::resolve_tilesets(
            ir.tilesets,
            &dir,
            &mut self.reader,
            self.config.tile_objects,
        )?;
        let first_gids: Vec<u32> = tilesets.iter().map(|t| t.first_gid).collect();

        let tile_layers = ir
            .layers
            .into_iter()
            .map(|l| {
                let name = l.name.clone();
                debug!(
                    "decoding layer '{name}' (encoding {:?}, compression {:?})",
                    l.data.encoding, l.data.compression
                );
                layer::assemble(l, width, height, &tilesets)
                    .map_err(|source| MapError::Layer { layer: name, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = MapContext {
            pixel_height: ir.height as f32 * ir.tile_h as f32,
            first_gids: &first_gids,
            tile_objects: self.config.tile_objects,
        };
        let object_groups = ir
            .object_groups
            .into_iter()
            .map(|g| {
                let group = g.name.clone();
                object::hydrate_group(g, &ctx).map_err(|(object, source)| MapError::Object {
                    group,
                    object,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let image_layers = ir.image_layers.into_iter().map(ImageLayer::from).collect();

        let mut map = Map {
            version: ir.version,
            orientation: ir.orientation,
            width,
            height,
            tile_width: ir.tile_w,
            tile_height: ir.tile_h,
            properties: ir.properties,
            tilesets,
            tile_layers,
            object_groups,
            image_layers,
            dir,
        };

        if self.config.generate_tile_object_groups {
            map.generate_tile_object_groups();
        }

        info!(
            "loaded {}x{} map: {} tilesets, {} tile layers, {} object groups",
            map.width,
            map.height,
            map.tilesets.len(),
            map.tile_layers.len(),
            map.object_groups.len()
        );
        Ok(map)
    }
}
