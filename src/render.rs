//! Drawing a decoded [`Map`] with macroquad.
//!
//! Textures live in a [`TextureCache`] owned by the caller; the map itself
//! never holds GPU handles. The map is y-up, the screen y-down, so every
//! draw goes through a flip against the map's pixel height.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use anyhow::Context;
use log::debug;
use macroquad::prelude::*;

use crate::gid::{DecodedTile, TilesetId};
use crate::map::Map;
use crate::object::{Object, ObjectKind};

/// Textures for a map's tilesets and image layers.
#[derive(Default)]
pub struct TextureCache {
    tilesets: HashMap<TilesetId, Texture2D>,
    image_layers: HashMap<usize, Texture2D>,
}

async fn load_nearest(path: &Path) -> anyhow::Result<Texture2D> {
    let p = path
        .to_str()
        .with_context(|| format!("Texture path is not UTF-8: {}", path.display()))?;
    let tex = load_texture(p)
        .await
        .with_context(|| format!("Loading texture {}", path.display()))?;
    tex.set_filter(FilterMode::Nearest);
    Ok(tex)
}

impl TextureCache {
    /// Loads every tileset image and image-layer image the map references.
    pub async fn load(map: &Map) -> anyhow::Result<Self> {
        let mut cache = TextureCache::default();

        for (i, ts) in map.tilesets.iter().enumerate() {
            let Some(path) = ts.image_path(&map.dir) else {
                debug!("tileset '{}' has no atlas image", ts.name);
                continue;
            };
            let tex = load_nearest(&path)
                .await
                .with_context(|| format!("Tileset '{}'", ts.name))?;
            cache.tilesets.insert(TilesetId(i), tex);
        }

        for (i, layer) in map.image_layers.iter().enumerate() {
            let Some(image) = &layer.image else { continue };
            let tex = load_nearest(&map.dir.join(&image.source))
                .await
                .with_context(|| format!("Image layer '{}'", layer.name))?;
            cache.image_layers.insert(i, tex);
        }

        Ok(cache)
    }

    /// Atlas texture of a tileset, if it has one.
    pub fn tileset(&self, id: TilesetId) -> Option<&Texture2D> {
        self.tilesets.get(&id)
    }

    /// Texture of the image layer at `index` in `Map::image_layers`.
    pub fn image_layer(&self, index: usize) -> Option<&Texture2D> {
        self.image_layers.get(&index)
    }
}

/// Texture flips and rotation reproducing a tile's orientation flags.
/// The diagonal flag is a transpose: a quarter turn plus a mirror.
fn orientation(tile: &DecodedTile) -> (bool, bool, f32) {
    if tile.flip_d {
        (tile.flip_v, !tile.flip_h, FRAC_PI_2)
    } else {
        (tile.flip_h, tile.flip_v, 0.0)
    }
}

/// Draws image layers, then visible tile layers, with the map's top-left
/// corner at `origin` on screen.
pub fn draw_map(map: &Map, textures: &TextureCache, origin: Vec2) {
    for (i, layer) in map.image_layers.iter().enumerate() {
        if !layer.visible {
            continue;
        }
        if let Some(tex) = textures.image_layer(i) {
            let pos = origin + layer.offset;
            draw_texture(tex, pos.x, pos.y, Color::new(1.0, 1.0, 1.0, layer.opacity));
        }
    }

    let (tw, th) = (map.tile_width as f32, map.tile_height as f32);
    for layer in map.tile_layers.iter().filter(|l| l.visible && !l.empty) {
        let tint = Color::new(1.0, 1.0, 1.0, layer.opacity);
        let layer_origin = origin + layer.offset;

        for (index, tile) in layer.occupied() {
            let Some(id) = tile.tileset else { continue };
            let (Some(ts), Some(tex)) = (map.tileset(id), textures.tileset(id)) else {
                continue;
            };
            let Some(source) = ts.tile_rect(tile.id) else { continue };

            // oversized tiles hang up from the bottom of their cell
            let col = (index % layer.width) as f32;
            let row = (index / layer.width) as f32;
            let x = layer_origin.x + col * tw;
            let y = layer_origin.y + (row + 1.0) * th - source.h;

            let (flip_x, flip_y, rotation) = orientation(tile);
            draw_texture_ex(
                tex,
                x,
                y,
                tint,
                DrawTextureParams {
                    source: Some(source),
                    rotation,
                    flip_x,
                    flip_y,
                    ..Default::default()
                },
            );
        }
    }
}

/// Outlines every object of every visible object group.
pub fn draw_objects_debug(map: &Map, origin: Vec2, color: Color) {
    let height = map.pixel_height();
    let to_screen = |p: Vec2| vec2(origin.x + p.x, origin.y + height - p.y);

    for group in map.object_groups.iter().filter(|g| g.visible) {
        for obj in group.objects.iter().filter(|o| o.visible) {
            draw_object_outline(obj, &to_screen, color);
        }
    }
}

fn draw_object_outline(obj: &Object, to_screen: &impl Fn(Vec2) -> Vec2, color: Color) {
    const THICKNESS: f32 = 1.0;

    match obj.kind() {
        ObjectKind::Rectangle | ObjectKind::Tile => {
            let top_left = to_screen(vec2(obj.x, obj.y + obj.height));
            draw_rectangle_lines(top_left.x, top_left.y, obj.width, obj.height, THICKNESS * 2.0, color);
        }
        ObjectKind::Ellipse => {
            if let Ok(c) = obj.ellipse() {
                let centre = to_screen(c.point());
                draw_circle_lines(centre.x, centre.y, c.r, THICKNESS, color);
            }
        }
        ObjectKind::Point => {
            if let Ok(p) = obj.point() {
                let p = to_screen(p);
                draw_circle(p.x, p.y, 2.0, color);
            }
        }
        ObjectKind::Polygon => {
            if let Ok(points) = obj.polygon() {
                draw_path(&points, true, to_screen, THICKNESS, color);
            }
        }
        ObjectKind::Polyline => {
            if let Ok(points) = obj.polyline() {
                draw_path(&points, false, to_screen, THICKNESS, color);
            }
        }
    }
}

fn draw_path(
    points: &[Vec2],
    closed: bool,
    to_screen: &impl Fn(Vec2) -> Vec2,
    thickness: f32,
    color: Color,
) {
    let screen: Vec<Vec2> = points.iter().map(|&p| to_screen(p)).collect();
    for pair in screen.windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, thickness, color);
    }
    if closed && screen.len() > 2 {
        let (first, last) = (screen[0], screen[screen.len() - 1]);
        draw_line(last.x, last.y, first.x, first.y, thickness, color);
    }
}
