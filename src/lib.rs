#![warn(missing_docs)]

//! Tiled map decoding for Macroquad.
//!
//! Reads `.tmx` (with `.tsx` tilesets) and Tiled JSON maps into an immutable
//! [`Map`]: tile layers decoded to [`DecodedTile`]s, objects classified into
//! [`ObjectShape`]s and flipped into a bottom-left, y-up coordinate space.
//! The [`render`] module draws the result with macroquad.
//!
//! ```no_run
//! let map = macroquad_tmx::Map::load("assets/level1.tmx")?;
//! for obj in map.objects_by_name("spawn") {
//!     println!("{obj} at {:?}", obj.point()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
mod config;
mod error;
pub mod gid;
mod ir_map;
mod layer;
pub mod loader;
mod map;
pub mod object;
mod properties;
pub mod render;
mod tileset;

pub use config::{LoaderConfig, TileObjectResolution};
pub use error::{DecodeError, MapError};
pub use gid::{DecodedTile, Gid, TilesetId};
pub use layer::{ImageLayer, TileLayer, TilesetUsage};
pub use loader::{FileSystem, Format, ResourceReader};
pub use map::{Loader, Map};
pub use object::{Object, ObjectGroup, ObjectKind, ObjectShape, Point};
pub use properties::{Properties, Property};
pub use tileset::{Image, TileMeta, Tileset};
