// src/ir_map.rs
//! Canonical, format-agnostic document tree. Both the TMX and the JSON reader
//! produce this; nothing in here is decoded or validated yet.

use crate::properties::Properties;

#[derive(Debug, Clone, Default)]
pub struct IrMap {
    pub version: String,
    pub orientation: String,
    pub width: u32,
    pub height: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub infinite: bool,
    pub properties: Properties,
    pub tilesets: Vec<IrTileset>, // declaration order
    pub layers: Vec<IrLayer>,     // draw order: array order
    pub object_groups: Vec<IrObjectGroup>,
    pub image_layers: Vec<IrImageLayer>,
}

#[derive(Debug, Clone)]
pub enum IrTileset {
    /// Defined inline in the map document.
    Embedded { first_gid: u32, def: IrTilesetDef },
    /// Defined in another document; `source` is relative to the map.
    External { first_gid: u32, source: String },
}

impl IrTileset {
    pub fn first_gid(&self) -> u32 {
        match self {
            IrTileset::Embedded { first_gid, .. } | IrTileset::External { first_gid, .. } => *first_gid,
        }
    }
}

/// Tileset geometry. Carries no GID range; that comes from the reference site.
#[derive(Debug, Clone, Default)]
pub struct IrTilesetDef {
    pub name: String,
    pub tile_w: u32,
    pub tile_h: u32,
    pub spacing: u32, // 0 if not used
    pub margin: u32,  // 0 if not used
    pub tilecount: u32,
    pub columns: u32,
    pub image: Option<IrImage>,
    pub properties: Properties,
    pub tiles: Vec<IrTileMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct IrTileMetadata {
    pub id: u32,
    pub image: Option<IrImage>,
    pub properties: Properties,
    pub object_group: Option<IrObjectGroup>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrImage {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub trans: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IrLayer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub properties: Properties,
    pub data: IrData,
}

/// A tile layer's data block as written.
#[derive(Debug, Clone, Default)]
pub struct IrData {
    pub encoding: Option<String>,
    pub compression: Option<String>,
    pub text: String,
    pub tiles: Vec<u32>, // raw GIDs (flip flags included)
}

#[derive(Debug, Clone)]
pub struct IrObjectGroup {
    pub name: String,
    pub color: Option<String>,
    pub visible: bool,
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub properties: Properties,
    pub objects: Vec<IrObject>,
}

impl Default for IrObjectGroup {
    fn default() -> Self {
        IrObjectGroup {
            name: String::new(),
            color: None,
            visible: true,
            opacity: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            properties: Properties::new(),
            objects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IrObject {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub visible: bool,
    /// Point list text (`"x,y x,y ..."`) when the object is a polygon.
    pub polygon: Option<String>,
    pub polyline: Option<String>,
    pub ellipse: bool,
    pub point: bool,
    pub gid: u32,
    pub properties: Properties,
}

#[derive(Debug, Clone)]
pub struct IrImageLayer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub image: Option<IrImage>,
    pub properties: Properties,
}
