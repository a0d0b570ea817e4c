// src/loader/json_loader.rs
//! Tiled JSON maps (`.json`, `.tmj`) and tilesets (`.tsj`).

use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::MapError;
use crate::ir_map::*;
use crate::properties::Properties;

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct JsonMap {
    #[serde(default)]
    version: JsonValue,
    #[serde(default)]
    orientation: String,
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    infinite: bool,
    #[serde(default)]
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonTilesetRef>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonData {
    Tiles(Vec<u32>),
    Text(String),
}

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    // tilelayer
    #[serde(default)]
    data: Option<JsonData>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    compression: Option<String>,
    // objectgroup
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    objects: Vec<JsonObject>,
    // imagelayer
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    transparentcolor: Option<String>,
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    def: JsonTileset,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonTileset {
    name: String,
    tilewidth: u32,
    tileheight: u32,
    tilecount: u32,
    columns: u32,
    spacing: u32,
    margin: u32,
    image: Option<String>,
    imagewidth: u32,
    imageheight: u32,
    transparentcolor: Option<String>,
    properties: Vec<JsonProperty>,
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default)]
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    ellipse: bool,
    #[serde(default)]
    point: bool,
    #[serde(default)]
    polygon: Option<Vec<JsonObjectPoint>>,
    #[serde(default)]
    polyline: Option<Vec<JsonObjectPoint>>,
    #[serde(default)]
    gid: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonObjectPoint {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct JsonObjectGroup {
    #[serde(default)]
    name: String,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objectgroup: Option<JsonObjectGroup>,
}

/// Property values are kept as their text, the way TMX stores them.
fn json_value_to_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn properties_from_json(props: Vec<JsonProperty>) -> Properties {
    props
        .into_iter()
        .map(|p| (p.name, json_value_to_text(p.value)))
        .collect()
}

fn image_from_json(
    source: Option<String>,
    width: u32,
    height: u32,
    trans: Option<String>,
) -> Option<IrImage> {
    source.map(|source| IrImage {
        source,
        width,
        height,
        trans,
    })
}

/// Renders vertices into `"x,y x,y"` point-list text.
fn points_to_text(points: &[JsonObjectPoint]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn object_to_ir(obj: JsonObject) -> IrObject {
    let class_name = if !obj.class.is_empty() {
        obj.class
    } else {
        obj.kind
    };

    IrObject {
        id: obj.id,
        name: obj.name,
        class_name,
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        polygon: obj.polygon.as_deref().map(points_to_text),
        polyline: obj.polyline.as_deref().map(points_to_text),
        ellipse: obj.ellipse,
        point: obj.point,
        gid: obj.gid,
        properties: properties_from_json(obj.properties),
    }
}

fn tileset_to_ir(ts: JsonTileset) -> IrTilesetDef {
    IrTilesetDef {
        name: ts.name,
        tile_w: ts.tilewidth,
        tile_h: ts.tileheight,
        spacing: ts.spacing,
        margin: ts.margin,
        tilecount: ts.tilecount,
        columns: ts.columns,
        image: image_from_json(ts.image, ts.imagewidth, ts.imageheight, ts.transparentcolor),
        properties: properties_from_json(ts.properties),
        tiles: ts
            .tiles
            .into_iter()
            .map(|tile| IrTileMetadata {
                id: tile.id,
                image: image_from_json(tile.image, tile.imagewidth, tile.imageheight, None),
                properties: properties_from_json(tile.properties),
                object_group: tile.objectgroup.map(|g| IrObjectGroup {
                    name: g.name,
                    offset_x: g.offsetx,
                    offset_y: g.offsety,
                    properties: properties_from_json(g.properties),
                    objects: g.objects.into_iter().map(object_to_ir).collect(),
                    ..Default::default()
                }),
            })
            .collect(),
    }
}

fn data_to_ir(l: &mut JsonLayer) -> IrData {
    match l.data.take() {
        Some(JsonData::Tiles(tiles)) => IrData {
            tiles,
            ..Default::default()
        },
        Some(JsonData::Text(text)) => IrData {
            // string data without an encoding is base64
            encoding: Some(l.encoding.take().unwrap_or_else(|| "base64".to_owned())),
            compression: l.compression.take().filter(|c| !c.is_empty()),
            text,
            tiles: Vec::new(),
        },
        None => IrData::default(),
    }
}

/// Parses a Tiled JSON map document.
pub fn parse_map(text: &str, path: &Path) -> Result<IrMap, MapError> {
    let j: JsonMap = serde_json::from_str(text).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let version = match j.version {
        JsonValue::Null => String::new(),
        v => json_value_to_text(v),
    };

    let tilesets = j
        .tilesets
        .into_iter()
        .map(|ts| match ts.source {
            Some(source) => IrTileset::External {
                first_gid: ts.firstgid,
                source,
            },
            None => IrTileset::Embedded {
                first_gid: ts.firstgid,
                def: tileset_to_ir(ts.def),
            },
        })
        .collect::<Vec<_>>();

    let mut map = IrMap {
        version,
        orientation: j.orientation,
        width: j.width,
        height: j.height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        infinite: j.infinite,
        properties: properties_from_json(j.properties),
        tilesets,
        ..Default::default()
    };

    for mut l in j.layers {
        match l.kind.as_str() {
            "tilelayer" => {
                let data = data_to_ir(&mut l);
                map.layers.push(IrLayer {
                    name: l.name,
                    visible: l.visible,
                    opacity: l.opacity,
                    offset_x: l.offsetx,
                    offset_y: l.offsety,
                    properties: properties_from_json(l.properties),
                    data,
                });
            }
            "objectgroup" => map.object_groups.push(IrObjectGroup {
                name: l.name,
                color: l.color,
                visible: l.visible,
                opacity: l.opacity,
                offset_x: l.offsetx,
                offset_y: l.offsety,
                properties: properties_from_json(l.properties),
                objects: l.objects.into_iter().map(object_to_ir).collect(),
            }),
            "imagelayer" => map.image_layers.push(IrImageLayer {
                name: l.name,
                visible: l.visible,
                opacity: l.opacity,
                offset_x: l.offsetx,
                offset_y: l.offsety,
                image: image_from_json(
                    l.image.filter(|s| !s.is_empty()),
                    l.imagewidth,
                    l.imageheight,
                    l.transparentcolor,
                ),
                properties: properties_from_json(l.properties),
            }),
            "group" => warn!("group layers are not supported, skipping '{}'", l.name),
            other => debug!("ignoring layer '{}' of type {other}", l.name),
        }
    }

    debug!(
        "parsed JSON {}: {} tilesets, {} layers, {} object groups",
        path.display(),
        map.tilesets.len(),
        map.layers.len(),
        map.object_groups.len()
    );
    Ok(map)
}

/// Parses a Tiled JSON tileset document.
pub fn parse_tileset(text: &str, path: &Path) -> Result<IrTilesetDef, MapError> {
    let ts: JsonTileset = serde_json::from_str(text).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tileset_to_ir(ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_properties_for_map_layer_object_tileset_and_tile() {
        let map_json = r#"{
          "version": 1.10,
          "orientation": "orthogonal",
          "width": 2, "height": 2,
          "tilewidth": 16,
          "tileheight": 16,
          "properties": [
            {"name":"is_night","type":"bool","value":true},
            {"name":"gravity","type":"float","value":9.8},
            {"name":"theme","type":"string","value":"forest"}
          ],
          "layers": [
            {
              "type":"tilelayer",
              "name":"ground",
              "width":2,
              "height":2,
              "data":[1,0,0,0],
              "properties":[
                {"name":"is_solid","type":"bool","value":true},
                {"name":"difficulty","type":"int","value":3}
              ]
            },
            {
              "type":"objectgroup",
              "name":"spawns",
              "objects":[
                {
                  "id": 7,
                  "name":"spawn_1",
                  "type":"spawn",
                  "point": true,
                  "properties":[{"name":"kind","type":"string","value":"player"}]
                }
              ],
              "properties":[{"name":"enabled","type":"bool","value":true}]
            }
          ],
          "tilesets":[{
            "firstgid":1,
            "name":"inline",
            "tilewidth":16,
            "tileheight":16,
            "tilecount":4,
            "columns":2,
            "image":"tiles.png",
            "imagewidth":32,
            "imageheight":32,
            "properties":[{"name":"biome","type":"string","value":"forest"}],
            "tiles":[
              {
                "id":0,
                "properties":[{"name":"damage","type":"int","value":10}],
                "objectgroup":{
                  "objects":[
                    {"id":1,"name":"hitbox","type":"shape","properties":[{"name":"sensor","type":"bool","value":false}]}
                  ]
                }
              }
            ]
          }]
        }"#;

        let ir = parse_map(map_json, Path::new("map.json")).unwrap();

        assert_eq!(ir.version, "1.1");
        assert_eq!(ir.properties.get_bool("is_night"), Some(true));
        assert_eq!(ir.properties.get_f32("gravity"), Some(9.8));
        assert_eq!(ir.properties.get_string("theme"), Some("forest"));

        assert_eq!(ir.layers[0].properties.get_bool("is_solid"), Some(true));
        assert_eq!(ir.layers[0].properties.get_i32("difficulty"), Some(3));
        assert_eq!(ir.layers[0].data.tiles, vec![1, 0, 0, 0]);
        assert_eq!(ir.layers[0].data.encoding, None);

        let spawns = &ir.object_groups[0];
        assert_eq!(spawns.properties.get_bool("enabled"), Some(true));
        assert_eq!(spawns.objects[0].properties.get_string("kind"), Some("player"));
        assert_eq!(spawns.objects[0].class_name, "spawn");
        assert!(spawns.objects[0].point);

        match &ir.tilesets[0] {
            IrTileset::Embedded { first_gid, def } => {
                assert_eq!(*first_gid, 1);
                assert_eq!(def.properties.get_string("biome"), Some("forest"));
                assert_eq!(def.image.as_ref().map(|i| i.width), Some(32));
                assert_eq!(def.tiles[0].properties.get_i32("damage"), Some(10));
                let objects = &def.tiles[0].object_group.as_ref().unwrap().objects;
                assert_eq!(objects[0].properties.get_bool("sensor"), Some(false));
            }
            other => panic!("expected embedded tileset, got {other:?}"),
        }
    }

    #[test]
    fn keeps_large_int_property_values() {
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
          "properties": [{"name":"big_id","type":"object","value":5000000000}]
        }"#;
        let ir = parse_map(map_json, Path::new("map.json")).unwrap();
        assert_eq!(ir.properties.get_i64("big_id"), Some(5_000_000_000));
        assert_eq!(ir.properties.get_i32("big_id"), None);
    }

    #[test]
    fn string_data_defaults_to_base64() {
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
          "layers": [
            {"type":"tilelayer","name":"a","data":"AQAAAA=="},
            {"type":"tilelayer","name":"b","data":"eJxjZAAAAAQAAg==","encoding":"base64","compression":"zlib"},
            {"type":"tilelayer","name":"c","data":"1","encoding":"csv","compression":""}
          ],
          "tilesets":[{"firstgid":1,"source":"ext.tsj"}]
        }"#;
        let ir = parse_map(map_json, Path::new("map.tmj")).unwrap();
        assert_eq!(ir.layers[0].data.encoding.as_deref(), Some("base64"));
        assert_eq!(ir.layers[0].data.text, "AQAAAA==");
        assert_eq!(ir.layers[1].data.compression.as_deref(), Some("zlib"));
        assert_eq!(ir.layers[2].data.encoding.as_deref(), Some("csv"));
        assert_eq!(ir.layers[2].data.compression, None);
        assert!(matches!(
            &ir.tilesets[0],
            IrTileset::External { first_gid: 1, source } if source == "ext.tsj"
        ));
    }

    #[test]
    fn vertices_become_point_list_text() {
        let map_json = r#"{
          "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
          "layers": [{
            "type":"objectgroup","name":"shapes","offsetx":2,
            "objects":[
              {"id":1,"x":1,"y":2,"polygon":[{"x":0,"y":0},{"x":4.0,"y":0},{"x":4,"y":-4}]},
              {"id":2,"polyline":[{"x":0,"y":0},{"x":1.5,"y":1}]},
              {"id":3,"ellipse":true,"class":"blob","type":"ignored"},
              {"id":4,"gid":2147483651}
            ]
          }, {
            "type":"imagelayer","name":"sky","image":"sky.png","imagewidth":64,"imageheight":32
          }]
        }"#;
        let ir = parse_map(map_json, Path::new("map.json")).unwrap();
        let g = &ir.object_groups[0];
        assert_eq!(g.offset_x, 2.0);
        assert_eq!(g.objects[0].polygon.as_deref(), Some("0,0 4,0 4,-4"));
        assert_eq!(g.objects[1].polyline.as_deref(), Some("0,0 1.5,1"));
        assert!(g.objects[2].ellipse);
        assert_eq!(g.objects[2].class_name, "blob");
        assert_eq!(g.objects[3].gid, 2147483651);
        assert_eq!(
            ir.image_layers[0].image.as_ref().map(|i| (i.source.as_str(), i.width)),
            Some(("sky.png", 64))
        );
    }

    #[test]
    fn parses_tileset_document() {
        let ts = r#"{"name":"ext","tilewidth":8,"tileheight":8,"tilecount":6,"columns":3,
                     "spacing":1,"margin":2,"image":"ext.png","imagewidth":28,"imageheight":20}"#;
        let def = parse_tileset(ts, Path::new("ext.tsj")).unwrap();
        assert_eq!(def.name, "ext");
        assert_eq!((def.columns, def.spacing, def.margin), (3, 1, 2));
        assert_eq!(def.image.map(|i| i.source), Some("ext.png".to_owned()));
    }

    #[test]
    fn returns_typed_error_for_malformed_json() {
        let err = parse_map("{ not json", Path::new("map.json")).unwrap_err();
        assert!(matches!(err, MapError::Json { .. }));
    }
}
