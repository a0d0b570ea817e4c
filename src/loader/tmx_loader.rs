// src/loader/tmx_loader.rs
//! TMX maps and TSX tilesets.

use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::MapError;
use crate::ir_map::*;
use crate::properties::Properties;

/// Minimal element tree; TMX is small enough to hold whole.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Attribute access that remembers which document it is reading.
struct Doc<'p> {
    path: &'p Path,
}

impl Doc<'_> {
    fn malformed(&self, reason: String) -> MapError {
        MapError::Malformed {
            path: self.path.to_path_buf(),
            reason,
        }
    }

    fn opt<T: FromStr>(&self, el: &Element, key: &str) -> Result<Option<T>, MapError> {
        match el.attr(key) {
            None | Some("") => Ok(None),
            Some(v) => v.trim().parse().map(Some).map_err(|_| {
                self.malformed(format!("<{}> attribute {key}='{v}' is not valid", el.name))
            }),
        }
    }

    fn or<T: FromStr>(&self, el: &Element, key: &str, default: T) -> Result<T, MapError> {
        Ok(self.opt(el, key)?.unwrap_or(default))
    }

    fn req<T: FromStr>(&self, el: &Element, key: &str) -> Result<T, MapError> {
        self.opt(el, key)?
            .ok_or_else(|| self.malformed(format!("<{}> is missing attribute {key}", el.name)))
    }

    fn flag(&self, el: &Element, key: &str, default: bool) -> Result<bool, MapError> {
        match el.attr(key) {
            None | Some("") => Ok(default),
            Some("1" | "true") => Ok(true),
            Some("0" | "false") => Ok(false),
            Some(v) => Err(self.malformed(format!("<{}> attribute {key}='{v}' is not a boolean", el.name))),
        }
    }

    fn string(&self, el: &Element, key: &str) -> String {
        el.attr(key).unwrap_or_default().to_owned()
    }
}

fn start_element(e: &BytesStart<'_>, doc: &Doc<'_>) -> Result<Element, MapError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| doc.malformed(format!("bad attribute on <{name}>: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|source| MapError::Xml {
            path: doc.path.to_path_buf(),
            source,
        })?;
        attrs.push((key, value.into_owned()));
    }
    Ok(Element {
        name,
        attrs,
        ..Default::default()
    })
}

fn parse_tree(text: &str, doc: &Doc<'_>) -> Result<Element, MapError> {
    let xml_err = |source| MapError::Xml {
        path: doc.path.to_path_buf(),
        source,
    };

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) => stack.push(start_element(&e, doc)?),
            Event::Empty(e) => {
                let el = start_element(&e, doc)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| doc.malformed("unbalanced closing tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(doc.malformed("document ended inside an element".into()));
    }
    root.ok_or_else(|| doc.malformed("document has no root element".into()))
}

/// Parses a TMX map document.
pub fn parse_map(text: &str, path: &Path) -> Result<IrMap, MapError> {
    let doc = Doc { path };
    let root = parse_tree(text, &doc)?;
    if root.name != "map" {
        return Err(doc.malformed(format!("expected <map> root, found <{}>", root.name)));
    }

    let mut map = IrMap {
        version: doc.string(&root, "version"),
        orientation: doc.string(&root, "orientation"),
        width: doc.req(&root, "width")?,
        height: doc.req(&root, "height")?,
        tile_w: doc.req(&root, "tilewidth")?,
        tile_h: doc.req(&root, "tileheight")?,
        infinite: doc.flag(&root, "infinite", false)?,
        ..Default::default()
    };

    for child in &root.children {
        match child.name.as_str() {
            "properties" => map.properties = properties(child),
            "tileset" => map.tilesets.push(tileset_ref(child, &doc)?),
            "layer" => map.layers.push(tile_layer(child, &doc)?),
            "objectgroup" => map.object_groups.push(object_group(child, &doc)?),
            "imagelayer" => map.image_layers.push(image_layer(child, &doc)?),
            "group" => warn!("group layers are not supported, skipping '{}'", doc.string(child, "name")),
            other => debug!("ignoring <{other}> in map"),
        }
    }

    debug!(
        "parsed TMX {}: {} tilesets, {} layers, {} object groups",
        path.display(),
        map.tilesets.len(),
        map.layers.len(),
        map.object_groups.len()
    );
    Ok(map)
}

/// Parses a TSX tileset document.
pub fn parse_tileset(text: &str, path: &Path) -> Result<IrTilesetDef, MapError> {
    let doc = Doc { path };
    let root = parse_tree(text, &doc)?;
    if root.name != "tileset" {
        return Err(doc.malformed(format!("expected <tileset> root, found <{}>", root.name)));
    }
    tileset_def(&root, &doc)
}

fn properties(el: &Element) -> Properties {
    el.children_named("property")
        .map(|p| {
            let name = p.attr("name").unwrap_or_default().to_owned();
            // multi-line string values are written as text content
            let value = p.attr("value").map_or_else(|| p.text.clone(), str::to_owned);
            (name, value)
        })
        .collect()
}

fn element_properties(el: &Element) -> Properties {
    el.child("properties").map(properties).unwrap_or_default()
}

fn image(el: &Element, doc: &Doc<'_>) -> Result<IrImage, MapError> {
    Ok(IrImage {
        source: doc.string(el, "source"),
        width: doc.or(el, "width", 0)?,
        height: doc.or(el, "height", 0)?,
        trans: el.attr("trans").map(str::to_owned),
    })
}

fn tileset_ref(el: &Element, doc: &Doc<'_>) -> Result<IrTileset, MapError> {
    let first_gid = doc.req(el, "firstgid")?;
    match el.attr("source") {
        Some(source) => Ok(IrTileset::External {
            first_gid,
            source: source.to_owned(),
        }),
        None => Ok(IrTileset::Embedded {
            first_gid,
            def: tileset_def(el, doc)?,
        }),
    }
}

fn tileset_def(el: &Element, doc: &Doc<'_>) -> Result<IrTilesetDef, MapError> {
    let tiles = el
        .children_named("tile")
        .map(|t| {
            Ok(IrTileMetadata {
                id: doc.req(t, "id")?,
                image: t.child("image").map(|i| image(i, doc)).transpose()?,
                properties: element_properties(t),
                object_group: t.child("objectgroup").map(|g| object_group(g, doc)).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, MapError>>()?;

    Ok(IrTilesetDef {
        name: doc.string(el, "name"),
        tile_w: doc.or(el, "tilewidth", 0)?,
        tile_h: doc.or(el, "tileheight", 0)?,
        spacing: doc.or(el, "spacing", 0)?,
        margin: doc.or(el, "margin", 0)?,
        tilecount: doc.or(el, "tilecount", 0)?,
        columns: doc.or(el, "columns", 0)?,
        image: el.child("image").map(|i| image(i, doc)).transpose()?,
        properties: element_properties(el),
        tiles,
    })
}

fn tile_layer(el: &Element, doc: &Doc<'_>) -> Result<IrLayer, MapError> {
    let data = match el.child("data") {
        Some(d) => IrData {
            encoding: d.attr("encoding").map(str::to_owned),
            compression: d.attr("compression").map(str::to_owned),
            text: d.text.clone(),
            tiles: d
                .children_named("tile")
                .map(|t| doc.or(t, "gid", 0u32))
                .collect::<Result<Vec<_>, _>>()?,
        },
        None => IrData::default(),
    };

    Ok(IrLayer {
        name: doc.string(el, "name"),
        visible: doc.flag(el, "visible", true)?,
        opacity: doc.or(el, "opacity", 1.0)?,
        offset_x: doc.or(el, "offsetx", 0.0)?,
        offset_y: doc.or(el, "offsety", 0.0)?,
        properties: element_properties(el),
        data,
    })
}

fn object_group(el: &Element, doc: &Doc<'_>) -> Result<IrObjectGroup, MapError> {
    Ok(IrObjectGroup {
        name: doc.string(el, "name"),
        color: el.attr("color").map(str::to_owned),
        visible: doc.flag(el, "visible", true)?,
        opacity: doc.or(el, "opacity", 1.0)?,
        offset_x: doc.or(el, "offsetx", 0.0)?,
        offset_y: doc.or(el, "offsety", 0.0)?,
        properties: element_properties(el),
        objects: el
            .children_named("object")
            .map(|o| object(o, doc))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn object(el: &Element, doc: &Doc<'_>) -> Result<IrObject, MapError> {
    // Tiled 1.9 renamed "type" to "class"
    let class_name = el.attr("class").or_else(|| el.attr("type")).unwrap_or_default();

    Ok(IrObject {
        id: doc.or(el, "id", 0)?,
        name: doc.string(el, "name"),
        class_name: class_name.to_owned(),
        x: doc.or(el, "x", 0.0)?,
        y: doc.or(el, "y", 0.0)?,
        width: doc.or(el, "width", 0.0)?,
        height: doc.or(el, "height", 0.0)?,
        rotation: doc.or(el, "rotation", 0.0)?,
        visible: doc.flag(el, "visible", true)?,
        polygon: el.child("polygon").map(|p| doc.string(p, "points")),
        polyline: el.child("polyline").map(|p| doc.string(p, "points")),
        ellipse: el.child("ellipse").is_some(),
        point: el.child("point").is_some(),
        gid: doc.or(el, "gid", 0)?,
        properties: element_properties(el),
    })
}

fn image_layer(el: &Element, doc: &Doc<'_>) -> Result<IrImageLayer, MapError> {
    Ok(IrImageLayer {
        name: doc.string(el, "name"),
        visible: doc.flag(el, "visible", true)?,
        opacity: doc.or(el, "opacity", 1.0)?,
        offset_x: doc.or(el, "offsetx", 0.0)?,
        offset_y: doc.or(el, "offsety", 0.0)?,
        image: el.child("image").map(|i| image(i, doc)).transpose()?,
        properties: element_properties(el),
    })
}
