//! Free-form map objects: classification into shapes, point lists and the
//! top-left to bottom-left coordinate flip.

use std::fmt;

use log::debug;
use macroquad::math::{vec2, Circle, Rect, Vec2};

use crate::config::TileObjectResolution;
use crate::error::DecodeError;
use crate::gid::{self, DecodedTile, Gid};
use crate::ir_map::{IrObject, IrObjectGroup};
use crate::properties::Properties;

/// Integer vertex of a polygon or polyline, relative to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Horizontal offset.
    pub x: i32,
    /// Vertical offset, y down.
    pub y: i32,
}

impl Point {
    /// Vertex at (`x`, `y`).
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point{{{}, {}}}", self.x, self.y)
    }
}

/// Parses a point list such as `"0,0 10,0 10,10"`.
///
/// Every space separated token must be exactly two comma separated integers.
/// A string without a single valid pair is an error, never an empty list.
pub fn parse_points(s: &str) -> Result<Vec<Point>, DecodeError> {
    let malformed = || DecodeError::MalformedPointList(s.to_owned());

    s.trim()
        .split(' ')
        .map(|token| {
            let mut fields = token.split(',');
            let (Some(x), Some(y), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(malformed());
            };
            let x = x.parse().map_err(|_| malformed())?;
            let y = y.parse().map_err(|_| malformed())?;
            Ok(Point { x, y })
        })
        .collect()
}

/// Converts a document (top-left origin) Y into bottom-left, y-up space.
/// Applying it twice with the same `height` gives back the original value.
#[inline]
pub fn flip_y(y: f32, height: f32, map_pixel_height: f32) -> f32 {
    map_pixel_height - y - height
}

/// Shape category of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Ellipse inscribed in the object's box.
    Ellipse,
    /// Closed vertex list.
    Polygon,
    /// Open vertex list.
    Polyline,
    /// Plain box.
    Rectangle,
    /// Single position.
    Point,
    /// Tile drawn at the object's box.
    Tile,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Ellipse => "Ellipse",
            ObjectKind::Polygon => "Polygon",
            ObjectKind::Polyline => "Polyline",
            ObjectKind::Rectangle => "Rectangle",
            ObjectKind::Point => "Point",
            ObjectKind::Tile => "Tile",
        };
        f.write_str(name)
    }
}

/// What an object is, with only the data that kind needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Plain box.
    Rectangle,
    /// Ellipse inscribed in the box.
    Ellipse,
    /// Single position.
    Point,
    /// Closed vertex list, relative to the object.
    Polygon(Vec<Point>),
    /// Open vertex list, relative to the object.
    Polyline(Vec<Point>),
    /// Tile resolved from the object's GID.
    Tile(DecodedTile),
}

impl ObjectShape {
    /// The matching [`ObjectKind`].
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectShape::Rectangle => ObjectKind::Rectangle,
            ObjectShape::Ellipse => ObjectKind::Ellipse,
            ObjectShape::Point => ObjectKind::Point,
            ObjectShape::Polygon(_) => ObjectKind::Polygon,
            ObjectShape::Polyline(_) => ObjectKind::Polyline,
            ObjectShape::Tile(_) => ObjectKind::Tile,
        }
    }
}

/// Picks the kind of a raw object. Polygon beats polyline beats ellipse beats
/// point beats tile; anything else is a rectangle.
pub fn classify(obj: &IrObject) -> ObjectKind {
    if obj.polygon.is_some() {
        ObjectKind::Polygon
    } else if obj.polyline.is_some() {
        ObjectKind::Polyline
    } else if obj.ellipse {
        ObjectKind::Ellipse
    } else if obj.point {
        ObjectKind::Point
    } else if obj.gid != 0 {
        ObjectKind::Tile
    } else {
        ObjectKind::Rectangle
    }
}

/// A placed object. Once part of a [`Map`](crate::Map), `x`/`y` are in map
/// pixels with a bottom-left origin and y pointing up.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Unique id within the map.
    pub id: u32,
    /// Object name.
    pub name: String,
    /// User class (`type` in older documents).
    pub class_name: String,
    /// Left edge in pixels.
    pub x: f32,
    /// Bottom edge in pixels, y up.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    /// Whether the object is shown.
    pub visible: bool,
    /// Custom properties.
    pub properties: Properties,
    /// Shape and its shape-specific data.
    pub shape: ObjectShape,
}

impl Object {
    /// Which shape this object has.
    pub fn kind(&self) -> ObjectKind {
        self.shape.kind()
    }

    fn mismatch(&self, expected: ObjectKind) -> DecodeError {
        DecodeError::InvalidShapeAccess {
            expected,
            actual: self.kind(),
        }
    }

    /// Box of a rectangle object.
    pub fn rect(&self) -> Result<Rect, DecodeError> {
        match self.shape {
            ObjectShape::Rectangle => Ok(Rect::new(self.x, self.y, self.width, self.height)),
            _ => Err(self.mismatch(ObjectKind::Rectangle)),
        }
    }

    /// The ellipse approximated by a circle with the mean radius, centred on
    /// the ellipse's bounding box.
    pub fn ellipse(&self) -> Result<Circle, DecodeError> {
        match self.shape {
            ObjectShape::Ellipse => Ok(Circle::new(
                self.x + self.width / 2.0,
                self.y + self.height / 2.0,
                (self.width + self.height) / 4.0,
            )),
            _ => Err(self.mismatch(ObjectKind::Ellipse)),
        }
    }

    /// Position of a point object.
    pub fn point(&self) -> Result<Vec2, DecodeError> {
        match self.shape {
            ObjectShape::Point => Ok(vec2(self.x, self.y)),
            _ => Err(self.mismatch(ObjectKind::Point)),
        }
    }

    /// Absolute polygon vertices in the object's coordinate space.
    pub fn polygon(&self) -> Result<Vec<Vec2>, DecodeError> {
        match &self.shape {
            ObjectShape::Polygon(points) => Ok(self.place_points(points)),
            _ => Err(self.mismatch(ObjectKind::Polygon)),
        }
    }

    /// Absolute vertices of a polyline object.
    pub fn polyline(&self) -> Result<Vec<Vec2>, DecodeError> {
        match &self.shape {
            ObjectShape::Polyline(points) => Ok(self.place_points(points)),
            _ => Err(self.mismatch(ObjectKind::Polyline)),
        }
    }

    /// Resolved tile of a tile object.
    pub fn tile(&self) -> Result<DecodedTile, DecodeError> {
        match self.shape {
            ObjectShape::Tile(tile) => Ok(tile),
            _ => Err(self.mismatch(ObjectKind::Tile)),
        }
    }

    // Vertices are stored in document orientation (y down) relative to the
    // unflipped top edge, which sits at `y + height` after the flip.
    fn place_points(&self, points: &[Point]) -> Vec<Vec2> {
        points
            .iter()
            .map(|p| vec2(self.x + p.x as f32, self.y + self.height - p.y as f32))
            .collect()
    }

    /// Copy of a tile-local object moved by (`dx`, `dy`) document pixels and
    /// flipped into map space.
    pub fn placed(&self, dx: f32, dy: f32, map_pixel_height: f32) -> Object {
        Object {
            x: self.x + dx,
            y: flip_y(self.y + dy, self.height, map_pixel_height),
            ..self.clone()
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object{{{}, Name: '{}'}}", self.kind(), self.name)
    }
}

/// A named layer of objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGroup {
    /// Group name.
    pub name: String,
    /// Display colour, `#RRGGBB`.
    pub color: Option<String>,
    /// Whether the group is shown.
    pub visible: bool,
    /// Opacity, `0.0` to `1.0`.
    pub opacity: f32,
    /// Offset already applied to every object.
    pub offset: Vec2,
    /// Custom properties.
    pub properties: Properties,
    /// Objects in document order.
    pub objects: Vec<Object>,
}

impl ObjectGroup {
    /// Objects called `name`.
    pub fn objects_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Object> + 'a {
        self.objects.iter().filter(move |o| o.name == name)
    }

    /// Object with id `id`.
    pub fn object_by_id(&self, id: u32) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }
}

/// Map-derived data hydration needs, passed down instead of a back-reference.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    /// Map height in pixels, the flip axis.
    pub pixel_height: f32,
    /// First GIDs of every tileset, in declaration order.
    pub first_gids: &'a [u32],
    /// How tile objects pick their tileset.
    pub tile_objects: TileObjectResolution,
}

/// Classifies and normalizes every object of a map-level group.
///
/// The group offset is applied in document space, then Y is flipped once.
/// On failure, returns the id of the offending object with the cause.
pub fn hydrate_group(ir: IrObjectGroup, ctx: &MapContext<'_>) -> Result<ObjectGroup, (u32, DecodeError)> {
    let (ox, oy) = (ir.offset_x, ir.offset_y);
    let objects = ir
        .objects
        .into_iter()
        .map(|mut obj| {
            let id = obj.id;
            obj.x += ox;
            obj.y += oy;
            obj.y = flip_y(obj.y, obj.height, ctx.pixel_height);
            hydrate_object(obj, ctx.first_gids, ctx.tile_objects).map_err(|e| (id, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("hydrated object group '{}' ({} objects)", ir.name, objects.len());
    Ok(ObjectGroup {
        name: ir.name,
        color: ir.color,
        visible: ir.visible,
        opacity: ir.opacity,
        offset: vec2(ox, oy),
        properties: ir.properties,
        objects,
    })
}

/// Classifies a tile's own object group without moving it; the objects stay
/// in the tile's top-left coordinates.
pub fn hydrate_local(
    ir: IrObjectGroup,
    first_gids: &[u32],
    tile_objects: TileObjectResolution,
) -> Result<ObjectGroup, DecodeError> {
    let objects = ir
        .objects
        .into_iter()
        .map(|obj| hydrate_object(obj, first_gids, tile_objects))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ObjectGroup {
        name: ir.name,
        color: ir.color,
        visible: ir.visible,
        opacity: ir.opacity,
        offset: vec2(ir.offset_x, ir.offset_y),
        properties: ir.properties,
        objects,
    })
}

fn hydrate_object(
    obj: IrObject,
    first_gids: &[u32],
    tile_objects: TileObjectResolution,
) -> Result<Object, DecodeError> {
    let shape = match classify(&obj) {
        ObjectKind::Polygon => ObjectShape::Polygon(parse_points(obj.polygon.as_deref().unwrap_or(""))?),
        ObjectKind::Polyline => ObjectShape::Polyline(parse_points(obj.polyline.as_deref().unwrap_or(""))?),
        ObjectKind::Ellipse => ObjectShape::Ellipse,
        ObjectKind::Point => ObjectShape::Point,
        ObjectKind::Tile => ObjectShape::Tile(resolve_tile_object(Gid(obj.gid), first_gids, tile_objects)?),
        ObjectKind::Rectangle => ObjectShape::Rectangle,
    };

    Ok(Object {
        id: obj.id,
        name: obj.name,
        class_name: obj.class_name,
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        properties: obj.properties,
        shape,
    })
}

fn resolve_tile_object(
    gid: Gid,
    first_gids: &[u32],
    mode: TileObjectResolution,
) -> Result<DecodedTile, DecodeError> {
    match mode {
        TileObjectResolution::ByGid => gid::resolve_in(gid, first_gids.iter().copied()),
        TileObjectResolution::FirstTileset => {
            gid::resolve_in(gid, first_gids.iter().copied().take(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ir(f: impl FnOnce(&mut IrObject)) -> IrObject {
        let mut obj = IrObject {
            id: 1,
            name: "obj".into(),
            visible: true,
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 40.0,
            ..Default::default()
        };
        f(&mut obj);
        obj
    }

    fn ctx(first_gids: &[u32]) -> MapContext<'_> {
        MapContext {
            pixel_height: 100.0,
            first_gids,
            tile_objects: TileObjectResolution::ByGid,
        }
    }

    #[test]
    fn parses_point_list() {
        assert_eq!(
            parse_points("0,0 10,0 10,10").unwrap(),
            vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)]
        );
        assert_eq!(parse_points("-4,7").unwrap(), vec![Point::new(-4, 7)]);
    }

    #[test]
    fn malformed_point_lists_fail_whole_parse() {
        for bad in ["0,0 bad", "", "1", "1,2,3", "1.5,2", "0,0  1,1"] {
            assert!(
                matches!(parse_points(bad), Err(DecodeError::MalformedPointList(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn classification_priority() {
        assert_eq!(classify(&ir(|o| o.ellipse = true)), ObjectKind::Ellipse);
        assert_eq!(classify(&ir(|_| {})), ObjectKind::Rectangle);
        assert_eq!(classify(&ir(|o| o.gid = 3)), ObjectKind::Tile);
        assert_eq!(classify(&ir(|o| o.point = true)), ObjectKind::Point);
        assert_eq!(
            classify(&ir(|o| {
                o.gid = 3;
                o.ellipse = true;
                o.polyline = Some("0,0 1,1".into());
                o.polygon = Some("0,0 1,1".into());
            })),
            ObjectKind::Polygon
        );
        assert_eq!(
            classify(&ir(|o| {
                o.point = true;
                o.polyline = Some("0,0".into());
            })),
            ObjectKind::Polyline
        );
    }

    #[test]
    fn flip_y_is_an_involution() {
        for (y, h) in [(0.0, 0.0), (20.0, 40.0), (99.0, 1.0), (-5.0, 12.5)] {
            let flipped = flip_y(y, h, 256.0);
            assert_eq!(flip_y(flipped, h, 256.0), y);
        }
    }

    #[test]
    fn group_offset_then_flip() {
        let group = IrObjectGroup {
            name: "things".into(),
            offset_x: 5.0,
            offset_y: 10.0,
            objects: vec![ir(|_| {})],
            ..Default::default()
        };
        let g = hydrate_group(group, &ctx(&[1])).unwrap();
        let o = &g.objects[0];
        assert_eq!((o.x, o.y), (15.0, 100.0 - 30.0 - 40.0));
        let r = o.rect().unwrap();
        assert_eq!((r.x, r.y, r.w, r.h), (15.0, 30.0, 30.0, 40.0));
    }

    #[test]
    fn shape_accessors_check_kind() {
        let g = hydrate_group(
            IrObjectGroup {
                objects: vec![ir(|o| o.ellipse = true), ir(|o| o.point = true)],
                ..Default::default()
            },
            &ctx(&[1]),
        )
        .unwrap();
        let ellipse = &g.objects[0];
        let c = ellipse.ellipse().unwrap();
        assert_eq!((c.x, c.y, c.r), (25.0, 60.0, 17.5));
        assert!(matches!(
            ellipse.rect(),
            Err(DecodeError::InvalidShapeAccess {
                expected: ObjectKind::Rectangle,
                actual: ObjectKind::Ellipse
            })
        ));
        assert!(ellipse.tile().is_err());
        assert!(ellipse.polygon().is_err());

        let point = &g.objects[1];
        assert_eq!(point.point().unwrap(), vec2(10.0, 40.0));
        assert!(point.ellipse().is_err());
    }

    #[test]
    fn polygon_vertices_follow_object_flip() {
        let g = hydrate_group(
            IrObjectGroup {
                objects: vec![ir(|o| {
                    o.width = 0.0;
                    o.height = 0.0;
                    o.polygon = Some("0,0 10,0 10,10".into());
                })],
                ..Default::default()
            },
            &ctx(&[1]),
        )
        .unwrap();
        // document (10,20) -> y-up (10,80); vertex (10,10) is 10px further down
        assert_eq!(
            g.objects[0].polygon().unwrap(),
            vec![vec2(10.0, 80.0), vec2(20.0, 80.0), vec2(20.0, 70.0)]
        );
    }

    #[test]
    fn bad_point_list_reports_object() {
        let err = hydrate_group(
            IrObjectGroup {
                objects: vec![ir(|o| {
                    o.id = 9;
                    o.polyline = Some("0,0 bad".into());
                })],
                ..Default::default()
            },
            &ctx(&[1]),
        )
        .unwrap_err();
        assert!(matches!(err, (9, DecodeError::MalformedPointList(_))));
    }

    #[test]
    fn tile_objects_resolve_by_gid_or_first_tileset() {
        let obj = || IrObjectGroup {
            objects: vec![ir(|o| o.gid = 0x8000_0000 | 12)],
            ..Default::default()
        };

        let g = hydrate_group(obj(), &ctx(&[1, 10])).unwrap();
        let t = g.objects[0].tile().unwrap();
        assert_eq!((t.tileset, t.id, t.flip_h), (Some(gid::TilesetId(1)), 2, true));

        let compat = MapContext {
            tile_objects: TileObjectResolution::FirstTileset,
            ..ctx(&[1, 10])
        };
        let g = hydrate_group(obj(), &compat).unwrap();
        let t = g.objects[0].tile().unwrap();
        assert_eq!((t.tileset, t.id), (Some(gid::TilesetId(0)), 11));
    }

    #[test]
    fn display_names() {
        let g = hydrate_group(
            IrObjectGroup {
                objects: vec![ir(|o| o.name = "object 1".into())],
                ..Default::default()
            },
            &ctx(&[1]),
        )
        .unwrap();
        assert_eq!(g.objects[0].to_string(), "Object{Rectangle, Name: 'object 1'}");
        assert_eq!(ObjectKind::Polyline.to_string(), "Polyline");
    }
}
