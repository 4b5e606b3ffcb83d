//! Driver functions that read entity views and call a
//! [`GeometryFactory`].

use geoarena_types::{ItemType, Location, NodeRefList, ObjectView};

use crate::coordinates::Coordinates;
use crate::error::{FactoryError, GeometryError};
use crate::factory::GeometryFactory;

/// Which node locations of a list become points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UseNodes {
    /// Skip a location equal to the one before it.
    #[default]
    Unique,
    All,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// A point at the node's location.
///
/// # Errors
///
/// [`GeometryError::InvalidLocation`] for an undefined or out of range
/// location.
pub fn create_point<F: GeometryFactory>(
    factory: &F,
    node: &ObjectView<'_>,
) -> Result<F::Point, GeometryError> {
    let xy = coordinates(node.id(), node.location())?;
    Ok(factory.make_point(xy))
}

/// A linestring through the way's node locations.
///
/// # Errors
///
/// [`GeometryError::InvalidLocation`] for a node without a valid
/// location, [`GeometryError::TooFewPoints`] if fewer than two points
/// remain after `use_nodes` is applied.
pub fn create_linestring<F: GeometryFactory>(
    factory: &mut F,
    way: &ObjectView<'_>,
    use_nodes: UseNodes,
    direction: Direction,
) -> Result<F::LineString, GeometryError> {
    let points = collect_points(way.nodes(), use_nodes, direction)?;
    if points.len() < 2 {
        return Err(too_few(way, "linestring"));
    }
    factory.linestring_start();
    for xy in &points {
        factory.linestring_add_point(*xy);
    }
    factory
        .linestring_finish(points.len())
        .map_err(|source| failed(way, "linestring", source))
}

/// A polygon from a closed way.
///
/// # Errors
///
/// [`GeometryError::TooFewPoints`] below four unique points, and
/// [`GeometryError::Geometry`] if the ring is not closed.
pub fn create_polygon<F: GeometryFactory>(
    factory: &mut F,
    way: &ObjectView<'_>,
) -> Result<F::Polygon, GeometryError> {
    let points = collect_points(way.nodes(), UseNodes::Unique, Direction::Forward)?;
    if points.len() < 4 {
        return Err(too_few(way, "polygon"));
    }
    factory.polygon_start();
    for xy in &points {
        factory.polygon_add_point(*xy);
    }
    factory
        .polygon_finish(points.len())
        .map_err(|source| failed(way, "polygon", source))
}

/// A multipolygon from the outer and inner ring records of `area`.
/// Every outer ring starts a polygon; inner rings belong to the outer
/// ring before them.
///
/// # Errors
///
/// [`GeometryError::TooFewPoints`] if there is no outer ring, and
/// [`GeometryError::Geometry`] for invalid rings or an inner ring
/// before the first outer ring.
pub fn create_multipolygon<F: GeometryFactory>(
    factory: &mut F,
    area: &ObjectView<'_>,
) -> Result<F::MultiPolygon, GeometryError> {
    let wrap = |source| failed(area, "multipolygon", source);
    let mut polygons = 0usize;
    let mut polygon_open = false;

    factory.multipolygon_start();
    for record in area.children() {
        let kind = record.item_type();
        if kind != ItemType::OuterRing && kind != ItemType::InnerRing {
            continue;
        }
        let ring = NodeRefList::new(record)?;
        let points = collect_points(ring, UseNodes::Unique, Direction::Forward)?;

        if kind == ItemType::OuterRing {
            if polygon_open {
                factory.multipolygon_polygon_finish().map_err(wrap)?;
            }
            factory.multipolygon_polygon_start();
            polygon_open = true;
            polygons += 1;
            factory.multipolygon_outer_ring_start();
            add_ring(factory, &points);
            factory.multipolygon_outer_ring_finish().map_err(wrap)?;
        } else {
            if !polygon_open {
                return Err(wrap(FactoryError::MissingOuterRing));
            }
            factory.multipolygon_inner_ring_start();
            add_ring(factory, &points);
            factory.multipolygon_inner_ring_finish().map_err(wrap)?;
        }
    }
    if polygons == 0 {
        return Err(too_few(area, "multipolygon"));
    }
    factory.multipolygon_polygon_finish().map_err(wrap)?;
    factory.multipolygon_finish().map_err(wrap)
}

fn add_ring<F: GeometryFactory>(factory: &mut F, points: &[Coordinates]) {
    for xy in points {
        factory.multipolygon_add_point(*xy);
    }
}

fn coordinates(id: i64, location: Location) -> Result<Coordinates, GeometryError> {
    Coordinates::try_from(location).map_err(|source| GeometryError::InvalidLocation { id, source })
}

fn collect_points(
    nodes: NodeRefList<'_>,
    use_nodes: UseNodes,
    direction: Direction,
) -> Result<Vec<Coordinates>, GeometryError> {
    let mut points = Vec::with_capacity(nodes.len());
    let mut last = None;
    for node_ref in nodes.iter() {
        if use_nodes == UseNodes::Unique && last == Some(node_ref.location) {
            continue;
        }
        last = Some(node_ref.location);
        points.push(coordinates(node_ref.id, node_ref.location)?);
    }
    if direction == Direction::Backward {
        points.reverse();
    }
    Ok(points)
}

fn too_few(object: &ObjectView<'_>, geometry: &'static str) -> GeometryError {
    GeometryError::TooFewPoints {
        kind: object.kind(),
        id: object.id(),
        geometry,
    }
}

fn failed(object: &ObjectView<'_>, geometry: &'static str, source: FactoryError) -> GeometryError {
    GeometryError::Geometry {
        kind: object.kind(),
        id: object.id(),
        geometry,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoFactory, WktFactory};
    use geoarena_buffer::{Buffer, BuilderStack, GrowthPolicy};
    use geoarena_types::{Entity, NodeRef, ObjectFields};

    fn loc(x: i32, y: i32) -> Location {
        Location::new_raw(x * 10_000_000, y * 10_000_000)
    }

    fn way_buffer(id: i64, refs: &[(i64, Location)]) -> Buffer {
        let mut buffer = Buffer::new(1024, GrowthPolicy::AutoGrow);
        let mut stack = BuilderStack::new();
        stack.open_way(&mut buffer, &ObjectFields::new(id), "").unwrap();
        for &(node, location) in refs {
            stack
                .add_node_ref(&mut buffer, NodeRef::new(node, location))
                .unwrap();
        }
        stack.finish(&mut buffer).unwrap();
        buffer
    }

    fn area_buffer(rings: &[(ItemType, &[(i64, Location)])]) -> Buffer {
        let mut buffer = Buffer::new(1024, GrowthPolicy::AutoGrow);
        let mut stack = BuilderStack::new();
        stack.open_way(&mut buffer, &ObjectFields::new(77), "").unwrap();
        for &(kind, refs) in rings {
            stack.close_children(&mut buffer).unwrap();
            for &(node, location) in refs {
                stack
                    .add_node_ref_to(&mut buffer, kind, NodeRef::new(node, location))
                    .unwrap();
            }
        }
        stack.finish(&mut buffer).unwrap();
        buffer
    }

    fn object(buffer: &Buffer) -> ObjectView<'_> {
        match buffer.entities().next().unwrap().unwrap() {
            Entity::Node(view) | Entity::Way(view) | Entity::Relation(view) => view,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn point_from_node() {
        let mut buffer = Buffer::new(256, GrowthPolicy::AutoGrow);
        let mut stack = BuilderStack::new();
        stack
            .open_node(&mut buffer, &ObjectFields::new(1), loc(3, 4), "")
            .unwrap();
        stack.finish(&mut buffer).unwrap();
        let point = create_point(&GeoFactory::new(), &object(&buffer)).unwrap();
        assert_eq!(point, geo::Point::new(3.0, 4.0));
    }

    #[test]
    fn linestring_skips_repeated_locations() {
        let buffer = way_buffer(5, &[(1, loc(0, 0)), (2, loc(0, 0)), (3, loc(1, 1)), (4, loc(2, 1))]);
        let way = object(&buffer);
        let mut wkt = WktFactory::new();
        assert_eq!(
            create_linestring(&mut wkt, &way, UseNodes::Unique, Direction::Forward).unwrap(),
            "LINESTRING(0 0,1 1,2 1)"
        );
        assert_eq!(
            create_linestring(&mut wkt, &way, UseNodes::All, Direction::Backward).unwrap(),
            "LINESTRING(2 1,1 1,0 0,0 0)"
        );
    }

    #[test]
    fn linestring_errors() {
        let buffer = way_buffer(6, &[(1, loc(0, 0)), (2, loc(0, 0))]);
        let err = create_linestring(
            &mut GeoFactory::new(),
            &object(&buffer),
            UseNodes::Unique,
            Direction::Forward,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "way 6 has too few points for a linestring");

        let buffer = way_buffer(7, &[(1, loc(0, 0)), (9, Location::undefined())]);
        let err = create_linestring(
            &mut GeoFactory::new(),
            &object(&buffer),
            UseNodes::Unique,
            Direction::Forward,
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidLocation { id: 9, .. }));
    }

    #[test]
    fn polygon_from_closed_way() {
        let closed = [(1, loc(0, 0)), (2, loc(1, 0)), (3, loc(1, 1)), (1, loc(0, 0))];
        let buffer = way_buffer(8, &closed);
        let polygon = create_polygon(&mut WktFactory::new(), &object(&buffer)).unwrap();
        assert_eq!(polygon, "POLYGON((0 0,1 0,1 1,0 0))");

        let open = [(1, loc(0, 0)), (2, loc(1, 0)), (3, loc(1, 1)), (4, loc(0, 1))];
        let buffer = way_buffer(9, &open);
        let err = create_polygon(&mut GeoFactory::new(), &object(&buffer)).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Geometry {
                source: FactoryError::RingNotClosed { points: 4 },
                ..
            }
        ));
    }

    #[test]
    fn multipolygon_from_rings() {
        let outer = [(1, loc(0, 0)), (2, loc(4, 0)), (3, loc(4, 4)), (4, loc(0, 4)), (1, loc(0, 0))];
        let inner = [(5, loc(1, 1)), (6, loc(2, 1)), (7, loc(2, 2)), (5, loc(1, 1))];
        let second = [(8, loc(9, 9)), (9, loc(10, 9)), (10, loc(10, 10)), (8, loc(9, 9))];
        let buffer = area_buffer(&[
            (ItemType::OuterRing, &outer[..]),
            (ItemType::InnerRing, &inner[..]),
            (ItemType::OuterRing, &second[..]),
        ]);
        let multi = create_multipolygon(&mut GeoFactory::new(), &object(&buffer)).unwrap();
        assert_eq!(multi.0.len(), 2);
        assert_eq!(multi.0[0].interiors().len(), 1);
        assert!(multi.0[1].interiors().is_empty());

        let plain = way_buffer(10, &outer);
        let err = create_multipolygon(&mut GeoFactory::new(), &object(&plain)).unwrap_err();
        assert!(matches!(err, GeometryError::TooFewPoints { id: 10, .. }));
    }

    #[test]
    fn inner_ring_first_is_rejected() {
        let inner = [(5, loc(1, 1)), (6, loc(2, 1)), (7, loc(2, 2)), (5, loc(1, 1))];
        let buffer = area_buffer(&[(ItemType::InnerRing, &inner[..])]);
        let err = create_multipolygon(&mut WktFactory::new(), &object(&buffer)).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Geometry {
                source: FactoryError::MissingOuterRing,
                ..
            }
        ));
    }
}
