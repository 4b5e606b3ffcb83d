use std::mem;

use geo::{LineString, MultiPolygon, Point, Polygon};

use crate::coordinates::Coordinates;
use crate::error::FactoryError;

/// Receives the points of a geometry one call at a time and builds a
/// value of its own representation.
///
/// The drivers in [`create`](crate::create) call it in this order:
///
/// ```text
///   point         make_point
///   linestring    linestring_start, linestring_add_point*, linestring_finish
///   polygon       polygon_start, polygon_add_point*, polygon_finish
///   multipolygon  multipolygon_start
///                   ( multipolygon_polygon_start
///                       multipolygon_outer_ring_start, add_point*, ..._finish
///                       ( multipolygon_inner_ring_start, add_point*, ..._finish )*
///                     multipolygon_polygon_finish )*
///                 multipolygon_finish
/// ```
///
/// `num_points` is the number of points added since the matching start
/// call.
pub trait GeometryFactory {
    type Point;
    type LineString;
    type Polygon;
    type MultiPolygon;

    fn make_point(&self, xy: Coordinates) -> Self::Point;

    fn linestring_start(&mut self);
    fn linestring_add_point(&mut self, xy: Coordinates);
    /// # Errors
    ///
    /// A [`FactoryError`] if the collected points do not form a valid
    /// linestring.
    fn linestring_finish(&mut self, num_points: usize) -> Result<Self::LineString, FactoryError>;

    fn polygon_start(&mut self);
    fn polygon_add_point(&mut self, xy: Coordinates);
    /// # Errors
    ///
    /// [`FactoryError::RingNotClosed`] or [`FactoryError::RingTooShort`].
    fn polygon_finish(&mut self, num_points: usize) -> Result<Self::Polygon, FactoryError>;

    fn multipolygon_start(&mut self);
    fn multipolygon_polygon_start(&mut self);
    /// # Errors
    ///
    /// [`FactoryError::MissingOuterRing`] if no outer ring was added.
    fn multipolygon_polygon_finish(&mut self) -> Result<(), FactoryError>;
    fn multipolygon_outer_ring_start(&mut self);
    /// # Errors
    ///
    /// Ring validation errors, or [`FactoryError::OutOfOrder`] for a
    /// second outer ring in one polygon.
    fn multipolygon_outer_ring_finish(&mut self) -> Result<(), FactoryError>;
    fn multipolygon_inner_ring_start(&mut self);
    /// # Errors
    ///
    /// Ring validation errors, or [`FactoryError::MissingOuterRing`].
    fn multipolygon_inner_ring_finish(&mut self) -> Result<(), FactoryError>;
    fn multipolygon_add_point(&mut self, xy: Coordinates);
    /// # Errors
    ///
    /// [`FactoryError::OutOfOrder`] if a polygon is still open.
    fn multipolygon_finish(&mut self) -> Result<Self::MultiPolygon, FactoryError>;
}

/// A ring must be closed and have at least four points.
pub(crate) fn check_ring(points: &[Coordinates]) -> Result<(), FactoryError> {
    if points.len() < 4 {
        return Err(FactoryError::RingTooShort {
            points: points.len(),
        });
    }
    if points.first() != points.last() {
        return Err(FactoryError::RingNotClosed {
            points: points.len(),
        });
    }
    Ok(())
}

/// Builds [`geo`] geometries.
#[derive(Debug, Default)]
pub struct GeoFactory {
    points: Vec<Coordinates>,
    rings: Vec<LineString<f64>>,
    polygons: Vec<Polygon<f64>>,
}

impl GeoFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take_line(&mut self) -> LineString<f64> {
        mem::take(&mut self.points).into_iter().collect()
    }

    fn take_ring(&mut self) -> Result<LineString<f64>, FactoryError> {
        check_ring(&self.points)?;
        Ok(self.take_line())
    }
}

impl GeometryFactory for GeoFactory {
    type Point = Point<f64>;
    type LineString = LineString<f64>;
    type Polygon = Polygon<f64>;
    type MultiPolygon = MultiPolygon<f64>;

    fn make_point(&self, xy: Coordinates) -> Point<f64> {
        Point::new(xy.x, xy.y)
    }

    fn linestring_start(&mut self) {
        self.points.clear();
    }

    fn linestring_add_point(&mut self, xy: Coordinates) {
        self.points.push(xy);
    }

    fn linestring_finish(&mut self, _num_points: usize) -> Result<LineString<f64>, FactoryError> {
        Ok(self.take_line())
    }

    fn polygon_start(&mut self) {
        self.points.clear();
    }

    fn polygon_add_point(&mut self, xy: Coordinates) {
        self.points.push(xy);
    }

    fn polygon_finish(&mut self, _num_points: usize) -> Result<Polygon<f64>, FactoryError> {
        let exterior = self.take_ring()?;
        Ok(Polygon::new(exterior, Vec::new()))
    }

    fn multipolygon_start(&mut self) {
        self.points.clear();
        self.rings.clear();
        self.polygons.clear();
    }

    fn multipolygon_polygon_start(&mut self) {
        self.rings.clear();
    }

    fn multipolygon_polygon_finish(&mut self) -> Result<(), FactoryError> {
        let mut rings = mem::take(&mut self.rings).into_iter();
        let exterior = rings.next().ok_or(FactoryError::MissingOuterRing)?;
        self.polygons.push(Polygon::new(exterior, rings.collect()));
        Ok(())
    }

    fn multipolygon_outer_ring_start(&mut self) {
        self.points.clear();
    }

    fn multipolygon_outer_ring_finish(&mut self) -> Result<(), FactoryError> {
        if !self.rings.is_empty() {
            return Err(FactoryError::OutOfOrder {
                call: "multipolygon_outer_ring_finish",
            });
        }
        let ring = self.take_ring()?;
        self.rings.push(ring);
        Ok(())
    }

    fn multipolygon_inner_ring_start(&mut self) {
        self.points.clear();
    }

    fn multipolygon_inner_ring_finish(&mut self) -> Result<(), FactoryError> {
        if self.rings.is_empty() {
            return Err(FactoryError::MissingOuterRing);
        }
        let ring = self.take_ring()?;
        self.rings.push(ring);
        Ok(())
    }

    fn multipolygon_add_point(&mut self, xy: Coordinates) {
        self.points.push(xy);
    }

    fn multipolygon_finish(&mut self) -> Result<MultiPolygon<f64>, FactoryError> {
        if !self.rings.is_empty() {
            return Err(FactoryError::OutOfOrder {
                call: "multipolygon_finish",
            });
        }
        Ok(MultiPolygon::new(mem::take(&mut self.polygons)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn square(factory: &mut GeoFactory, min: f64, max: f64) {
        for (x, y) in [(min, min), (max, min), (max, max), (min, max), (min, min)] {
            factory.multipolygon_add_point(Coordinates::new(x, y));
        }
    }

    #[test]
    fn linestring_and_polygon() {
        let mut factory = GeoFactory::new();
        factory.linestring_start();
        factory.linestring_add_point(Coordinates::new(0.0, 0.0));
        factory.linestring_add_point(Coordinates::new(1.0, 1.0));
        let line = factory.linestring_finish(2).unwrap();
        assert_eq!(line.0.len(), 2);

        factory.polygon_start();
        for (x, y) in [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 0.0)] {
            factory.polygon_add_point(Coordinates::new(x, y));
        }
        let polygon = factory.polygon_finish(4).unwrap();
        assert!((polygon.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn open_or_short_rings_are_rejected() {
        let mut factory = GeoFactory::new();
        factory.polygon_start();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            factory.polygon_add_point(Coordinates::new(x, y));
        }
        assert_eq!(
            factory.polygon_finish(4),
            Err(FactoryError::RingNotClosed { points: 4 })
        );

        factory.polygon_start();
        factory.polygon_add_point(Coordinates::new(0.0, 0.0));
        factory.polygon_add_point(Coordinates::new(0.0, 0.0));
        assert_eq!(
            factory.polygon_finish(2),
            Err(FactoryError::RingTooShort { points: 2 })
        );
    }

    #[test]
    fn multipolygon_with_hole() {
        let mut factory = GeoFactory::new();
        factory.multipolygon_start();
        factory.multipolygon_polygon_start();
        factory.multipolygon_outer_ring_start();
        square(&mut factory, 0.0, 4.0);
        factory.multipolygon_outer_ring_finish().unwrap();
        factory.multipolygon_inner_ring_start();
        square(&mut factory, 1.0, 2.0);
        factory.multipolygon_inner_ring_finish().unwrap();
        factory.multipolygon_polygon_finish().unwrap();

        factory.multipolygon_polygon_start();
        factory.multipolygon_outer_ring_start();
        square(&mut factory, 10.0, 11.0);
        factory.multipolygon_outer_ring_finish().unwrap();
        factory.multipolygon_polygon_finish().unwrap();

        let multi = factory.multipolygon_finish().unwrap();
        assert_eq!(multi.0.len(), 2);
        assert_eq!(multi.0[0].interiors().len(), 1);
        assert!((multi.unsigned_area() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn inner_ring_needs_an_outer_ring() {
        let mut factory = GeoFactory::new();
        factory.multipolygon_start();
        factory.multipolygon_polygon_start();
        factory.multipolygon_inner_ring_start();
        square(&mut factory, 0.0, 1.0);
        assert_eq!(
            factory.multipolygon_inner_ring_finish(),
            Err(FactoryError::MissingOuterRing)
        );
        assert_eq!(
            factory.multipolygon_polygon_finish(),
            Err(FactoryError::MissingOuterRing)
        );
    }
}
