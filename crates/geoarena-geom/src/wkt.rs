use std::mem;

use crate::coordinates::Coordinates;
use crate::error::FactoryError;
use crate::factory::{GeometryFactory, check_ring};

/// Writes geometries as well-known text, e.g. `LINESTRING(1 2,3 4)`.
#[derive(Debug)]
pub struct WktFactory {
    precision: usize,
    points: Vec<Coordinates>,
    polygon: Option<String>,
    rings_in_polygon: usize,
    out: String,
}

impl Default for WktFactory {
    /// Seven decimals, the resolution of a stored location.
    fn default() -> Self {
        Self::with_precision(7)
    }
}

impl WktFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_precision(precision: usize) -> Self {
        Self {
            precision,
            points: Vec::new(),
            polygon: None,
            rings_in_polygon: 0,
            out: String::new(),
        }
    }

    /// `(x y,x y,...)` for the collected points.
    fn take_point_list(&mut self) -> String {
        let mut text = String::from("(");
        for (i, xy) in mem::take(&mut self.points).iter().enumerate() {
            if i > 0 {
                text.push(',');
            }
            xy.append_to_string(&mut text, ' ', self.precision);
        }
        text.push(')');
        text
    }

    fn push_ring(&mut self) -> Result<(), FactoryError> {
        check_ring(&self.points)?;
        let ring = self.take_point_list();
        let Some(polygon) = self.polygon.as_mut() else {
            return Err(FactoryError::OutOfOrder {
                call: "multipolygon ring outside a polygon",
            });
        };
        if self.rings_in_polygon > 0 {
            polygon.push(',');
        }
        polygon.push_str(&ring);
        self.rings_in_polygon += 1;
        Ok(())
    }
}

impl GeometryFactory for WktFactory {
    type Point = String;
    type LineString = String;
    type Polygon = String;
    type MultiPolygon = String;

    fn make_point(&self, xy: Coordinates) -> String {
        let mut out = String::from("POINT");
        xy.append_wrapped(&mut out, '(', ' ', ')', self.precision);
        out
    }

    fn linestring_start(&mut self) {
        self.points.clear();
    }

    fn linestring_add_point(&mut self, xy: Coordinates) {
        self.points.push(xy);
    }

    fn linestring_finish(&mut self, _num_points: usize) -> Result<String, FactoryError> {
        Ok(format!("LINESTRING{}", self.take_point_list()))
    }

    fn polygon_start(&mut self) {
        self.points.clear();
    }

    fn polygon_add_point(&mut self, xy: Coordinates) {
        self.points.push(xy);
    }

    fn polygon_finish(&mut self, _num_points: usize) -> Result<String, FactoryError> {
        check_ring(&self.points)?;
        Ok(format!("POLYGON({})", self.take_point_list()))
    }

    fn multipolygon_start(&mut self) {
        self.points.clear();
        self.polygon = None;
        self.out = String::from("MULTIPOLYGON(");
    }

    fn multipolygon_polygon_start(&mut self) {
        self.polygon = Some(String::from("("));
        self.rings_in_polygon = 0;
    }

    fn multipolygon_polygon_finish(&mut self) -> Result<(), FactoryError> {
        let polygon = self.polygon.take().ok_or(FactoryError::OutOfOrder {
            call: "multipolygon_polygon_finish",
        })?;
        if self.rings_in_polygon == 0 {
            return Err(FactoryError::MissingOuterRing);
        }
        if !self.out.ends_with('(') {
            self.out.push(',');
        }
        self.out.push_str(&polygon);
        self.out.push(')');
        Ok(())
    }

    fn multipolygon_outer_ring_start(&mut self) {
        self.points.clear();
    }

    fn multipolygon_outer_ring_finish(&mut self) -> Result<(), FactoryError> {
        if self.rings_in_polygon > 0 {
            return Err(FactoryError::OutOfOrder {
                call: "multipolygon_outer_ring_finish",
            });
        }
        self.push_ring()
    }

    fn multipolygon_inner_ring_start(&mut self) {
        self.points.clear();
    }

    fn multipolygon_inner_ring_finish(&mut self) -> Result<(), FactoryError> {
        if self.rings_in_polygon == 0 {
            return Err(FactoryError::MissingOuterRing);
        }
        self.push_ring()
    }

    fn multipolygon_add_point(&mut self, xy: Coordinates) {
        self.points.push(xy);
    }

    fn multipolygon_finish(&mut self) -> Result<String, FactoryError> {
        if self.polygon.is_some() {
            return Err(FactoryError::OutOfOrder {
                call: "multipolygon_finish",
            });
        }
        let mut out = mem::take(&mut self.out);
        out.push(')');
        Ok(out)
    }
}
