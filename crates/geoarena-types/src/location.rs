use crate::error::TypeError;

/// Fixed-point scale: one coordinate unit is 1e-7 degrees.
pub const COORDINATE_PRECISION: i32 = 10_000_000;

/// Raw coordinate value marking an unset location.
pub const UNDEFINED_COORDINATE: i32 = i32::MAX;

/// Encoded size of a location: two little-endian `i32`.
pub const LOCATION_SIZE: usize = 8;

/// A longitude/latitude pair stored as fixed-point integers.
///
/// `x` is longitude and `y` latitude, both in units of 1e-7 degrees.
/// A location where either coordinate is [`UNDEFINED_COORDINATE`] is
/// undefined; one that is defined but outside ±180/±90 is invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    #[must_use]
    pub const fn new_raw(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            x: UNDEFINED_COORDINATE,
            y: UNDEFINED_COORDINATE,
        }
    }

    /// Build a location from degrees, rounding to the nearest unit.
    /// Values outside the representable range saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        let scale = f64::from(COORDINATE_PRECISION);
        Self {
            x: (lon * scale).round() as i32,
            y: (lat * scale).round() as i32,
        }
    }

    #[must_use]
    pub const fn x(self) -> i32 {
        self.x
    }

    #[must_use]
    pub const fn y(self) -> i32 {
        self.y
    }

    #[must_use]
    pub const fn is_defined(self) -> bool {
        self.x != UNDEFINED_COORDINATE && self.y != UNDEFINED_COORDINATE
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.x >= -180 * COORDINATE_PRECISION
            && self.x <= 180 * COORDINATE_PRECISION
            && self.y >= -90 * COORDINATE_PRECISION
            && self.y <= 90 * COORDINATE_PRECISION
    }

    /// Longitude in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidLocation`] for undefined or out of range
    /// locations.
    pub fn lon(self) -> Result<f64, TypeError> {
        self.check()?;
        Ok(self.lon_unchecked())
    }

    /// Latitude in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidLocation`] for undefined or out of range
    /// locations.
    pub fn lat(self) -> Result<f64, TypeError> {
        self.check()?;
        Ok(self.lat_unchecked())
    }

    #[must_use]
    pub fn lon_unchecked(self) -> f64 {
        f64::from(self.x) / f64::from(COORDINATE_PRECISION)
    }

    #[must_use]
    pub fn lat_unchecked(self) -> f64 {
        f64::from(self.y) / f64::from(COORDINATE_PRECISION)
    }

    fn check(self) -> Result<(), TypeError> {
        if self.is_defined() && self.is_valid() {
            Ok(())
        } else {
            Err(TypeError::InvalidLocation {
                x: self.x,
                y: self.y,
            })
        }
    }

    pub fn write_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
    }

    /// Read a location from the first 8 bytes of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::Truncated`] if `buf` is shorter than 8 bytes.
    pub fn read_from(buf: &[u8]) -> Result<Self, TypeError> {
        if buf.len() < LOCATION_SIZE {
            return Err(TypeError::Truncated {
                kind: "location",
                offset: buf.len(),
            });
        }
        Ok(Self {
            x: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            y: i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::undefined()
    }
}

/// Axis-aligned bounding box in fixed-point coordinates.
///
/// Starts out undefined; the first [`extend`](Bounds::extend) with a
/// defined location makes it a zero-area box around that point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    bottom_left: Location,
    top_right: Location,
}

impl Bounds {
    #[must_use]
    pub fn new(bottom_left: Location, top_right: Location) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    #[must_use]
    pub fn bottom_left(&self) -> Location {
        self.bottom_left
    }

    #[must_use]
    pub fn top_right(&self) -> Location {
        self.top_right
    }

    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.bottom_left.is_defined() && self.top_right.is_defined()
    }

    /// Grow the box to include `location`. Undefined locations are ignored.
    pub fn extend(&mut self, location: Location) -> &mut Self {
        if !location.is_defined() {
            return self;
        }
        if self.is_defined() {
            self.bottom_left = Location::new_raw(
                self.bottom_left.x().min(location.x()),
                self.bottom_left.y().min(location.y()),
            );
            self.top_right = Location::new_raw(
                self.top_right.x().max(location.x()),
                self.top_right.y().max(location.y()),
            );
        } else {
            self.bottom_left = location;
            self.top_right = location;
        }
        self
    }

    pub fn extend_bounds(&mut self, other: &Bounds) -> &mut Self {
        if other.is_defined() {
            self.extend(other.bottom_left);
            self.extend(other.top_right);
        }
        self
    }

    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        self.is_defined()
            && location.is_defined()
            && location.x() >= self.bottom_left.x()
            && location.x() <= self.top_right.x()
            && location.y() >= self.bottom_left.y()
            && location.y() <= self.top_right.y()
    }
}
