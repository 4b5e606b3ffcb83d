use std::fmt;

use geoarena_types::{Location, TypeError};

/// A location in floating point degrees, `x` is longitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Append `x`, `infix` and `y` to `out`, each number with at most
    /// `precision` decimals and no trailing zeros.
    pub fn append_to_string(&self, out: &mut String, infix: char, precision: usize) {
        push_number(out, self.x, precision);
        out.push(infix);
        push_number(out, self.y, precision);
    }

    /// Like [`append_to_string`](Self::append_to_string), wrapped in
    /// `prefix` and `suffix`.
    pub fn append_wrapped(
        &self,
        out: &mut String,
        prefix: char,
        infix: char,
        suffix: char,
        precision: usize,
    ) {
        out.push(prefix);
        self.append_to_string(out, infix, precision);
        out.push(suffix);
    }
}

impl TryFrom<Location> for Coordinates {
    type Error = TypeError;

    fn try_from(location: Location) -> Result<Self, TypeError> {
        Ok(Self::new(location.lon()?, location.lat()?))
    }
}

impl From<Coordinates> for geo::Coord<f64> {
    fn from(xy: Coordinates) -> Self {
        geo::Coord { x: xy.x, y: xy.y }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

fn push_number(out: &mut String, value: f64, precision: usize) {
    let text = format!("{value:.precision$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    out.push_str(if text == "-0" { "0" } else { text });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(xy: Coordinates, precision: usize) -> String {
        let mut out = String::new();
        xy.append_to_string(&mut out, ' ', precision);
        out
    }

    #[test]
    fn trailing_zeros_are_dropped() {
        assert_eq!(render(Coordinates::new(1.5, -2.0), 7), "1.5 -2");
        assert_eq!(render(Coordinates::new(3.123_456_789, 0.0), 7), "3.1234568 0");
        assert_eq!(render(Coordinates::new(-0.000_000_01, 10.0), 7), "0 10");
    }

    #[test]
    fn wrapped_and_display() {
        let mut out = String::from("P");
        Coordinates::new(1.0, 2.25).append_wrapped(&mut out, '(', ',', ')', 3);
        assert_eq!(out, "P(1,2.25)");
        assert_eq!(Coordinates::new(1.0, 2.25).to_string(), "(1,2.25)");
    }

    #[test]
    fn from_location() {
        let xy = Coordinates::try_from(Location::new_raw(15_000_000, -25_000_000)).unwrap();
        assert_eq!(xy, Coordinates::new(1.5, -2.5));
        assert!(Coordinates::try_from(Location::undefined()).is_err());
    }
}
