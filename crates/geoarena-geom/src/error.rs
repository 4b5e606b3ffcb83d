use geoarena_types::{ItemType, TypeError};

/// Errors raised by a [`GeometryFactory`](crate::GeometryFactory) while
/// assembling a geometry.
///
/// ```text
///   FactoryError
///   ├── OutOfOrder       ← a call that does not fit the current state
///   ├── RingNotClosed    ← first and last point of a ring differ
///   ├── RingTooShort     ← a ring with fewer than 4 points
///   └── MissingOuterRing ← inner ring or polygon end without an outer ring
/// ```
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("{call} called out of order")]
    OutOfOrder { call: &'static str },

    #[error("ring of {points} points is not closed")]
    RingNotClosed { points: usize },

    #[error("ring needs at least 4 points, got {points}")]
    RingTooShort { points: usize },

    #[error("polygon without an outer ring")]
    MissingOuterRing,
}

/// Errors from the [`create`](crate::create) drivers, with the entity
/// they were working on.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("node {id} has an invalid location")]
    InvalidLocation {
        id: i64,
        #[source]
        source: TypeError,
    },

    #[error("{kind} {id} has too few points for a {geometry}")]
    TooFewPoints {
        kind: ItemType,
        id: i64,
        geometry: &'static str,
    },

    #[error("could not build a {geometry} for {kind} {id}")]
    Geometry {
        kind: ItemType,
        id: i64,
        geometry: &'static str,
        #[source]
        source: FactoryError,
    },

    #[error(transparent)]
    Record(#[from] TypeError),
}
