#![warn(clippy::pedantic)]

//! Turns entity views into geometries.
//!
//! The driver functions in [`create`] walk a node, way or ring set and
//! feed its coordinates to a [`GeometryFactory`], which decides what the
//! result looks like. Two factories ship with the crate: [`GeoFactory`]
//! builds [`geo`] types and [`WktFactory`] writes well-known text.

pub mod coordinates;
pub mod create;
pub mod error;
pub mod factory;
pub mod wkt;

pub use coordinates::Coordinates;
pub use create::{
    Direction, UseNodes, create_linestring, create_multipolygon, create_point, create_polygon,
};
pub use error::{FactoryError, GeometryError};
pub use factory::{GeoFactory, GeometryFactory};
pub use wkt::WktFactory;
