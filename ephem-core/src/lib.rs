//! Shared building blocks for ephemeris-quality trajectory integrations:
//! a small Cartesian vector type, body-equatorial frame rotations, and the
//! single table of physical constants every other crate draws from.

pub mod constants;
pub mod frame;
pub mod vector;

pub use frame::{Frame, Mat3};
pub use vector::Vector3;
