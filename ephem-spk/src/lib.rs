//! Reader for JPL binary SPK ephemeris kernels.
//!
//! Supports the DAF container layout and type-2 (Chebyshev position)
//! segments, which cover the DE440/441 planetary kernels and the
//! sb441 small-body kernels. States are returned in km, km/s, and km/s^2;
//! unit conversion to AU/day belongs to the caller.

mod chebyshev;
mod daf;
mod spk;

pub use chebyshev::{clenshaw, derivative_coefficients};
pub use daf::{DafArchive, DafSummary};
pub use spk::{SpkFile, SpkSegment, State};

#[derive(Debug, Clone, PartialEq)]
pub enum SpkError {
    Io(String),
    Format(String),
    Data(String),
    SegmentNotFound { target: i32, center: i32, epoch: f64 },
}

impl std::fmt::Display for SpkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpkError::Io(msg) => write!(f, "IO error: {}", msg),
            SpkError::Format(msg) => write!(f, "invalid SPK format: {}", msg),
            SpkError::Data(msg) => write!(f, "invalid SPK data: {}", msg),
            SpkError::SegmentNotFound {
                target,
                center,
                epoch,
            } => write!(
                f,
                "no segment for body {} relative to {} at JD {}",
                target, center, epoch
            ),
        }
    }
}

impl std::error::Error for SpkError {}

/// NAIF integer codes for the bodies the force model queries.
pub mod naif {
    pub const SOLAR_SYSTEM_BARYCENTER: i32 = 0;
    pub const MERCURY_BARYCENTER: i32 = 1;
    pub const VENUS_BARYCENTER: i32 = 2;
    pub const EARTH_MOON_BARYCENTER: i32 = 3;
    pub const MARS_BARYCENTER: i32 = 4;
    pub const JUPITER_BARYCENTER: i32 = 5;
    pub const SATURN_BARYCENTER: i32 = 6;
    pub const URANUS_BARYCENTER: i32 = 7;
    pub const NEPTUNE_BARYCENTER: i32 = 8;
    pub const PLUTO_BARYCENTER: i32 = 9;
    pub const SUN: i32 = 10;
    pub const MOON: i32 = 301;
    pub const EARTH: i32 = 399;
}
