//! Physical constants in AU, days, and solar masses.
//!
//! Every GM value, radius, and conversion factor used by the force model
//! lives here. Mixing values from this table with hand-copied constants
//! elsewhere is forbidden; the variational blocks must differentiate the
//! exact accelerations these numbers produce.

/// Julian date of the J2000.0 epoch (TDB).
pub const J2000_JD: f64 = 2451545.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Astronomical Unit in kilometers (IAU 2012 definition).
pub const AU_KM: f64 = 149597870.700;

/// Speed of light in AU/day.
pub const SPEED_OF_LIGHT_AU_DAY: f64 = 173.14463267424031;

/// Gravitational constant in AU^3 M_sun^-1 day^-2 (DE440/441 convention).
pub const GRAVITATIONAL_CONSTANT: f64 = 2.959122082841196e-4;

/// GM of the Sun, planets, Moon, and Pluto in AU^3/day^2, DE440/441 values.
///
/// Indexed by perturber id 0..11: Sun, Mercury, Venus, Earth, Moon, Mars,
/// Jupiter, Saturn, Uranus, Neptune, Pluto.
pub const PLANETARY_GM: [f64; 11] = [
    0.2959122082841196e-03,  // Sun
    0.4912500194889318e-10,  // Mercury
    0.7243452332644119e-09,  // Venus
    0.8887692446707102e-09,  // Earth
    0.1093189462402435e-10,  // Moon
    0.9549548829725812e-10,  // Mars
    0.2825345825225792e-06,  // Jupiter
    0.8459705993376290e-07,  // Saturn
    0.1292026564968240e-07,  // Uranus
    0.1524357347885194e-07,  // Neptune
    0.2175096464893358e-11,  // Pluto
];

/// GM of the sixteen massive main-belt asteroids in AU^3/day^2 (DE441),
/// ordered to match the segment order of the sb441-n16 small-body kernel.
pub const ASTEROID_GM: [f64; 16] = [
    3.2191392075878588e-15,  // 107 Camilla
    1.3964518123081070e-13,  // 1 Ceres
    2.0917175955133682e-15,  // 65 Cybele
    8.6836253492286545e-15,  // 511 Davida
    4.5107799051436795e-15,  // 15 Eunomia
    2.4067012218937576e-15,  // 31 Euphrosyne
    5.9824315264869841e-15,  // 52 Europa
    1.2542530761640810e-14,  // 10 Hygiea
    6.3110343420878887e-15,  // 704 Interamnia
    2.5416014973471498e-15,  // 7 Iris
    4.2823439677995011e-15,  // 3 Juno
    3.0471146330043200e-14,  // 2 Pallas
    3.5445002842488978e-15,  // 16 Psyche
    4.8345606546105521e-15,  // 87 Sylvia
    2.6529436610356353e-15,  // 88 Thisbe
    3.8548000225257904e-14,  // 4 Vesta
];

/// Earth zonal harmonics (DE441-aligned J2) and equatorial radius.
pub const EARTH_J2: f64 = 1.0826253900e-3;
pub const EARTH_J4: f64 = -1.619898e-6;
pub const EARTH_RADIUS_EQ_AU: f64 = 6378.1366 / AU_KM;

/// Solar J2 and equatorial radius.
pub const SUN_J2: f64 = 2.196139151652982e-7;
pub const SUN_RADIUS_EQ_AU: f64 = 696000.0 / AU_KM;

/// Earth pole at the J2000 epoch, degrees. The sub-arcsecond drift of the
/// pole over an integration is not modelled.
pub const EARTH_POLE_RA_DEG: f64 = 0.0;
pub const EARTH_POLE_DEC_DEG: f64 = 90.0;

/// Sun pole orientation (IAU), degrees.
pub const SUN_POLE_RA_DEG: f64 = 286.13;
pub const SUN_POLE_DEC_DEG: f64 = 63.87;
