//! # Constants and type definitions for the VLBI engine
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **unit type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Geodetic and physical constants (Earth radii, speed of light, sidereal day)
//! - Angle unit aliases: right ascension and sidereal times are **hours**, every other
//!   angle crossing a public API is **degrees**
//! - Defaults shared by the baseline collection and the synthesis engine
//!
//! Unit confusion at trigonometric call sites is the main way geometry goes wrong, so the
//! aliases below are used in every public signature of [`crate::coordinates`].

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Speed of light in vacuum, in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Length of the sidereal day in SI seconds
pub const SIDEREAL_DAY: f64 = 86_164.090_5;

/// Greenwich mean sidereal time at the J2000 epoch, in hours
pub const GAMMA_J2000: f64 = 18.697_374_558;

/// Scale factor applied to the projected baseline before dividing by the wavelength
/// (first zero of the Airy pattern, in units of λ/D).
pub const AIRY: f64 = 1.219_66;

/// Hours → degrees
pub const HOUR_TO_DEG: f64 = 15.0;

/// Numerical epsilon used to detect degenerate trigonometric denominators
pub const EPS: f64 = 1e-12;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Default edge size of the UV-plane image
pub const DEFAULT_UV_SIZE: usize = 128;

/// Smallest admissible correlation order (classical two-element interferometry)
pub const MIN_CORRELATION_ORDER: usize = 2;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle or time expressed in hours (right ascension, hour angle, sidereal time)
pub type Hour = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Frequency in hertz
pub type Hertz = f64;
/// Elapsed seconds since the J2000 epoch (2000-01-01T12:00:00 UTC)
pub type J2000Seconds = f64;
