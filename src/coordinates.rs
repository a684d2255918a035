//! # Coordinate geometry for baselines and visibilities
//!
//! Pure, stateless functions converting between the angular and Cartesian frames the
//! synthesis pipeline walks through:
//!
//! ```text
//! geographic (lat, lon, el) --> Earth-fixed XYZ --> baseline vector
//!                                                      |
//!          (LST, RA) --> hour angle -----------------> parametric projection (x, y, w)
//!          (HA, Dec, Lat) --> (Alt, Az) -> ENU ------> horizontal projection (x, y, w)
//!                                                      |
//!                                                      v
//!                                     uv coordinates (u, v) and geometric delay
//! ```
//!
//! ## Frames & units
//!
//! - **Earth-fixed XYZ**: X towards (lat 0°, lon 0°), Y towards (lat 0°, lon 90°E), Z towards
//!   the north pole. Meters.
//! - **ENU**: East/North/Up at a reference site. Meters.
//! - Right ascension, hour angle and sidereal time are **hours**. Every other angle in a public
//!   signature is **degrees**. Radians only appear inside function bodies.
//!
//! ## Degeneracies
//!
//! Azimuth is undefined at the zenith and at the poles. Instead of dividing by zero, the
//! functions below clamp the offending denominators and return a finite azimuth of 0°.
//!
//! ## See also
//! ------------
//! * [`crate::time::local_sidereal_time`] – sidereal time feeding [`hour_angle`].
//! * [`crate::baselines::Baseline::projection`] – the main consumer of this module.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{
    Degree, Hertz, Hour, J2000Seconds, Meter, Radian, AIRY, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS,
    EPS, HOUR_TO_DEG, SPEED_OF_LIGHT,
};
use crate::time::local_sidereal_time;

/// Position of a visibility sample in the UV plane, together with its geometric delay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UvCoordinate {
    /// East-west spatial frequency, in units of the UV grid.
    pub u: f64,
    /// North-south spatial frequency, in units of the UV grid.
    pub v: f64,
    /// Geometric delay in seconds.
    pub delay: f64,
}

/// Wrap a value in hours into `[-12, 12)`.
fn wrap_signed_hours(hours: Hour) -> Hour {
    let wrapped = (hours + 12.0).rem_euclid(24.0) - 12.0;
    if wrapped >= 12.0 {
        -12.0
    } else {
        wrapped
    }
}

/// Clamp a cosine argument into the domain of `acos`.
#[inline]
fn clamp_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

/// Local hour angle of a target.
///
/// Arguments
/// ---------
/// * `lst`: local sidereal time in **hours**
/// * `ra`: right ascension of the target in **hours**
///
/// Return
/// ------
/// * `lst - ra` in **hours**, wrapped to `[-12, 12)`
pub fn hour_angle(lst: Hour, ra: Hour) -> Hour {
    wrap_signed_hours(lst - ra)
}

/// Horizontal coordinates of a target from its hour angle and declination.
///
/// Standard spherical trigonometry:
///
/// ```text
/// sin(alt) = sin(dec)·sin(lat) + cos(dec)·cos(lat)·cos(ha)
/// cos(az)  = (sin(dec) − sin(alt)·sin(lat)) / (cos(alt)·cos(lat))
/// ```
///
/// The azimuth is measured from north through east. It is reflected to `360° − az` when
/// `sin(ha) > 0`, i.e. once the target has crossed the meridian, which keeps it continuous.
///
/// Arguments
/// ---------
/// * `ha`: hour angle in **hours**
/// * `dec`: declination in **degrees**
/// * `lat`: site latitude in **degrees**
///
/// Return
/// ------
/// * `(alt, az)` in **degrees**. At the zenith or at the poles the azimuth is 0°.
pub fn alt_az(ha: Hour, dec: Degree, lat: Degree) -> (Degree, Degree) {
    let ha: Radian = (ha * HOUR_TO_DEG).to_radians();
    let dec: Radian = dec.to_radians();
    let lat: Radian = lat.to_radians();

    let alt = clamp_unit(dec.sin() * lat.sin() + dec.cos() * lat.cos() * ha.cos()).asin();

    let denominator = alt.cos() * lat.cos();
    let mut az = if denominator.abs() < EPS {
        0.0
    } else {
        clamp_unit((dec.sin() - alt.sin() * lat.sin()) / denominator)
            .acos()
            .to_degrees()
    };
    if ha.sin() > 0.0 {
        az = 360.0 - az;
    }

    (alt.to_degrees(), az.rem_euclid(360.0))
}

/// Inverse of [`alt_az`]: hour angle and declination of a horizontal direction.
///
/// Arguments
/// ---------
/// * `alt`: altitude in **degrees**
/// * `az`: azimuth in **degrees** (north through east)
/// * `lat`: site latitude in **degrees**
///
/// Return
/// ------
/// * `(ha, dec)` with the hour angle in **hours** wrapped to `[-12, 12)` and the declination
///   in **degrees**. At the poles the hour angle is 0h.
pub fn ha_dec_from_alt_az(alt: Degree, az: Degree, lat: Degree) -> (Hour, Degree) {
    let alt: Radian = alt.to_radians();
    let az: Radian = az.to_radians();
    let lat: Radian = lat.to_radians();

    let dec = clamp_unit(alt.sin() * lat.sin() + alt.cos() * lat.cos() * az.cos()).asin();

    let denominator = lat.cos() * dec.cos();
    let mut ha = if denominator.abs() < EPS {
        0.0
    } else {
        clamp_unit((alt.sin() - lat.sin() * dec.sin()) / denominator)
            .acos()
            .to_degrees()
    };
    // east of the meridian the target has not transited yet
    if az.sin() > 0.0 {
        ha = -ha;
    }

    (wrap_signed_hours(ha / HOUR_TO_DEG), dec.to_degrees())
}

/// Horizontal coordinates of an equatorial target seen from a site at a given time.
///
/// Arguments
/// ---------
/// * `seconds`: elapsed seconds since J2000
/// * `ra`: right ascension in **hours**
/// * `dec`: declination in **degrees**
/// * `lat`, `lon`: site latitude and longitude in **degrees** (east positive)
///
/// Return
/// ------
/// * `(alt, az)` in **degrees**
///
/// See also
/// ------------
/// * [`local_sidereal_time`], [`hour_angle`], [`alt_az`]
pub fn alt_az_from_ra_dec(
    seconds: J2000Seconds,
    ra: Hour,
    dec: Degree,
    lat: Degree,
    lon: Degree,
) -> (Degree, Degree) {
    let lst = local_sidereal_time(seconds, lon);
    alt_az(hour_angle(lst, ra), dec, lat)
}

/// Convert a geographic position into Earth-fixed Cartesian coordinates.
///
/// The Earth is modelled as a sphere whose radius follows the latitude: the polar radius
/// plus the equatorial/polar difference scaled by `|cos(lat)|`. The elevation is added on
/// top of that radius.
///
/// Arguments
/// ---------
/// * `lat`: latitude in **degrees**
/// * `lon`: longitude in **degrees**, east positive
/// * `el`: elevation above the reference surface in **meters**
///
/// Return
/// ------
/// * Earth-fixed `(x, y, z)` in **meters**
pub fn geographic_to_cartesian(lat: Degree, lon: Degree, el: Meter) -> Vector3<f64> {
    let lat: Radian = lat.to_radians();
    let lon: Radian = lon.to_radians();

    let radius =
        EARTH_MINOR_AXIS + (EARTH_MAJOR_AXIS - EARTH_MINOR_AXIS) * lat.cos().abs() + el;

    Vector3::new(
        radius * lat.cos() * lon.cos(),
        radius * lat.cos() * lon.sin(),
        radius * lat.sin(),
    )
}

/// Rotate an Earth-fixed vector into the East/North/Up frame of a reference site.
pub fn enu_from_ecef(vector: &Vector3<f64>, lat: Degree, lon: Degree) -> Vector3<f64> {
    let (slat, clat) = lat.to_radians().sin_cos();
    let (slon, clon) = lon.to_radians().sin_cos();

    Vector3::new(
        -slon * vector.x + clon * vector.y,
        -slat * clon * vector.x - slat * slon * vector.y + clat * vector.z,
        clat * clon * vector.x + clat * slon * vector.y + slat * vector.z,
    )
}

/// Reduce the positions of the stations of a correlation group to one baseline vector.
///
/// For two stations this is the plain difference `p1 − p0`. For higher orders every station
/// is taken relative to the first one and the differences are summed.
///
/// Return
/// ------
/// * the baseline vector in **meters**, or the zero vector for fewer than two positions
pub fn baseline_vector(positions: &[Vector3<f64>]) -> Vector3<f64> {
    match positions.split_first() {
        Some((first, rest)) => rest
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + (p - first)),
        None => Vector3::zeros(),
    }
}

/// Geometric center of a correlation group.
pub fn baseline_center(positions: &[Vector3<f64>]) -> Vector3<f64> {
    if positions.is_empty() {
        return Vector3::zeros();
    }
    positions.iter().sum::<Vector3<f64>>() / positions.len() as f64
}

/// Length in meters of the reduced baseline of a correlation group.
pub fn baseline_length(positions: &[Vector3<f64>]) -> Meter {
    baseline_vector(positions).norm()
}

/// Factor dividing a projection by the sine of the target elevation.
///
/// The sine is clamped to [`EPS`]: at or below the horizon the projection is pushed far
/// outside any image instead of diverging or changing sign.
fn elevation_scale(alt: Degree) -> f64 {
    1.0 / alt.to_radians().sin().max(EPS)
}

/// Projection of an Earth-fixed baseline for an equatorial pointing.
///
/// Standard interferometric `(u, v, w)` geometry, with the baseline expressed in Earth-fixed
/// axes and the hour angle taken at the Greenwich meridian, normalized by the sine of the
/// target elevation `e`:
///
/// ```text
/// x = ( sin(h)·Bx + cos(h)·By) / sin(e)
/// y = (−sin(δ)·cos(h)·Bx + sin(δ)·sin(h)·By + cos(δ)·Bz) / sin(e)
/// w = ( cos(δ)·cos(h)·Bx − cos(δ)·sin(h)·By + sin(δ)·Bz) / sin(e)
/// ```
///
/// Arguments
/// ---------
/// * `baseline`: Earth-fixed baseline vector in **meters**
/// * `ha`: Greenwich hour angle of the target in **hours**
/// * `dec`: declination of the target in **degrees**
/// * `alt`: elevation of the target at the reference station in **degrees**
///
/// Return
/// ------
/// * `(x, y, w)` in **meters**; `w` is the path difference along the line of sight
pub fn parametric_projection(
    baseline: &Vector3<f64>,
    ha: Hour,
    dec: Degree,
    alt: Degree,
) -> Vector3<f64> {
    let (sh, ch) = (ha * HOUR_TO_DEG).to_radians().sin_cos();
    let (sd, cd) = dec.to_radians().sin_cos();
    let (bx, by, bz) = (baseline.x, baseline.y, baseline.z);

    Vector3::new(
        sh * bx + ch * by,
        -sd * ch * bx + sd * sh * by + cd * bz,
        cd * ch * bx - cd * sh * by + sd * bz,
    ) * elevation_scale(alt)
}

/// Projection of a local (ENU) baseline for a horizontal pointing.
///
/// The `x` axis lies in the horizon plane perpendicular to the azimuth, `y` is orthogonal
/// to it and to the line of sight, `w` is the component along the line of sight. The result
/// is normalized by `sin(alt)` like [`parametric_projection`]. At the zenith the azimuth
/// carries no information and the result only depends on `alt`.
///
/// Arguments
/// ---------
/// * `baseline_enu`: baseline in East/North/Up **meters**
/// * `alt`, `az`: pointing in **degrees**
pub fn horizontal_projection(baseline_enu: &Vector3<f64>, alt: Degree, az: Degree) -> Vector3<f64> {
    let (sa, ca) = alt.to_radians().sin_cos();
    let (sz, cz) = az.to_radians().sin_cos();
    let (be, bn, bu) = (baseline_enu.x, baseline_enu.y, baseline_enu.z);

    Vector3::new(
        be * cz - bn * sz,
        -be * sa * sz - bn * sa * cz + bu * ca,
        be * ca * sz + bn * ca * cz + bu * sa,
    ) * elevation_scale(alt)
}

/// Scale a projection into UV-grid coordinates and a delay.
///
/// `(u, v) = (x, y) · AIRY / wavelength` and `delay = w / c`.
/// A non-positive wavelength maps every baseline to the UV origin.
pub fn uv_coordinates(projection: &Vector3<f64>, wavelength: Meter) -> UvCoordinate {
    let scale = if wavelength > EPS {
        AIRY / wavelength
    } else {
        0.0
    };
    UvCoordinate {
        u: projection.x * scale,
        v: projection.y * scale,
        delay: projection.z / SPEED_OF_LIGHT,
    }
}

/// Propagation delay, in seconds, over a distance in meters.
pub fn distance_delay(distance: Meter) -> f64 {
    distance / SPEED_OF_LIGHT
}

/// Diffraction-limited angular resolution of a unit baseline at `frequency`.
pub fn resolution_zero(frequency: Hertz) -> Radian {
    AIRY * SPEED_OF_LIGHT / frequency
}

/// Angular resolution of a baseline of length `baseline_length` meters.
pub fn resolution(resolution_zero: Radian, baseline_length: Meter) -> Radian {
    resolution_zero / baseline_length
}

#[cfg(test)]
mod coordinates_test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_hour_angle_range() {
        assert_eq!(hour_angle(5.0, 3.0), 2.0);
        assert_eq!(hour_angle(1.0, 23.0), 2.0);
        assert_eq!(hour_angle(23.0, 1.0), -2.0);
        assert_eq!(hour_angle(12.0, 0.0), -12.0);

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let lst = rng.random_range(-100.0..100.0);
            let ra = rng.random_range(-100.0..100.0);
            let ha = hour_angle(lst, ra);
            assert!((-12.0..12.0).contains(&ha), "ha = {ha}");
        }
    }

    #[test]
    fn test_alt_az_on_meridian() {
        // target on the meridian, south of the zenith at mid latitudes
        let (alt, az) = alt_az(0.0, 0.0, 45.0);
        assert_abs_diff_eq!(alt, 45.0, epsilon = 1e-10);
        assert_abs_diff_eq!(az, 180.0, epsilon = 1e-10);

        // equator observer, equatorial target rising in the east
        let (alt, az) = alt_az(-6.0, 0.0, 0.0);
        assert_abs_diff_eq!(alt, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(az, 90.0, epsilon = 1e-10);

        // and setting in the west
        let (alt, az) = alt_az(6.0, 0.0, 0.0);
        assert_abs_diff_eq!(alt, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(az, 270.0, epsilon = 1e-10);
    }

    #[test]
    fn test_alt_az_zenith_is_finite() {
        let (alt, az) = alt_az(0.0, 30.0, 30.0);
        assert_abs_diff_eq!(alt, 90.0, epsilon = 1e-6);
        assert!(az.is_finite());

        let (alt, az) = alt_az(3.0, 10.0, 90.0);
        assert_abs_diff_eq!(alt, 10.0, epsilon = 1e-10);
        assert!(az.is_finite());
    }

    #[test]
    fn test_alt_az_inverse() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut checked = 0;
        while checked < 2_000 {
            let ha = rng.random_range(-11.9..11.9);
            let dec = rng.random_range(-80.0..80.0);
            let lat = rng.random_range(-80.0..80.0);

            let (alt, az) = alt_az(ha, dec, lat);
            if alt.abs() > 80.0 {
                continue;
            }
            let (ha_back, dec_back) = ha_dec_from_alt_az(alt, az, lat);
            assert_abs_diff_eq!(dec_back, dec, epsilon = 1e-6);
            assert_abs_diff_eq!(ha_back, ha, epsilon = 1e-6);
            checked += 1;
        }
    }

    #[test]
    fn test_geographic_to_cartesian() {
        let p = geographic_to_cartesian(0.0, 0.0, 0.0);
        assert_relative_eq!(p, Vector3::new(EARTH_MAJOR_AXIS, 0.0, 0.0), epsilon = 1e-6);

        let p = geographic_to_cartesian(0.0, 90.0, 10.0);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, EARTH_MAJOR_AXIS + 10.0, epsilon = 1e-6);

        let p = geographic_to_cartesian(90.0, 0.0, 0.0);
        assert_abs_diff_eq!(p.z, EARTH_MINOR_AXIS, epsilon = 1e-6);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);

        let p = geographic_to_cartesian(-45.0, 0.0, 0.0);
        let expected_radius =
            EARTH_MINOR_AXIS + (EARTH_MAJOR_AXIS - EARTH_MINOR_AXIS) * 45f64.to_radians().cos();
        assert_relative_eq!(p.norm(), expected_radius, epsilon = 1e-6);
        assert!(p.z < 0.0);
    }

    #[test]
    fn test_enu_from_ecef() {
        // at (0°, 0°) east is +Y, north is +Z, up is +X
        let enu = enu_from_ecef(&Vector3::new(1.0, 2.0, 3.0), 0.0, 0.0);
        assert_relative_eq!(enu, Vector3::new(2.0, 3.0, 1.0), epsilon = 1e-12);

        // at the north pole up is +Z
        let enu = enu_from_ecef(&Vector3::new(0.0, 0.0, 5.0), 90.0, 0.0);
        assert_abs_diff_eq!(enu.z, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_baseline_vector() {
        let p0 = Vector3::new(1.0, 1.0, 1.0);
        let p1 = Vector3::new(4.0, 5.0, 1.0);
        let p2 = Vector3::new(1.0, 1.0, 3.0);

        assert_eq!(baseline_vector(&[p0, p1]), Vector3::new(3.0, 4.0, 0.0));
        assert_eq!(baseline_vector(&[p0, p1, p2]), Vector3::new(3.0, 4.0, 2.0));
        assert_eq!(baseline_vector(&[p0]), Vector3::zeros());
        assert_eq!(baseline_vector(&[]), Vector3::zeros());

        assert_eq!(baseline_center(&[p0, p1]), Vector3::new(2.5, 3.0, 1.0));
        assert_eq!(baseline_length(&[p0, p1]), 5.0);
    }

    #[test]
    fn test_parametric_projection_w_is_line_of_sight() {
        // source on the Greenwich meridian at the equator: line of sight is +X
        let b = Vector3::new(10.0, 3.0, -2.0);
        let proj = parametric_projection(&b, 0.0, 0.0, 90.0);
        assert_abs_diff_eq!(proj.z, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(proj.x, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(proj.y, -2.0, epsilon = 1e-12);

        // source at the celestial pole: w is the polar component, uv is the equatorial plane
        let proj = parametric_projection(&b, 4.0, 90.0, 90.0);
        assert_abs_diff_eq!(proj.z, -2.0, epsilon = 1e-12);
        assert_relative_eq!(proj.x.hypot(proj.y), 10f64.hypot(3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_projection_is_normalized_by_elevation() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let b = Vector3::new(
                rng.random_range(-1e4..1e4),
                rng.random_range(-1e4..1e4),
                rng.random_range(-1e4..1e4),
            );
            let alt: f64 = rng.random_range(1.0..90.0);
            let sin_alt = alt.to_radians().sin();

            let ha = rng.random_range(-12.0..12.0);
            let dec = rng.random_range(-90.0..90.0);
            let p = parametric_projection(&b, ha, dec, alt);
            assert_relative_eq!(p.norm() * sin_alt, b.norm(), max_relative = 1e-12);

            let h = horizontal_projection(&b, alt, rng.random_range(0.0..360.0));
            assert_relative_eq!(h.norm() * sin_alt, b.norm(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_projection_below_horizon_is_clamped() {
        let b = Vector3::new(100.0, -50.0, 20.0);
        for alt in [0.0, -0.0, -10.0, -90.0] {
            let p = parametric_projection(&b, 1.0, 10.0, alt);
            let h = horizontal_projection(&b, alt, 45.0);
            assert!(p.iter().chain(h.iter()).all(|c| c.is_finite()));
            assert_relative_eq!(p.norm(), b.norm() / EPS, max_relative = 1e-9);
            assert_relative_eq!(h.norm(), b.norm() / EPS, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_horizontal_projection_zenith() {
        let b = Vector3::new(3.0, 4.0, 1.0);
        let proj = horizontal_projection(&b, 90.0, 0.0);
        assert_abs_diff_eq!(proj.z, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(proj.x, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(proj.y, -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uv_scaling_is_linear_in_inverse_wavelength() {
        let proj = Vector3::new(120.0, -45.0, 30.0);
        let uv1 = uv_coordinates(&proj, 0.5);
        let uv2 = uv_coordinates(&proj, 1.0);

        assert_relative_eq!(uv1.u, 2.0 * uv2.u, max_relative = 1e-14);
        assert_relative_eq!(uv1.v, 2.0 * uv2.v, max_relative = 1e-14);
        assert_eq!(uv1.delay, uv2.delay);
        assert_relative_eq!(uv2.u, 120.0 * AIRY, max_relative = 1e-14);
        assert_relative_eq!(uv2.delay, 30.0 / SPEED_OF_LIGHT, max_relative = 1e-14);

        let degenerate = uv_coordinates(&proj, 0.0);
        assert_eq!((degenerate.u, degenerate.v), (0.0, 0.0));
    }

    #[test]
    fn test_resolution() {
        let r0 = resolution_zero(SPEED_OF_LIGHT);
        assert_relative_eq!(r0, AIRY);
        assert_relative_eq!(resolution(r0, 2.0), AIRY / 2.0);
        assert_relative_eq!(distance_delay(SPEED_OF_LIGHT), 1.0);
    }
}
