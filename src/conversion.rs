use crate::constants::{Degree, Hour};

/// Split a sexagesimal string `"A B C.C"` into its three numeric fields.
///
/// Leading `+`/`-` signs are kept on the first field as a separate flag.
fn split_sexagesimal(value: &str) -> Option<(f64, f64, f64, f64)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 {
        return None;
    }

    let sign = if parts[0].starts_with('-') { -1.0 } else { 1.0 };
    let a: f64 = parts[0].trim_start_matches(&['-', '+'][..]).parse().ok()?;
    let b: f64 = parts[1].parse().ok()?;
    let c: f64 = parts[2].parse().ok()?;
    Some((sign, a, b, c))
}

/// Parse a right ascension string to hours
///
/// Arguments
/// ---------
/// * `ra`: a string representing the right ascension in the format `HH MM SS.SS`
///
/// Returns
/// -------
/// * `Option<Hour>`: the right ascension in hours, `None` if the format is invalid or the
///   value falls outside `[0, 24)`
pub fn parse_ra_to_hours(ra: &str) -> Option<Hour> {
    let (sign, h, m, s) = split_sexagesimal(ra)?;
    if sign < 0.0 {
        return None;
    }
    let hours = h + m / 60.0 + s / 3600.0;
    (0.0..24.0).contains(&hours).then_some(hours)
}

/// Parse a declination string to degrees
///
/// Arguments
/// ---------
/// * `dec`: a string representing the declination in the format `±DD MM SS.SS`
///
/// Returns
/// -------
/// * `Option<Degree>`: the declination in degrees, `None` if the format is invalid or the
///   value falls outside `[-90, 90]`
pub fn parse_dec_to_deg(dec: &str) -> Option<Degree> {
    let (sign, d, m, s) = split_sexagesimal(dec)?;
    let deg = sign * (d + m / 60.0 + s / 3600.0);
    (-90.0..=90.0).contains(&deg).then_some(deg)
}
