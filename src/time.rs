use hifitime::{Epoch, Unit};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{Degree, Hour, J2000Seconds, GAMMA_J2000, HOUR_TO_DEG, SIDEREAL_DAY};
use crate::vlbi_errors::VlbiError;

static UTC_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d{4})[/-](\d{1,2})[/-](\d{1,2})[ T](\d{1,2}):(\d{1,2}):(\d{1,2})(?:\.(\d{1,9}))?\s*$",
    )
    .expect("UTC date pattern is a valid regex")
});

/// The J2000 reference epoch, 2000-01-01T12:00:00 UTC.
pub fn j2000_epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_noon(2000, 1, 1)
}

/// Elapsed seconds between the J2000 reference epoch and `epoch`.
///
/// Negative for epochs before J2000.
pub fn j2000_seconds(epoch: &Epoch) -> J2000Seconds {
    (*epoch - j2000_epoch()).to_seconds()
}

/// Inverse of [`j2000_seconds`].
pub fn epoch_from_j2000_seconds(seconds: J2000Seconds) -> Epoch {
    j2000_epoch() + Unit::Second * seconds
}

/// Parse a UTC timestamp of the form `YYYY/MM/DD HH:MM:SS[.fff]`.
///
/// Dashes are accepted in place of slashes and `T` in place of the blank separator,
/// so ISO-8601 strings without a time zone parse as well.
///
/// Arguments
/// ---------
/// * `date`: the timestamp string, interpreted in the UTC time scale
///
/// Return
/// ------
/// * the corresponding [`Epoch`], or [`VlbiError::InvalidDate`] if the string does not
///   match the pattern or names an impossible calendar date
pub fn parse_utc_string(date: &str) -> Result<Epoch, VlbiError> {
    let caps = UTC_STRING
        .captures(date)
        .ok_or_else(|| VlbiError::InvalidDate(date.to_string()))?;

    let field = |i: usize| -> Result<u32, VlbiError> {
        caps[i]
            .parse::<u32>()
            .map_err(|_| VlbiError::InvalidDate(date.to_string()))
    };

    let year = field(1)? as i32;
    let month = field(2)? as u8;
    let day = field(3)? as u8;
    let hour = field(4)? as u8;
    let minute = field(5)? as u8;
    let second = field(6)? as u8;

    // right-pad the fraction to nanoseconds: ".5" is 500_000_000 ns
    let nanos = match caps.get(7) {
        Some(frac) => {
            let digits = frac.as_str();
            let padded = format!("{digits:0<9}");
            padded
                .parse::<u32>()
                .map_err(|_| VlbiError::InvalidDate(date.to_string()))?
        }
        None => 0,
    };

    Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos)
        .map_err(|e| VlbiError::InvalidDate(format!("{date}: {e}")))
}

/// Wrap a value in hours into `[0, 24)`.
pub fn wrap_hours(hours: Hour) -> Hour {
    let wrapped = hours.rem_euclid(24.0);
    // rem_euclid may round up to exactly 24.0 for tiny negative inputs
    if wrapped >= 24.0 {
        0.0
    } else {
        wrapped
    }
}

/// Local sidereal time at a site.
///
/// The Greenwich sidereal time is propagated linearly from its value at J2000
/// ([`GAMMA_J2000`]) at the sidereal rate, then shifted by the site longitude.
///
/// Arguments
/// ---------
/// * `seconds`: elapsed seconds since J2000 (see [`j2000_seconds`])
/// * `longitude`: site longitude in **degrees**, east positive
///
/// Return
/// ------
/// * the local sidereal time in **hours**, wrapped to `[0, 24)`
pub fn local_sidereal_time(seconds: J2000Seconds, longitude: Degree) -> Hour {
    let gst = GAMMA_J2000 + 24.0 * seconds / SIDEREAL_DAY;
    wrap_hours(gst + longitude / HOUR_TO_DEG)
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_j2000_round_trip() {
        assert_eq!(j2000_seconds(&j2000_epoch()), 0.0);

        let epoch = epoch_from_j2000_seconds(86_400.5);
        assert_abs_diff_eq!(j2000_seconds(&epoch), 86_400.5, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_utc_string() {
        let epoch = parse_utc_string("2000/01/01 12:00:00").unwrap();
        assert_eq!(j2000_seconds(&epoch), 0.0);

        let epoch = parse_utc_string("2000-01-01T12:00:01.5").unwrap();
        assert_abs_diff_eq!(j2000_seconds(&epoch), 1.5, epsilon = 1e-9);

        assert_eq!(
            parse_utc_string("yesterday"),
            Err(VlbiError::InvalidDate("yesterday".into()))
        );
        assert!(parse_utc_string("2021/13/01 00:00:00").is_err());
    }

    #[test]
    fn test_lst_at_epoch() {
        assert_abs_diff_eq!(local_sidereal_time(0.0, 0.0), GAMMA_J2000, epsilon = 1e-12);

        // 90° east is six sidereal hours ahead
        let lst = local_sidereal_time(0.0, 90.0);
        assert_abs_diff_eq!(lst, wrap_hours(GAMMA_J2000 + 6.0), epsilon = 1e-12);
    }

    #[test]
    fn test_lst_wraps_after_one_sidereal_day() {
        let lst0 = local_sidereal_time(1_000.0, 12.5);
        let lst1 = local_sidereal_time(1_000.0 + SIDEREAL_DAY, 12.5);
        assert_abs_diff_eq!(lst0, lst1, epsilon = 1e-9);

        for secs in [-5.0e8, -1.0, 0.0, 3.3e5, 7.7e8] {
            let lst = local_sidereal_time(secs, -170.0);
            assert!((0.0..24.0).contains(&lst));
        }
    }
}
