//! # Sample streams
//!
//! A [`SampleStream`] is the n-dimensional numeric buffer shared by station recordings,
//! locked baseline inputs and UV-plane models. Besides the samples it carries the
//! observation metadata needed by the geometry: UTC start time, sample rate, wavelength,
//! pointing [`Target`] and recording [`Location`].
//!
//! Streams are owned by value; deriving a stream from another one (node copy, filtering,
//! model arithmetic) always deep-copies the samples.

use hifitime::Epoch;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Hertz, Hour, J2000Seconds, Meter, SPEED_OF_LIGHT};
use crate::coordinates::geographic_to_cartesian;
use crate::time::{j2000_epoch, j2000_seconds};
use crate::vlbi_errors::VlbiError;

/// Equatorial pointing of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    /// Right ascension in **hours**
    pub ra: Hour,
    /// Declination in **degrees**
    pub dec: Degree,
    /// Distance in **meters**, 0 for a source at infinity
    pub distance: Meter,
}

impl Target {
    pub fn new(ra: Hour, dec: Degree, distance: Meter) -> Self {
        Target { ra, dec, distance }
    }
}

/// Where a stream was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Location {
    /// Geographic coordinates: latitude and longitude in degrees (east positive), elevation in meters.
    Geographic { lat: Degree, lon: Degree, el: Meter },
    /// Offset in meters from the station reference, along Earth-fixed axes.
    Relative { x: Meter, y: Meter, z: Meter },
}

impl Default for Location {
    fn default() -> Self {
        Location::Geographic {
            lat: 0.0,
            lon: 0.0,
            el: 0.0,
        }
    }
}

impl Location {
    /// Build a validated geographic location.
    ///
    /// Return
    /// ------
    /// * [`VlbiError::InvalidLocation`] if a component is not finite or the latitude is
    ///   outside `[-90, 90]`
    pub fn geographic(lat: Degree, lon: Degree, el: Meter) -> Result<Self, VlbiError> {
        if !(lat.is_finite() && lon.is_finite() && el.is_finite()) {
            return Err(VlbiError::InvalidLocation(format!(
                "non finite coordinates ({lat}, {lon}, {el})"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(VlbiError::InvalidLocation(format!(
                "latitude {lat} outside [-90, 90]"
            )));
        }
        Ok(Location::Geographic { lat, lon, el })
    }

    pub fn relative(x: Meter, y: Meter, z: Meter) -> Result<Self, VlbiError> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(VlbiError::InvalidLocation(format!(
                "non finite offset ({x}, {y}, {z})"
            )));
        }
        Ok(Location::Relative { x, y, z })
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Location::Relative { .. })
    }

    /// Earth-fixed position of this location.
    ///
    /// Relative offsets are resolved against `reference`, which is expected to be geographic.
    pub fn to_cartesian(&self, reference: &Location) -> Vector3<f64> {
        match *self {
            Location::Geographic { lat, lon, el } => geographic_to_cartesian(lat, lon, el),
            Location::Relative { x, y, z } => {
                let origin = match *reference {
                    Location::Geographic { lat, lon, el } => geographic_to_cartesian(lat, lon, el),
                    Location::Relative { x, y, z } => Vector3::new(x, y, z),
                };
                origin + Vector3::new(x, y, z)
            }
        }
    }

    /// Latitude and longitude used for pointing computations.
    ///
    /// Relative locations inherit the coordinates of `reference`.
    pub fn lat_lon(&self, reference: &Location) -> (Degree, Degree) {
        match (*self, *reference) {
            (Location::Geographic { lat, lon, .. }, _) => (lat, lon),
            (Location::Relative { .. }, Location::Geographic { lat, lon, .. }) => (lat, lon),
            (Location::Relative { .. }, Location::Relative { .. }) => (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleStream {
    data: Vec<f64>,
    shape: Vec<usize>,
    start: Epoch,
    sample_rate: Hertz,
    wavelength: Meter,
    target: Target,
    location: Location,
}

impl SampleStream {
    /// A zero-filled stream of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        SampleStream {
            data: vec![0.0; len],
            shape: shape.to_vec(),
            start: j2000_epoch(),
            sample_rate: 1.0,
            wavelength: 1.0,
            target: Target::default(),
            location: Location::default(),
        }
    }

    /// A one-dimensional stream holding `samples`.
    pub fn from_samples(samples: Vec<f64>) -> Self {
        let shape = vec![samples.len()];
        SampleStream {
            data: samples,
            shape,
            ..Self::zeros(&[])
        }
    }

    /// A stream holding `samples` laid out with `shape` (first axis varying fastest).
    ///
    /// Return
    /// ------
    /// * [`VlbiError::SizeMismatch`] if the product of `shape` differs from the sample count
    pub fn with_shape(samples: Vec<f64>, shape: &[usize]) -> Result<Self, VlbiError> {
        let expected: usize = shape.iter().product();
        if expected != samples.len() {
            return Err(VlbiError::SizeMismatch {
                expected: shape.to_vec(),
                found: vec![samples.len()],
            });
        }
        Ok(SampleStream {
            data: samples,
            shape: shape.to_vec(),
            ..Self::zeros(&[])
        })
    }

    /// Copy of the metadata of `self` with new samples and shape.
    pub fn derive(&self, samples: Vec<f64>, shape: &[usize]) -> Result<Self, VlbiError> {
        let mut stream = Self::with_shape(samples, shape)?;
        stream.copy_metadata(self);
        Ok(stream)
    }

    fn copy_metadata(&mut self, other: &SampleStream) {
        self.start = other.start;
        self.sample_rate = other.sample_rate;
        self.wavelength = other.wavelength;
        self.target = other.target;
        self.location = other.location;
    }

    pub fn with_start(mut self, start: Epoch) -> Self {
        self.start = start;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: Hertz) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_wavelength(mut self, wavelength: Meter) -> Self {
        self.wavelength = wavelength;
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn start(&self) -> Epoch {
        self.start
    }

    pub fn set_start(&mut self, start: Epoch) {
        self.start = start;
    }

    pub fn start_seconds(&self) -> J2000Seconds {
        j2000_seconds(&self.start)
    }

    /// Time covered by the samples, `len / sample_rate` seconds after the start.
    pub fn end_seconds(&self) -> J2000Seconds {
        self.start_seconds() + self.duration()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    pub fn sample_rate(&self) -> Hertz {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: Hertz) {
        self.sample_rate = sample_rate;
    }

    pub fn wavelength(&self) -> Meter {
        self.wavelength
    }

    pub fn set_wavelength(&mut self, wavelength: Meter) {
        self.wavelength = wavelength;
    }

    /// Set the wavelength from an observing frequency.
    pub fn set_frequency(&mut self, frequency: Hertz) {
        self.wavelength = SPEED_OF_LIGHT / frequency;
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Index of the sample recorded at `seconds` since J2000, `None` outside the recording.
    pub fn index_at(&self, seconds: J2000Seconds) -> Option<usize> {
        let offset = ((seconds - self.start_seconds()) * self.sample_rate).floor();
        if offset.is_finite() && offset >= 0.0 && (offset as usize) < self.len() {
            Some(offset as usize)
        } else {
            None
        }
    }

    /// Sample recorded at `seconds` since J2000, `None` outside the recording.
    pub fn sample_at(&self, seconds: J2000Seconds) -> Option<f64> {
        self.index_at(seconds).map(|idx| self.data[idx])
    }
}

#[cfg(test)]
mod stream_test {
    use super::*;
    use crate::time::epoch_from_j2000_seconds;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shape_is_checked() {
        let stream = SampleStream::with_shape(vec![0.0; 6], &[3, 2]).unwrap();
        assert_eq!(stream.shape(), &[3, 2]);
        assert_eq!(stream.len(), 6);

        assert_eq!(
            SampleStream::with_shape(vec![0.0; 5], &[3, 2]),
            Err(VlbiError::SizeMismatch {
                expected: vec![3, 2],
                found: vec![5]
            })
        );
    }

    #[test]
    fn test_sample_lookup() {
        let stream = SampleStream::from_samples((0..10).map(f64::from).collect())
            .with_start(epoch_from_j2000_seconds(100.0))
            .with_sample_rate(2.0);

        assert_abs_diff_eq!(stream.start_seconds(), 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(stream.end_seconds(), 105.0, epsilon = 1e-6);
        assert_eq!(stream.sample_at(100.0), Some(0.0));
        assert_eq!(stream.sample_at(101.6), Some(3.0));
        assert_eq!(stream.sample_at(99.0), None);
        assert_eq!(stream.sample_at(105.5), None);
    }

    #[test]
    fn test_derive_keeps_metadata() {
        let base = SampleStream::from_samples(vec![1.0, 2.0])
            .with_sample_rate(8.0)
            .with_target(Target::new(1.0, 2.0, 0.0));
        let derived = base.derive(vec![0.0; 4], &[2, 2]).unwrap();
        assert_eq!(derived.sample_rate(), 8.0);
        assert_eq!(derived.target(), base.target());
        assert_eq!(derived.shape(), &[2, 2]);
    }

    #[test]
    fn test_location() {
        assert!(Location::geographic(91.0, 0.0, 0.0).is_err());
        assert!(Location::geographic(f64::NAN, 0.0, 0.0).is_err());
        assert!(Location::relative(0.0, f64::INFINITY, 0.0).is_err());

        let station = Location::geographic(0.0, 0.0, 0.0).unwrap();
        let offset = Location::relative(10.0, 0.0, 0.0).unwrap();
        let p = offset.to_cartesian(&station);
        assert_abs_diff_eq!(p.x, crate::constants::EARTH_MAJOR_AXIS + 10.0, epsilon = 1e-6);
        assert_eq!(offset.lat_lon(&station), (0.0, 0.0));
        assert!(offset.is_relative());
    }
}
