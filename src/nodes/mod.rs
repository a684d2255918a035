//! # Stations and their recordings
//!
//! A [`Node`] is one observing station: a unique name, a creation index, the
//! [`SampleStream`] it recorded and a magnitude/phase side-buffer pair filled on demand by
//! [`Node::compute_spectrum`]. Nodes live in a [`NodeCollection`], which also carries the
//! shared station reference location, the coordinate [`Frame`] and the correlation order.
//!
//! ## Frames
//!
//! ```text
//! Frame::Geographic : position = Earth-fixed XYZ of the node location
//! Frame::Relative   : position = Earth-fixed XYZ of the node location − XYZ of the station
//! ```
//!
//! Baseline vectors are frame independent. The frame decides which point serves as delay
//! reference during synthesis: the station reference in the relative frame, the first node of
//! the collection otherwise.
//!
//! ## See also
//! ------------
//! * [`crate::baselines`] – Correlation groups built from the node set.
//! * [`crate::dsp::filters`] – Filters behind [`Node::filtered`].

pub mod node_collection;

pub use node_collection::{NodeCollection, NodeView};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::collection::Named;
use crate::constants::{Degree, Hertz};
use crate::dsp::{filters, fourier};
use crate::stream::{Location, SampleStream};

/// Coordinate frame in which node positions are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Frame {
    #[default]
    Geographic,
    Relative,
}

/// Frequency-domain filter producing a new node from an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeFilter {
    LowPass(Hertz),
    HighPass(Hertz),
    BandPass(Hertz, Hertz),
    BandReject(Hertz, Hertz),
}

/// Summary of a node, as listed to front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub index: usize,
    pub relative: bool,
    pub location: Location,
    pub samples: usize,
    pub sample_rate: Hertz,
    pub start: f64,
}

/// Name given to the `index`-th node created in a collection when the caller supplies none:
/// a letter followed by a digit (`A0`, `B0`, …, `Y0`, `A1`, …).
pub fn default_node_name(index: usize) -> String {
    const LETTERS: usize = (b'Z' - b'A') as usize;
    let letter = (b'A' + (index % LETTERS) as u8) as char;
    let digit = (index / LETTERS) % 10;
    format!("{letter}{digit}")
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    index: usize,
    stream: SampleStream,
    magnitude: Vec<f64>,
    phase: Vec<f64>,
}

impl Named for Node {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Node {
    pub fn new(name: impl Into<String>, index: usize, stream: SampleStream) -> Self {
        Node {
            name: name.into(),
            index,
            stream,
            magnitude: Vec::new(),
            phase: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation index inside the owning collection.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stream(&self) -> &SampleStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut SampleStream {
        &mut self.stream
    }

    pub fn location(&self) -> Location {
        self.stream.location()
    }

    pub fn is_relative(&self) -> bool {
        self.stream.location().is_relative()
    }

    /// Position of the node in `frame`.
    ///
    /// Arguments
    /// ---------
    /// * `frame`: coordinate frame of the result
    /// * `station`: shared station reference location (geographic)
    ///
    /// Return
    /// ------
    /// * Earth-fixed position in **meters**, offset from the station in the relative frame
    pub fn position(&self, frame: Frame, station: &Location) -> Vector3<f64> {
        let absolute = self.location().to_cartesian(station);
        match frame {
            Frame::Geographic => absolute,
            Frame::Relative => absolute - station.to_cartesian(station),
        }
    }

    /// Latitude and longitude used to point this node.
    pub fn lat_lon(&self, station: &Location) -> (Degree, Degree) {
        self.location().lat_lon(station)
    }

    /// Fill the magnitude and phase side buffers with the spectrum of the recording.
    pub fn compute_spectrum(&mut self) {
        let (magnitude, phase) =
            fourier::dft_magnitude_phase(self.stream.data(), self.stream.shape());
        self.magnitude = magnitude;
        self.phase = phase;
    }

    /// Magnitude side buffer, empty until [`Node::compute_spectrum`] ran.
    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    /// Phase side buffer, empty until [`Node::compute_spectrum`] ran.
    pub fn phase(&self) -> &[f64] {
        &self.phase
    }

    /// Deep copy under a new name and creation index.
    pub fn copy_as(&self, name: impl Into<String>, index: usize) -> Node {
        Node {
            name: name.into(),
            index,
            ..self.clone()
        }
    }

    /// New node holding the filtered recording.
    ///
    /// Filter frequencies are interpreted against the node sample rate. The side buffers of
    /// the new node are empty.
    pub fn filtered(&self, name: impl Into<String>, index: usize, filter: NodeFilter) -> Node {
        let data = self.stream.data();
        let sr = self.stream.sample_rate();
        let samples = match filter {
            NodeFilter::LowPass(cutoff) => filters::low_pass(data, sr, cutoff),
            NodeFilter::HighPass(cutoff) => filters::high_pass(data, sr, cutoff),
            NodeFilter::BandPass(lo, hi) => filters::band_pass(data, sr, lo, hi),
            NodeFilter::BandReject(lo, hi) => filters::band_reject(data, sr, lo, hi),
        };

        let mut stream = self.stream.clone();
        stream.data_mut().copy_from_slice(&samples);
        Node::new(name, index, stream)
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            name: self.name.clone(),
            index: self.index,
            relative: self.is_relative(),
            location: self.location(),
            samples: self.stream.len(),
            sample_rate: self.stream.sample_rate(),
            start: self.stream.start_seconds(),
        }
    }
}

#[cfg(test)]
mod nodes_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_names() {
        assert_eq!(default_node_name(0), "A0");
        assert_eq!(default_node_name(1), "B0");
        assert_eq!(default_node_name(24), "Y0");
        assert_eq!(default_node_name(25), "A1");
        assert_eq!(default_node_name(251), "B0");
    }

    #[test]
    fn test_position_frames() {
        let station = Location::geographic(0.0, 0.0, 0.0).unwrap();
        let stream = SampleStream::from_samples(vec![0.0; 4])
            .with_location(Location::geographic(0.0, 0.0, 100.0).unwrap());
        let node = Node::new("n", 0, stream);

        let abs = node.position(Frame::Geographic, &station);
        let rel = node.position(Frame::Relative, &station);
        assert_abs_diff_eq!(abs.x - rel.x, crate::constants::EARTH_MAJOR_AXIS, epsilon = 1e-6);
        assert_abs_diff_eq!(rel.x, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spectrum_and_copy() {
        let stream = SampleStream::from_samples(vec![1.0, 0.0, -1.0, 0.0]);
        let mut node = Node::new("n", 0, stream);
        assert!(node.magnitude().is_empty());

        node.compute_spectrum();
        assert_eq!(node.magnitude().len(), 4);
        assert_abs_diff_eq!(node.magnitude()[1], 2.0, epsilon = 1e-12);

        let copy = node.copy_as("m", 3);
        assert_eq!(copy.name(), "m");
        assert_eq!(copy.index(), 3);
        assert_eq!(copy.stream(), node.stream());
    }

    #[test]
    fn test_filtered_node() {
        let samples: Vec<f64> = (0..32)
            .map(|i| 1.0 + (std::f64::consts::PI * i as f64 / 2.0).sin())
            .collect();
        let node = Node::new("n", 0, SampleStream::from_samples(samples).with_sample_rate(32.0));

        let dc = node.filtered("dc", 1, NodeFilter::LowPass(1.0));
        for s in dc.stream().data() {
            assert_abs_diff_eq!(*s, 1.0, epsilon = 1e-9);
        }
        assert_eq!(dc.stream().sample_rate(), 32.0);
    }
}
