//! # Baselines (correlation groups)
//!
//! A [`Baseline`] is a group of `k` stations (`k = 2` for classical interferometry) whose
//! samples are correlated together. It owns no samples: members are slots in the
//! [`NamedCollection`](crate::collection::NamedCollection) of nodes and every operation
//! borrows a [`NodeView`] of that collection.
//!
//! ## Geometry per time step
//!
//! ```text
//! member positions ──► baseline vector (Σ pᵢ − p₀)
//!                          │
//!        fixed pointing:   ├─► Greenwich hour angle ─► parametric_projection (÷ sin alt)
//!       moving pointing:   └─► ENU at first member ──► horizontal_projection (÷ sin alt)
//!                                              │
//!                                              ▼
//!                                     uv_coordinates (u, v, delay)
//! ```
//!
//! ## Correlation
//!
//! - **Unlocked**: each member is sampled at its own delay-corrected time and the samples are
//!   folded left to right with the [`CorrelationDelegate`] (product by default). A member
//!   without a sample at its offset makes the whole correlation 0.
//! - **Locked**: the correlated stream was supplied externally; it is indexed at the step time.
//!
//! ## See also
//! ------------
//! * [`BaselineCollection`] – Builds one baseline per k-combination and fans settings out.
//! * [`crate::coordinates`] – The projections used above.

pub mod baseline_collection;
pub mod combinations;

pub use baseline_collection::BaselineCollection;

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{Degree, Hertz, J2000Seconds, Meter, SPEED_OF_LIGHT};
use crate::coordinates::{
    alt_az_from_ra_dec, baseline_vector, enu_from_ecef, horizontal_projection, hour_angle,
    parametric_projection, uv_coordinates, UvCoordinate,
};
use crate::nodes::NodeView;
use crate::stream::{SampleStream, Target};
use crate::time::local_sidereal_time;
use combinations::GroupIndices;

/// Binary function folding the samples of a correlation group into one value.
pub type CorrelationDelegate = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Plain product of the samples.
pub fn product_delegate() -> CorrelationDelegate {
    Arc::new(|a, b| a * b)
}

/// Always 1: the resulting image shows which UV cells were visited.
pub fn coverage_delegate() -> CorrelationDelegate {
    Arc::new(|_, _| 1.0)
}

/// Summary of a baseline, as listed to front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineInfo {
    pub name: String,
    pub nodes: Vec<String>,
    pub locked: bool,
    pub sample_rate: Hertz,
    pub wavelength: Meter,
    pub uv: UvCoordinate,
}

pub struct Baseline {
    name: String,
    members: GroupIndices,
    locked: Option<SampleStream>,
    target: Target,
    wavelength: Meter,
    sample_rate: Hertz,
    delegate: CorrelationDelegate,
    vector: Vector3<f64>,
    uv: UvCoordinate,
    /// (alt, az) of every member at the last `set_time`, empty for a fixed pointing
    pointing: SmallVec<[(Degree, Degree); 4]>,
}

impl fmt::Debug for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Baseline")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("locked", &self.locked.is_some())
            .field("target", &self.target)
            .field("wavelength", &self.wavelength)
            .field("sample_rate", &self.sample_rate)
            .field("uv", &self.uv)
            .finish()
    }
}

impl crate::collection::Named for Baseline {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Baseline {
    /// Group the nodes stored in `members` slots of `view`.
    ///
    /// Return
    /// ------
    /// * `None` if a slot does not hold a node. The name joins the member names with `_`
    ///   in slot order.
    pub fn new(members: GroupIndices, view: &NodeView<'_>) -> Option<Baseline> {
        let names: Vec<&str> = members
            .iter()
            .map(|&slot| view.node(slot).map(|node| node.name()))
            .collect::<Option<_>>()?;

        Some(Baseline {
            name: names.iter().join("_"),
            members,
            locked: None,
            target: Target::default(),
            wavelength: 1.0,
            sample_rate: 1.0,
            delegate: product_delegate(),
            vector: Vector3::zeros(),
            uv: UvCoordinate::default(),
            pointing: SmallVec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node slots of the group members.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    pub fn locked_stream(&self) -> Option<&SampleStream> {
        self.locked.as_ref()
    }

    /// Replace correlation of the members by an externally supplied correlated stream.
    pub fn lock(&mut self, stream: SampleStream) {
        self.locked = Some(stream);
    }

    pub fn unlock(&mut self) -> Option<SampleStream> {
        self.locked.take()
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn wavelength(&self) -> Meter {
        self.wavelength
    }

    pub fn set_wavelength(&mut self, wavelength: Meter) {
        self.wavelength = wavelength;
    }

    pub fn sample_rate(&self) -> Hertz {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: Hertz) {
        self.sample_rate = sample_rate;
    }

    pub fn set_delegate(&mut self, delegate: CorrelationDelegate) {
        self.delegate = delegate;
    }

    /// Baseline vector computed by the last [`Baseline::baseline_vector`] call.
    pub fn vector(&self) -> Vector3<f64> {
        self.vector
    }

    /// UV coordinate computed by the last [`Baseline::projection`] call.
    pub fn uv(&self) -> UvCoordinate {
        self.uv
    }

    pub fn positions(&self, view: &NodeView<'_>) -> SmallVec<[Vector3<f64>; 4]> {
        self.members
            .iter()
            .filter_map(|&slot| view.position(slot))
            .collect()
    }

    /// Recompute and cache the reduced baseline vector of the members.
    pub fn baseline_vector(&mut self, view: &NodeView<'_>) -> Vector3<f64> {
        self.vector = baseline_vector(&self.positions(view));
        self.vector
    }

    /// Time span, in seconds since J2000, covered by every member.
    ///
    /// A locked baseline covers the span of its correlated stream.
    ///
    /// Return
    /// ------
    /// * `None` if the recordings do not overlap
    pub fn time_window(&self, view: &NodeView<'_>) -> Option<(J2000Seconds, J2000Seconds)> {
        let (start, end) = match &self.locked {
            Some(stream) => (stream.start_seconds(), stream.end_seconds()),
            None => self
                .members
                .iter()
                .map(|&slot| view.node(slot).map(|node| node.stream()))
                .try_fold((f64::NEG_INFINITY, f64::INFINITY), |(start, end), stream| {
                    stream.map(|s| (start.max(s.start_seconds()), end.min(s.end_seconds())))
                })?,
        };
        (start.is_finite() && end.is_finite() && start < end).then_some((start, end))
    }

    /// Point every member at the target for time `t`.
    ///
    /// After this call [`Baseline::projection`] uses the horizontal geometry of the first
    /// member instead of the fixed equatorial one.
    pub fn set_time(&mut self, t: J2000Seconds, view: &NodeView<'_>) {
        let target = self.target;
        self.pointing = self
            .members
            .iter()
            .filter_map(|&slot| view.node(slot))
            .map(|node| {
                let (lat, lon) = node.lat_lon(view.station);
                alt_az_from_ra_dec(t, target.ra, target.dec, lat, lon)
            })
            .collect();
    }

    /// Return to the fixed equatorial pointing.
    pub fn clear_pointing(&mut self) {
        self.pointing.clear();
    }

    /// (alt, az) of each member at the last [`Baseline::set_time`].
    pub fn pointing(&self) -> &[(Degree, Degree)] {
        &self.pointing
    }

    /// Project an arbitrary Earth-fixed vector with the current pointing at time `t`.
    fn project(&self, vector: &Vector3<f64>, t: J2000Seconds, view: &NodeView<'_>) -> Vector3<f64> {
        let reference = self.members.first().and_then(|&slot| view.node(slot));
        match (self.pointing.first(), reference) {
            (Some(&(alt, az)), Some(node)) => {
                let (lat, lon) = node.lat_lon(view.station);
                horizontal_projection(&enu_from_ecef(vector, lat, lon), alt, az)
            }
            _ => {
                let Target { ra, dec, .. } = self.target;
                let alt = reference.map_or(90.0, |node| {
                    let (lat, lon) = node.lat_lon(view.station);
                    alt_az_from_ra_dec(t, ra, dec, lat, lon).0
                });
                let ha = hour_angle(local_sidereal_time(t, 0.0), ra);
                parametric_projection(vector, ha, dec, alt)
            }
        }
    }

    /// UV coordinate and geometric delay of the group at time `t`.
    pub fn projection(&mut self, t: J2000Seconds, view: &NodeView<'_>) -> UvCoordinate {
        let vector = self.baseline_vector(view);
        let projected = self.project(&vector, t, view);
        self.uv = uv_coordinates(&projected, self.wavelength);
        self.uv
    }

    /// Time at which each member recorded the wavefront reaching the delay reference at `t`.
    ///
    /// With `synced` the recordings are assumed aligned and every offset is `t`.
    pub fn delay_offsets(
        &self,
        t: J2000Seconds,
        view: &NodeView<'_>,
        synced: bool,
    ) -> SmallVec<[J2000Seconds; 4]> {
        if synced {
            return self.members.iter().map(|_| t).collect();
        }
        let reference = view.delay_reference();
        self.members
            .iter()
            .map(|&slot| match view.position(slot) {
                Some(position) => {
                    let w = self.project(&(position - reference), t, view).z;
                    t - w / SPEED_OF_LIGHT
                }
                None => t,
            })
            .collect()
    }

    /// Correlated value of the group.
    ///
    /// Arguments
    /// ---------
    /// * `t`: step time, used to index a locked stream
    /// * `offsets`: per-member sampling times, see [`Baseline::delay_offsets`]
    /// * `view`: the node set the members refer to
    ///
    /// Return
    /// ------
    /// * the delegate fold of the member samples, or 0 when a sample is missing
    pub fn correlate(&self, t: J2000Seconds, offsets: &[J2000Seconds], view: &NodeView<'_>) -> f64 {
        if let Some(stream) = &self.locked {
            return stream.sample_at(t).unwrap_or(0.0);
        }

        let mut samples = self
            .members
            .iter()
            .zip(offsets)
            .map(|(&slot, &offset)| view.node(slot).and_then(|node| node.stream().sample_at(offset)));

        let first = match samples.next() {
            Some(Some(sample)) => sample,
            _ => return 0.0,
        };
        samples
            .try_fold(first, |acc, sample| sample.map(|s| (self.delegate)(acc, s)))
            .unwrap_or(0.0)
    }

    pub fn info(&self, view: &NodeView<'_>) -> BaselineInfo {
        BaselineInfo {
            name: self.name.clone(),
            nodes: self
                .members
                .iter()
                .filter_map(|&slot| view.node(slot))
                .map(|node| node.name().to_string())
                .collect(),
            locked: self.is_locked(),
            sample_rate: self.sample_rate,
            wavelength: self.wavelength,
            uv: self.uv,
        }
    }
}
