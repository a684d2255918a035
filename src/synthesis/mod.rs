//! # Aperture synthesis
//!
//! [`SynthesisEngine::plot`] integrates every baseline of a [`NodeCollection`] over its
//! observation window and accumulates the correlated values into a UV-plane image.
//!
//! ## Workers
//!
//! One scoped worker thread per baseline, fork-join. A [`WorkerSlots`] semaphore sized by
//! [`EngineConfig::max_workers`] bounds how many run at once: the next worker is only spawned
//! once a slot is free. Workers share:
//!
//! - a read-only [`NodeView`] of the node set (delay lookups and sampling, no lock),
//! - one `Mutex<UvAccumulator>` holding the image and the active-worker count.
//!
//! ## Per worker
//!
//! ```text
//! window = ∩ member coverage, step = 1 / sample_rate, jump = 1
//! for t in window, `jump` steps apart:
//!     interrupted?                       → stop
//!     moving baseline?                   → re-point every member for t
//!     (u, v, delay) = projection(t)      → pixel (⌊u⌋ + w/2, ⌊v⌋ + h/2)
//!     jumped and pixel ≠ last written    → back to the step after the jump origin, jump = 1
//!     pixel in image and ≠ last written  → correlate at the delay offsets, accumulate
//!                                          jump = length of the previous cell − 1
//! ```
//!
//! With the adaptive stride the worker jumps to where the new cell presumably ends and walks
//! back one step at a time whenever the cell changed within the jump, so every cell crossed
//! by the track at a sample time is still written once.
//!
//! ## Accumulation
//!
//! In [`AccumulationMode::Interleaved`] each value is folded as
//! `cell ← (cell·stack + value) / (stack + 1)` with `stack` the active-worker count, under the
//! shared lock, so the result depends on scheduling. [`AccumulationMode::Deterministic`] fills
//! one private image per baseline and averages them in baseline order after the join.
//!
//! ## Cancellation
//!
//! The optional interrupt flag of [`PlotParams`] is polled once per step. Interrupted workers
//! return early and are joined as usual; the image is then incomplete but consistent.

pub mod accumulator;
pub mod params;
pub mod worker_pool;

pub use params::{AccumulationMode, EngineConfig, PlotParams, PlotParamsBuilder};

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::baselines::{Baseline, BaselineCollection};
use crate::nodes::{NodeCollection, NodeView};
use crate::stream::SampleStream;
use crate::vlbi_errors::VlbiError;
use accumulator::{pixel_index, reduce_partials, PartialImage, UvAccumulator};
use worker_pool::WorkerSlots;

/// Summary of a synthesis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotOutcome {
    pub baselines: usize,
    /// Time steps evaluated, summed over the baselines.
    pub steps: usize,
    /// Values accumulated into the image, summed over the baselines.
    pub pixels_written: usize,
    pub interrupted: bool,
}

#[derive(Debug, Default)]
struct WorkerReport {
    steps: usize,
    pixels_written: usize,
    interrupted: bool,
    partial: Option<PartialImage>,
}

fn lock(shared: &Mutex<UvAccumulator>) -> MutexGuard<'_, UvAccumulator> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply the run parameters to every baseline and size the shared image.
fn configure(baselines: &mut BaselineCollection, params: &PlotParams) {
    baselines.set_width(params.width);
    baselines.set_height(params.height);
    baselines.set_target(params.target);
    baselines.set_frequency(params.frequency);
    baselines.set_sample_rate(params.sample_rate);
    baselines.set_delegate(params.delegate.clone());
    baselines.iter_mut().for_each(Baseline::clear_pointing);
}

fn run_worker(
    baseline: &mut Baseline,
    view: &NodeView<'_>,
    params: &PlotParams,
    shared: &Mutex<UvAccumulator>,
) -> WorkerReport {
    lock(shared).begin_worker();
    let report = integrate(baseline, view, params, shared);
    lock(shared).end_worker();
    report
}

fn integrate(
    baseline: &mut Baseline,
    view: &NodeView<'_>,
    params: &PlotParams,
    shared: &Mutex<UvAccumulator>,
) -> WorkerReport {
    let (width, height) = (params.width, params.height);
    let mut report = WorkerReport {
        partial: (params.accumulation == AccumulationMode::Deterministic)
            .then(|| PartialImage::new(width * height)),
        ..Default::default()
    };

    let Some((start, end)) = baseline.time_window(view) else {
        debug!(baseline = baseline.name(), "no overlapping coverage");
        return report;
    };
    let step = 1.0 / params.sample_rate;
    // tolerance keeps an exact multiple of the step from adding a step
    let total = ((end - start) * params.sample_rate - 1e-9).ceil().max(0.0) as usize;

    let mut k = 0;
    // distance of the jump that reached step k
    let mut jump = 1;
    let mut last_write: Option<usize> = None;
    let mut last_pixel = None;

    while k < total {
        if params.is_interrupted() {
            report.interrupted = true;
            debug!(baseline = baseline.name(), step = k, "worker interrupted");
            break;
        }

        let t = start + k as f64 * step;
        if params.moving_baseline {
            baseline.set_time(t, view);
        }
        let uv = baseline.projection(t, view);
        report.steps += 1;
        let pixel = pixel_index(&uv, width, height);

        if jump > 1 && pixel != last_pixel {
            // the cell changed inside the jump: walk it again one step at a time
            k -= jump - 1;
            jump = 1;
            continue;
        }

        let mut next = 1;
        match pixel {
            Some(pixel) if last_pixel != Some(pixel) => {
                let offsets = baseline.delay_offsets(t, view, params.synced);
                let value = baseline.correlate(t, &offsets, view);
                match report.partial.as_mut() {
                    Some(partial) => partial.accumulate(pixel, value),
                    None => lock(shared).accumulate(pixel, value),
                }
                report.pixels_written += 1;
                if params.adaptive_stride {
                    // land on the last step of the new cell if it is as long as the previous one
                    if let Some(previous) = last_write {
                        next = (k - previous).saturating_sub(1).max(1);
                    }
                }
                last_write = Some(k);
                last_pixel = Some(pixel);
            }
            Some(_) => {}
            None => last_write = None,
        }

        // never jump past the last step, cells before it would be lost
        jump = next.min(total - 1 - k).max(1);
        k += jump;
    }

    report
}

/// Runs synthesis requests with a bounded number of concurrent workers.
#[derive(Debug, Clone, Default)]
pub struct SynthesisEngine {
    config: EngineConfig,
}

impl SynthesisEngine {
    pub fn new(config: EngineConfig) -> Self {
        SynthesisEngine { config }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Synthesize the UV-plane image of a node set.
    ///
    /// Arguments
    /// ---------
    /// * `nodes`: the station set; its baselines are built if needed and reconfigured with
    ///   `params`
    /// * `params`: target, frequency, sample rate, resolution and flags of the run
    ///
    /// Return
    /// ------
    /// * the `width × height` image as a stream, and a [`PlotOutcome`]
    /// * [`VlbiError::WorkerSpawn`] if a worker thread cannot be created, after the workers
    ///   already running are joined
    /// * [`VlbiError::WorkerPanicked`] if a worker panicked
    pub fn plot(
        &self,
        nodes: &mut NodeCollection,
        params: &PlotParams,
    ) -> Result<(SampleStream, PlotOutcome), VlbiError> {
        let started = Instant::now();
        let (view, baselines) = nodes.split();
        configure(baselines, params);

        let shared = Mutex::new(UvAccumulator::new(params.width, params.height));
        let slots = WorkerSlots::new(self.config.max_workers);
        let count = baselines.len();
        info!(
            baselines = count,
            max_workers = slots.ceiling(),
            width = params.width,
            height = params.height,
            moving = params.moving_baseline,
            synced = params.synced,
            "plot started"
        );

        let mut spawn_error = None;
        let results: Vec<(String, thread::Result<WorkerReport>)> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(count);
            for (i, baseline) in baselines.iter_mut().enumerate() {
                let slot = slots.acquire();
                let name = baseline.name().to_string();
                let (view, shared) = (&view, &shared);
                let spawned = thread::Builder::new()
                    .name(format!("vlbi-worker-{i}"))
                    .spawn_scoped(scope, move || {
                        let _slot = slot;
                        run_worker(baseline, view, params, shared)
                    });
                match spawned {
                    Ok(handle) => handles.push((name, handle)),
                    Err(e) => {
                        warn!(baseline = %name, error = %e, "unable to spawn worker");
                        spawn_error = Some(VlbiError::WorkerSpawn(format!("{name}: {e}")));
                        break;
                    }
                }
            }
            handles
                .into_iter()
                .map(|(name, handle)| (name, handle.join()))
                .collect()
        });

        if let Some(err) = spawn_error {
            return Err(err);
        }

        let mut outcome = PlotOutcome {
            baselines: count,
            ..Default::default()
        };
        let mut partials = Vec::new();
        for (name, result) in results {
            let report = result.map_err(|_| VlbiError::WorkerPanicked(name))?;
            outcome.steps += report.steps;
            outcome.pixels_written += report.pixels_written;
            outcome.interrupted |= report.interrupted;
            partials.extend(report.partial);
        }

        let image = match params.accumulation {
            AccumulationMode::Interleaved => shared
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .into_image(),
            AccumulationMode::Deterministic => {
                reduce_partials(&partials, params.width * params.height)
            }
        };
        baselines.set_image(image)?;
        let model = baselines.image_stream()?;

        info!(
            baselines = outcome.baselines,
            steps = outcome.steps,
            pixels = outcome.pixels_written,
            interrupted = outcome.interrupted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plot finished"
        );
        Ok((model, outcome))
    }
}

#[cfg(test)]
mod synthesis_test {
    use super::*;
    use crate::stream::{Location, Target};
    use crate::time::epoch_from_j2000_seconds;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    /// Two stations a few hundred meters apart on the equator: the track of a target at
    /// declination 30° is a straight line of constant `u` in a small image.
    fn short_pair(samples: usize) -> NodeCollection {
        let mut nodes = NodeCollection::new();
        for (name, lon) in [("west", 0.0), ("east", 0.002)] {
            let stream = SampleStream::from_samples(vec![1.0; samples])
                .with_start(epoch_from_j2000_seconds(0.0))
                .with_sample_rate(1.0)
                .with_location(Location::geographic(0.0, lon, 0.0).unwrap());
            nodes.add(name, stream).unwrap();
        }
        nodes
    }

    fn params() -> PlotParamsBuilder {
        PlotParams::builder()
            .target(Target::new(0.0, 30.0, 0.0))
            .wavelength(20.0)
            .sample_rate(1.0 / 60.0)
            .resolution(64, 64)
            .coverage()
            .synced(true)
    }

    #[test]
    fn test_plot_writes_inside_image() {
        let mut nodes = short_pair(86_400);
        let engine = SynthesisEngine::new(EngineConfig::new(2));
        let (model, outcome) = engine.plot(&mut nodes, &params().build().unwrap()).unwrap();

        assert_eq!(model.shape(), &[64, 64]);
        assert_eq!(outcome.baselines, 1);
        assert!(outcome.pixels_written > 0);
        assert!(!outcome.interrupted);
        assert!(model.data().iter().any(|&x| x > 0.0));
        assert_eq!(nodes.baselines().image(), model.data());
    }

    #[test]
    fn test_adaptive_stride_takes_fewer_steps() {
        let mut nodes = short_pair(86_400);
        let engine = SynthesisEngine::default();

        let (every_step, exhaustive) = engine
            .plot(&mut nodes, &params().adaptive_stride(false).build().unwrap())
            .unwrap();
        let (strided, adaptive) = engine.plot(&mut nodes, &params().build().unwrap()).unwrap();

        assert_eq!(exhaustive.steps, 1_440);
        assert!(adaptive.steps < exhaustive.steps);
        assert!(adaptive.pixels_written > 0);
        // skipping steps never skips a cell
        assert_eq!(adaptive.pixels_written, exhaustive.pixels_written);
        assert_eq!(strided.data(), every_step.data());
    }

    #[test]
    fn test_adaptive_stride_catches_short_cells() {
        // cells shrink toward the horizon, so the jumps keep overshooting them
        let mut nodes = short_pair(86_400);
        let engine = SynthesisEngine::default();
        let tight = || params().wavelength(12.0).sample_rate(1.0 / 20.0);

        let (every_step, exhaustive) = engine
            .plot(&mut nodes, &tight().adaptive_stride(false).build().unwrap())
            .unwrap();
        let (strided, adaptive) = engine.plot(&mut nodes, &tight().build().unwrap()).unwrap();

        assert!(exhaustive.pixels_written > 0);
        assert_eq!(adaptive.pixels_written, exhaustive.pixels_written);
        assert_eq!(strided.data(), every_step.data());
    }

    #[test]
    fn test_interrupted_plot_still_returns() {
        let mut nodes = short_pair(1_000);
        let flag = Arc::new(AtomicBool::new(true));
        let (model, outcome) = SynthesisEngine::default()
            .plot(&mut nodes, &params().interrupt(flag).build().unwrap())
            .unwrap();

        assert!(outcome.interrupted);
        assert_eq!(outcome.steps, 0);
        assert!(model.data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_deterministic_mode_is_reproducible() {
        let mut nodes = short_pair(20_000);
        nodes.add("north", {
            SampleStream::from_samples(vec![2.0; 20_000])
                .with_start(epoch_from_j2000_seconds(0.0))
                .with_location(Location::geographic(0.002, 0.001, 0.0).unwrap())
        })
        .unwrap();

        let engine = SynthesisEngine::new(EngineConfig::new(3));
        let params = PlotParams::builder()
            .target(Target::new(0.0, 30.0, 0.0))
            .wavelength(10.0)
            .sample_rate(1.0 / 60.0)
            .resolution(64, 64)
            .synced(true)
            .accumulation(AccumulationMode::Deterministic)
            .build()
            .unwrap();

        let (first, _) = engine.plot(&mut nodes, &params).unwrap();
        let (second, _) = engine.plot(&mut nodes, &params).unwrap();
        assert_eq!(first.data(), second.data());
    }
}
