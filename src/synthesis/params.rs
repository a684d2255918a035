use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::baselines::{coverage_delegate, product_delegate, CorrelationDelegate};
use crate::constants::{Hertz, Meter, DEFAULT_UV_SIZE, SPEED_OF_LIGHT};
use crate::stream::Target;
use crate::vlbi_errors::VlbiError;

/// How concurrent workers combine their values into the UV-plane image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccumulationMode {
    /// Every worker folds its values into the shared image under one lock, as they come.
    /// Pixel values depend on the scheduler interleaving.
    ///
    /// The running mean is weighted by the number of active workers, the writer included,
    /// so it is biased toward zero: a lone worker writing 3.0 twice into an empty cell
    /// leaves 1.5 then 2.25 and never reaches 3.0.
    #[default]
    Interleaved,
    /// Every worker fills a private image; the images are averaged in baseline order after
    /// the join. Pixel values are reproducible bit for bit.
    Deterministic,
}

/// Process-level synthesis settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of synthesis workers running at once.
    pub max_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl EngineConfig {
    pub fn new(max_workers: usize) -> Self {
        EngineConfig {
            max_workers: max_workers.max(1),
        }
    }
}

/// Parameters of one synthesis run.
///
/// Build through [`PlotParams::builder`]; the builder validates the numeric fields.
#[derive(Clone)]
pub struct PlotParams {
    pub target: Target,
    /// Observing frequency in Hz, sets the wavelength of every baseline.
    pub frequency: Hertz,
    /// Time step of the integration is `1 / sample_rate` seconds.
    pub sample_rate: Hertz,
    pub width: usize,
    pub height: usize,
    /// Re-evaluate the pointing of every station at each time step.
    pub moving_baseline: bool,
    /// Recordings are already aligned: skip delay compensation.
    pub synced: bool,
    pub delegate: CorrelationDelegate,
    /// Skip steps that would repaint the cell just written.
    pub adaptive_stride: bool,
    pub accumulation: AccumulationMode,
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for PlotParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotParams")
            .field("target", &self.target)
            .field("frequency", &self.frequency)
            .field("sample_rate", &self.sample_rate)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("moving_baseline", &self.moving_baseline)
            .field("synced", &self.synced)
            .field("adaptive_stride", &self.adaptive_stride)
            .field("accumulation", &self.accumulation)
            .field("interruptible", &self.interrupt.is_some())
            .finish()
    }
}

impl Default for PlotParams {
    fn default() -> Self {
        PlotParams {
            target: Target::default(),
            frequency: SPEED_OF_LIGHT,
            sample_rate: 1.0,
            width: DEFAULT_UV_SIZE,
            height: DEFAULT_UV_SIZE,
            moving_baseline: false,
            synced: false,
            delegate: product_delegate(),
            adaptive_stride: true,
            accumulation: AccumulationMode::Interleaved,
            interrupt: None,
        }
    }
}

impl PlotParams {
    pub fn builder() -> PlotParamsBuilder {
        PlotParamsBuilder::new()
    }

    pub fn wavelength(&self) -> Meter {
        SPEED_OF_LIGHT / self.frequency
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Builder for [`PlotParams`], with validation.
#[derive(Clone, Default)]
pub struct PlotParamsBuilder {
    params: PlotParams,
}

impl PlotParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: PlotParams::default(),
        }
    }

    pub fn target(mut self, target: Target) -> Self {
        self.params.target = target;
        self
    }
    pub fn frequency(mut self, v: Hertz) -> Self {
        self.params.frequency = v;
        self
    }
    /// Set the frequency from a wavelength in meters.
    pub fn wavelength(mut self, v: Meter) -> Self {
        self.params.frequency = SPEED_OF_LIGHT / v;
        self
    }
    pub fn sample_rate(mut self, v: Hertz) -> Self {
        self.params.sample_rate = v;
        self
    }
    pub fn resolution(mut self, width: usize, height: usize) -> Self {
        self.params.width = width;
        self.params.height = height;
        self
    }
    pub fn moving_baseline(mut self, v: bool) -> Self {
        self.params.moving_baseline = v;
        self
    }
    pub fn synced(mut self, v: bool) -> Self {
        self.params.synced = v;
        self
    }
    pub fn delegate(mut self, v: CorrelationDelegate) -> Self {
        self.params.delegate = v;
        self
    }
    /// Use the coverage delegate: every visited cell gets value 1.
    pub fn coverage(mut self) -> Self {
        self.params.delegate = coverage_delegate();
        self
    }
    pub fn adaptive_stride(mut self, v: bool) -> Self {
        self.params.adaptive_stride = v;
        self
    }
    pub fn accumulation(mut self, v: AccumulationMode) -> Self {
        self.params.accumulation = v;
        self
    }
    pub fn interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.params.interrupt = Some(flag);
        self
    }

    fn gt0(x: f64) -> bool {
        x.is_finite() && x > 0.0
    }

    /// Validate and return the parameters.
    ///
    /// Return
    /// ----------
    /// * [`VlbiError::InvalidPlotParameter`] if the frequency or the sample rate is not a
    ///   finite positive number, or if the image is empty
    pub fn build(self) -> Result<PlotParams, VlbiError> {
        let p = &self.params;

        if !Self::gt0(p.frequency) {
            return Err(VlbiError::InvalidPlotParameter(
                "frequency must be > 0".into(),
            ));
        }
        if !Self::gt0(p.sample_rate) {
            return Err(VlbiError::InvalidPlotParameter(
                "sample_rate must be > 0".into(),
            ));
        }
        if p.width == 0 || p.height == 0 {
            return Err(VlbiError::InvalidPlotParameter(
                "width and height must be >= 1".into(),
            ));
        }
        if !(p.target.ra.is_finite() && p.target.dec.is_finite()) {
            return Err(VlbiError::InvalidPlotParameter(
                "target coordinates must be finite".into(),
            ));
        }

        Ok(self.params)
    }
}
