//! # OpenVlbi: session façade
//!
//! [`OpenVlbi`] is the synchronous API exposed to protocol front ends (text, JSON, device
//! servers). It wires together:
//!
//! 1. **Context registry** ([`ContextRegistry`]) with a current selection; every node, baseline
//!    and model operation applies to the current context.
//! 2. **Session settings**: target, observing frequency, sample rate, image resolution and
//!    bits per sample of raw buffers. They are applied to nodes at ingestion and to synthesis
//!    runs at plot time.
//! 3. **Synthesis engine** ([`SynthesisEngine`]) with its worker ceiling.
//! 4. **File formats**: codecs registered by name ([`FileFormat`]); `raw` is always present.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use vlbi::openvlbi::{OpenVlbi, PlotFlags};
//! use vlbi::stream::Location;
//!
//! let mut vlbi = OpenVlbi::default();
//! vlbi.add_context("session")?;
//! vlbi.set_target(0.0, 30.0, 0.0);
//! vlbi.set_frequency(1.42e9)?;
//! vlbi.set_bits_per_sample(-64)?;
//!
//! let bytes: Vec<u8> = vec![0; 8 * 100];
//! let west = Location::geographic(45.0, 7.0, 300.0)?;
//! let east = Location::geographic(45.0, 7.1, 320.0)?;
//! vlbi.add_node_raw("west", west, &bytes, "2024/06/01 00:00:00")?;
//! vlbi.add_node_raw("east", east, &bytes, "2024/06/01 00:00:00")?;
//!
//! let outcome = vlbi.plot("uv", PlotFlags::default())?;
//! let payload = vlbi.get_model("uv", "raw")?;
//! # Ok::<(), vlbi::vlbi_errors::VlbiError>(())
//! ```
//!
//! ## Errors
//!
//! - Operations needing a current context return [`VlbiError::ContextNotFound`] when none is
//!   selected.
//! - Codec failures surface as [`VlbiError::Decode`] or [`VlbiError::UnsupportedFormat`]; the
//!   context is left untouched.
//!
//! ## See also
//! ------------
//! * [`Context`] – Nodes and models of one observation.
//! * [`PlotParams`] – Full control over a synthesis run, see [`OpenVlbi::plot_with`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::baselines::BaselineInfo;
use crate::constants::{Degree, Hertz, Hour, Meter, DEFAULT_UV_SIZE, SPEED_OF_LIGHT};
use crate::context::{Context, ContextRegistry};
use crate::conversion::{parse_dec_to_deg, parse_ra_to_hours};
use crate::file_format::{decode_samples, validate_bits_per_sample, FileFormat, RawFormat};
use crate::nodes::{NodeFilter, NodeInfo};
use crate::stream::{Location, SampleStream, Target};
use crate::synthesis::{AccumulationMode, EngineConfig, PlotOutcome, PlotParams, SynthesisEngine};
use crate::time::parse_utc_string;
use crate::vlbi_errors::VlbiError;

/// Mode flags of a plot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlotFlags {
    /// Re-evaluate station pointing at every step.
    pub moving_baseline: bool,
    /// Recordings are pre-aligned; skip delay compensation.
    pub synced: bool,
    /// Record UV coverage only (every correlation is 1).
    pub coverage: bool,
    /// Reproducible accumulation, see [`AccumulationMode::Deterministic`].
    pub deterministic: bool,
}

pub struct OpenVlbi {
    contexts: ContextRegistry,
    engine: SynthesisEngine,
    formats: HashMap<String, Box<dyn FileFormat>, RandomState>,
    target: Target,
    frequency: Hertz,
    sample_rate: Hertz,
    width: usize,
    height: usize,
    bits_per_sample: i32,
    interrupt: Arc<AtomicBool>,
}

impl Default for OpenVlbi {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl OpenVlbi {
    pub fn new(config: EngineConfig) -> Self {
        let mut vlbi = OpenVlbi {
            contexts: ContextRegistry::new(),
            engine: SynthesisEngine::new(config),
            formats: HashMap::with_hasher(RandomState::new()),
            target: Target::default(),
            frequency: SPEED_OF_LIGHT,
            sample_rate: 1.0,
            width: DEFAULT_UV_SIZE,
            height: DEFAULT_UV_SIZE,
            bits_per_sample: 8,
            interrupt: Arc::new(AtomicBool::new(false)),
        };
        vlbi.register_format(Box::new(RawFormat));
        vlbi
    }

    /// Register a codec under its [`FileFormat::name`], replacing one of the same name.
    pub fn register_format(&mut self, format: Box<dyn FileFormat>) {
        self.formats.insert(format.name().to_string(), format);
    }

    fn format(&self, name: &str) -> Result<&dyn FileFormat, VlbiError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| VlbiError::UnsupportedFormat(name.to_string()))
    }

    /// Decode `bytes` with codec `format`, logging failures.
    fn decode(&self, format: &str, bytes: &[u8]) -> Result<SampleStream, VlbiError> {
        self.format(format)?.decode_stream(bytes).inspect_err(|e| {
            warn!(format = %format, error = %e, "unable to decode payload");
        })
    }

    pub fn get_engine_config(&self) -> EngineConfig {
        self.engine.config()
    }

    /// Flag polled by running plots; set it from another thread to interrupt them.
    /// It is cleared when a plot starts.
    pub fn get_interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    // ---------------------------------------------------------------------------------------------
    // Contexts
    // ---------------------------------------------------------------------------------------------

    /// Create a context and make it current.
    pub fn add_context(&mut self, name: &str) -> Result<(), VlbiError> {
        self.contexts.create(name)?;
        self.contexts.select(name)
    }

    pub fn select_context(&mut self, name: &str) -> Result<(), VlbiError> {
        self.contexts.select(name)
    }

    /// Destroy a context. Unknown names are a no-op.
    pub fn delete_context(&mut self, name: &str) {
        self.contexts.destroy(name);
    }

    pub fn current_context_name(&self) -> Option<&str> {
        self.contexts.current_name()
    }

    pub fn list_contexts(&self) -> Vec<String> {
        self.contexts.names()
    }

    pub fn get_context(&self) -> Result<&Context, VlbiError> {
        self.contexts
            .current()
            .ok_or_else(|| VlbiError::ContextNotFound("<none selected>".into()))
    }

    pub fn get_context_mut(&mut self) -> Result<&mut Context, VlbiError> {
        self.contexts
            .current_mut()
            .ok_or_else(|| VlbiError::ContextNotFound("<none selected>".into()))
    }

    pub fn get_registry(&self) -> &ContextRegistry {
        &self.contexts
    }

    pub fn get_registry_mut(&mut self) -> &mut ContextRegistry {
        &mut self.contexts
    }

    // ---------------------------------------------------------------------------------------------
    // Session settings
    // ---------------------------------------------------------------------------------------------

    pub fn set_target(&mut self, ra: Hour, dec: Degree, distance: Meter) {
        self.target = Target::new(ra, dec, distance);
    }

    /// Set the target from sexagesimal strings (`"HH MM SS.S"`, `"±DD MM SS.S"`).
    pub fn set_target_sexagesimal(&mut self, ra: &str, dec: &str) -> Result<(), VlbiError> {
        let ra = parse_ra_to_hours(ra).ok_or_else(|| {
            VlbiError::InvalidPlotParameter(format!("invalid right ascension {ra:?}"))
        })?;
        let dec = parse_dec_to_deg(dec)
            .ok_or_else(|| VlbiError::InvalidPlotParameter(format!("invalid declination {dec:?}")))?;
        self.target = Target::new(ra, dec, self.target.distance);
        Ok(())
    }

    pub fn get_target(&self) -> Target {
        self.target
    }

    pub fn set_frequency(&mut self, frequency: Hertz) -> Result<(), VlbiError> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(VlbiError::InvalidPlotParameter(
                "frequency must be > 0".into(),
            ));
        }
        self.frequency = frequency;
        Ok(())
    }

    pub fn get_frequency(&self) -> Hertz {
        self.frequency
    }

    pub fn set_sample_rate(&mut self, sample_rate: Hertz) -> Result<(), VlbiError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(VlbiError::InvalidPlotParameter(
                "sample_rate must be > 0".into(),
            ));
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    pub fn get_sample_rate(&self) -> Hertz {
        self.sample_rate
    }

    pub fn set_resolution(&mut self, width: usize, height: usize) -> Result<(), VlbiError> {
        if width == 0 || height == 0 {
            return Err(VlbiError::InvalidPlotParameter(
                "width and height must be >= 1".into(),
            ));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn get_resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn set_bits_per_sample(&mut self, bits: i32) -> Result<(), VlbiError> {
        validate_bits_per_sample(bits)?;
        self.bits_per_sample = bits;
        Ok(())
    }

    pub fn get_bits_per_sample(&self) -> i32 {
        self.bits_per_sample
    }

    /// Set the correlation order of the current context, returning the clamped value.
    pub fn set_correlation_order(&mut self, order: usize) -> Result<usize, VlbiError> {
        Ok(self.get_context_mut()?.nodes_mut().set_correlation_order(order))
    }

    pub fn set_station_location(
        &mut self,
        lat: Degree,
        lon: Degree,
        el: Meter,
    ) -> Result<(), VlbiError> {
        let station = Location::geographic(lat, lon, el)?;
        self.get_context_mut()?
            .nodes_mut()
            .set_station_location(station)
    }

    pub fn set_relative(&mut self, relative: bool) -> Result<(), VlbiError> {
        self.get_context_mut()?.nodes_mut().set_relative(relative);
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------------------------------

    /// Add a node from a raw sample buffer.
    ///
    /// Arguments
    /// ---------
    /// * `name`: node name, empty for an automatic one
    /// * `location`: where the buffer was recorded
    /// * `bytes`: little-endian samples in the session bits-per-sample format
    /// * `start`: UTC start of the recording, `YYYY/MM/DD HH:MM:SS[.fff]`
    ///
    /// Return
    /// ------
    /// * the node name. Wavelength and target come from the session settings, the sample
    ///   rate from [`OpenVlbi::set_sample_rate`].
    pub fn add_node_raw(
        &mut self,
        name: &str,
        location: Location,
        bytes: &[u8],
        start: &str,
    ) -> Result<String, VlbiError> {
        let start = parse_utc_string(start)?;
        let samples = decode_samples(bytes, self.bits_per_sample)?;
        if samples.is_empty() {
            return Err(VlbiError::EmptyStream(name.to_string()));
        }
        let stream = SampleStream::from_samples(samples)
            .with_start(start)
            .with_sample_rate(self.sample_rate)
            .with_wavelength(SPEED_OF_LIGHT / self.frequency)
            .with_target(self.target)
            .with_location(location);
        self.get_context_mut()?.nodes_mut().add(name, stream)
    }

    /// Add a node from an encoded payload. Metadata comes from the payload.
    pub fn add_node_encoded(
        &mut self,
        name: &str,
        format: &str,
        bytes: &[u8],
    ) -> Result<String, VlbiError> {
        let stream = self.decode(format, bytes)?;
        if stream.is_empty() {
            return Err(VlbiError::EmptyStream(name.to_string()));
        }
        self.get_context_mut()?.nodes_mut().add(name, stream)
    }

    /// Add a node from a file, the codec being chosen by the file extension.
    pub fn add_node_from_path(&mut self, name: &str, path: &Utf8Path) -> Result<String, VlbiError> {
        let format = path
            .extension()
            .ok_or_else(|| VlbiError::UnsupportedFormat(path.to_string()))?
            .to_ascii_lowercase();
        let bytes = std::fs::read(path)?;
        self.add_node_encoded(name, &format, &bytes)
    }

    /// Delete a node. Unknown names are a no-op.
    pub fn delete_node(&mut self, name: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.nodes_mut().remove(name);
        Ok(())
    }

    pub fn copy_node(&mut self, source: &str, target: &str) -> Result<String, VlbiError> {
        self.get_context_mut()?.nodes_mut().copy(source, target)
    }

    pub fn filter_node(
        &mut self,
        source: &str,
        target: &str,
        filter: NodeFilter,
    ) -> Result<String, VlbiError> {
        self.get_context_mut()?
            .nodes_mut()
            .filter(source, target, filter)
    }

    pub fn list_nodes(&self) -> Result<Vec<NodeInfo>, VlbiError> {
        Ok(self.get_context()?.nodes().infos())
    }

    /// Baselines of the current context, built if needed.
    pub fn list_baselines(&mut self) -> Result<Vec<BaselineInfo>, VlbiError> {
        let (view, baselines) = self.get_context_mut()?.nodes_mut().split();
        Ok(baselines.infos(&view))
    }

    /// Lock a baseline to an encoded correlated stream.
    pub fn lock_baseline(&mut self, name: &str, format: &str, bytes: &[u8]) -> Result<(), VlbiError> {
        let stream = self.decode(format, bytes)?;
        self.get_context_mut()?
            .nodes_mut()
            .baselines()
            .lock(name, stream)
    }

    pub fn unlock_baseline(&mut self, name: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.nodes_mut().baselines().unlock(name);
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Synthesis and models
    // ---------------------------------------------------------------------------------------------

    /// Parameters of a plot with the session settings and `flags`.
    pub fn plot_params(&self, flags: PlotFlags) -> Result<PlotParams, VlbiError> {
        let builder = PlotParams::builder()
            .target(self.target)
            .frequency(self.frequency)
            .sample_rate(self.sample_rate)
            .resolution(self.width, self.height)
            .moving_baseline(flags.moving_baseline)
            .synced(flags.synced)
            .accumulation(if flags.deterministic {
                AccumulationMode::Deterministic
            } else {
                AccumulationMode::Interleaved
            })
            .interrupt(self.interrupt.clone());
        let builder = if flags.coverage {
            builder.coverage()
        } else {
            builder
        };
        builder.build()
    }

    /// Synthesize the current context into model `name`, blocking until it is stored.
    pub fn plot(&mut self, name: &str, flags: PlotFlags) -> Result<PlotOutcome, VlbiError> {
        let params = self.plot_params(flags)?;
        self.plot_with(name, &params)
    }

    pub fn plot_with(&mut self, name: &str, params: &PlotParams) -> Result<PlotOutcome, VlbiError> {
        self.interrupt.store(false, Ordering::Relaxed);
        let engine = self.engine.clone();
        self.get_context_mut()?.plot(&engine, name, params)
    }

    /// Encode model `name` with codec `format`.
    pub fn get_model(&self, name: &str, format: &str) -> Result<Vec<u8>, VlbiError> {
        let codec = self.format(format)?;
        let model = self
            .get_context()?
            .model(name)
            .ok_or_else(|| VlbiError::ModelNotFound(name.to_string()))?;
        codec.encode_model(model)
    }

    /// Decode a payload and store it as model `name`.
    pub fn add_model(&mut self, name: &str, format: &str, bytes: &[u8]) -> Result<(), VlbiError> {
        let stream = self.decode(format, bytes)?;
        self.get_context_mut()?.set_model(name, stream);
        Ok(())
    }

    /// Delete a model. Unknown names are a no-op.
    pub fn delete_model(&mut self, name: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.remove_model(name);
        Ok(())
    }

    pub fn list_models(&self) -> Result<Vec<String>, VlbiError> {
        Ok(self.get_context()?.model_names())
    }

    pub fn stack_models(&mut self, a: &str, b: &str, out: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.stack_models(a, b, out)
    }

    pub fn diff_models(&mut self, a: &str, b: &str, out: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.diff_models(a, b, out)
    }

    pub fn mask_models(&mut self, a: &str, b: &str, out: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.mask_models(a, b, out)
    }

    pub fn convolve_models(&mut self, a: &str, kernel: &str, out: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.convolve_models(a, kernel, out)
    }

    pub fn shift_model(&mut self, a: &str, out: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.shift_model(a, out)
    }

    pub fn dft_model(&mut self, a: &str, magnitude: &str, phase: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.dft_model(a, magnitude, phase)
    }

    pub fn idft_model(&mut self, magnitude: &str, phase: &str, out: &str) -> Result<(), VlbiError> {
        self.get_context_mut()?.idft_model(magnitude, phase, out)
    }
}

#[cfg(test)]
mod openvlbi_test {
    use super::*;

    fn f64_bytes(samples: &[f64]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_operations_need_a_context() {
        let mut vlbi = OpenVlbi::default();
        assert!(matches!(
            vlbi.list_nodes(),
            Err(VlbiError::ContextNotFound(_))
        ));
        vlbi.add_context("a").unwrap();
        assert_eq!(vlbi.current_context_name(), Some("a"));
        assert!(vlbi.list_nodes().unwrap().is_empty());

        vlbi.delete_context("a");
        assert!(vlbi.get_context().is_err());
    }

    #[test]
    fn test_settings_validation() {
        let mut vlbi = OpenVlbi::new(EngineConfig::new(1));
        assert!(vlbi.set_frequency(-1.0).is_err());
        assert!(vlbi.set_sample_rate(0.0).is_err());
        assert!(vlbi.set_resolution(0, 8).is_err());
        assert_eq!(
            vlbi.set_bits_per_sample(24),
            Err(VlbiError::InvalidSampleFormat(24))
        );

        vlbi.set_target_sexagesimal("06 00 00", "-30 00 00").unwrap();
        assert_eq!(vlbi.get_target(), Target::new(6.0, -30.0, 0.0));
        assert!(vlbi.set_target_sexagesimal("25 00 00", "0 0 0").is_err());
        assert_eq!(vlbi.get_engine_config().max_workers, 1);
    }

    #[test]
    fn test_raw_nodes_and_models() {
        let mut vlbi = OpenVlbi::default();
        vlbi.add_context("c").unwrap();
        vlbi.set_bits_per_sample(-64).unwrap();
        vlbi.set_sample_rate(2.0).unwrap();

        let station = Location::geographic(0.0, 0.0, 0.0).unwrap();
        let name = vlbi
            .add_node_raw("", station, &f64_bytes(&[1.0, 2.0, 3.0]), "2020/01/01 00:00:00")
            .unwrap();
        assert_eq!(name, "A0");
        let nodes = vlbi.list_nodes().unwrap();
        assert_eq!(nodes[0].samples, 3);
        assert_eq!(nodes[0].sample_rate, 2.0);

        assert!(matches!(
            vlbi.add_node_raw("bad", station, &[], "2020/01/01 00:00:00"),
            Err(VlbiError::EmptyStream(_))
        ));
        assert!(matches!(
            vlbi.add_node_raw("bad", station, &[0; 8], "not a date"),
            Err(VlbiError::InvalidDate(_))
        ));

        let model = SampleStream::with_shape(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let bytes = RawFormat.encode_model(&model).unwrap();
        vlbi.add_model("m", "raw", &bytes).unwrap();
        vlbi.shift_model("m", "s").unwrap();
        assert_eq!(vlbi.list_models().unwrap(), vec!["m", "s"]);
        assert_eq!(vlbi.get_model("m", "raw").unwrap(), bytes);
        assert_eq!(
            vlbi.get_model("m", "fits"),
            Err(VlbiError::UnsupportedFormat("fits".into()))
        );

        vlbi.delete_model("s").unwrap();
        assert_eq!(vlbi.list_models().unwrap(), vec!["m"]);
    }

    #[test]
    fn test_decode_failure_leaves_context_intact() {
        let mut vlbi = OpenVlbi::default();
        vlbi.add_context("c").unwrap();
        vlbi.set_bits_per_sample(-64).unwrap();
        let station = Location::geographic(0.0, 0.0, 0.0).unwrap();
        vlbi.add_node_raw("n", station, &f64_bytes(&[1.0]), "2020/01/01 00:00:00")
            .unwrap();

        assert!(matches!(
            vlbi.add_node_encoded("m", "raw", &[9, 9, 9]),
            Err(VlbiError::Decode { .. })
        ));
        assert!(matches!(
            vlbi.add_model("x", "raw", &[1]),
            Err(VlbiError::Decode { .. })
        ));
        assert_eq!(vlbi.list_nodes().unwrap().len(), 1);
        assert!(vlbi.list_models().unwrap().is_empty());
    }
}
