//! # Observing contexts
//!
//! A [`Context`] bundles the node set of one observation with the models derived from it.
//! Contexts live in a [`ContextRegistry`] owned by the application (see
//! [`crate::openvlbi::OpenVlbi`]); one of them may be selected as the current context.

use tracing::info;

use crate::collection::{Named, NamedCollection};
use crate::models::{self, Model};
use crate::nodes::NodeCollection;
use crate::stream::SampleStream;
use crate::synthesis::{PlotOutcome, PlotParams, SynthesisEngine};
use crate::vlbi_errors::VlbiError;

pub struct Context {
    name: String,
    nodes: NodeCollection,
    models: NamedCollection<Model>,
}

impl Named for Context {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Context {
            name: name.into(),
            nodes: NodeCollection::new(),
            models: NamedCollection::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &NodeCollection {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeCollection {
        &mut self.nodes
    }

    pub fn model(&self, name: &str) -> Option<&SampleStream> {
        self.models.get(name).map(Model::stream)
    }

    fn require_model(&self, name: &str) -> Result<&SampleStream, VlbiError> {
        self.model(name)
            .ok_or_else(|| VlbiError::ModelNotFound(name.to_string()))
    }

    /// Store `stream` as model `name`, replacing a model of the same name.
    pub fn set_model(&mut self, name: &str, stream: SampleStream) {
        if self.models.remove(name).is_some() {
            self.models.compact();
        }
        // the name was freed just above
        let _ = self.models.add(Model::new(name, stream));
    }

    pub fn remove_model(&mut self, name: &str) -> Option<SampleStream> {
        let model = self.models.remove(name)?;
        self.models.compact();
        Some(model.into_stream())
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.names().map(str::to_string).collect()
    }

    /// Run a synthesis over the nodes and store the image as model `name`.
    pub fn plot(
        &mut self,
        engine: &SynthesisEngine,
        name: &str,
        params: &PlotParams,
    ) -> Result<PlotOutcome, VlbiError> {
        let (image, outcome) = engine.plot(&mut self.nodes, params)?;
        self.set_model(name, image);
        Ok(outcome)
    }

    fn binary(
        &mut self,
        a: &str,
        b: &str,
        out: &str,
        op: fn(&SampleStream, &SampleStream) -> Result<SampleStream, VlbiError>,
    ) -> Result<(), VlbiError> {
        let result = op(self.require_model(a)?, self.require_model(b)?)?;
        self.set_model(out, result);
        Ok(())
    }

    /// Cell-wise mean of models `a` and `b`, stored as `out`.
    pub fn stack_models(&mut self, a: &str, b: &str, out: &str) -> Result<(), VlbiError> {
        self.binary(a, b, out, models::stack)
    }

    /// Stretched absolute difference of models `a` and `b`, stored as `out`.
    pub fn diff_models(&mut self, a: &str, b: &str, out: &str) -> Result<(), VlbiError> {
        self.binary(a, b, out, models::diff)
    }

    /// Cell-wise product of models `a` and `b`, stored as `out`.
    pub fn mask_models(&mut self, a: &str, b: &str, out: &str) -> Result<(), VlbiError> {
        self.binary(a, b, out, models::mask)
    }

    /// Model `a` convolved by model `kernel`, stored as `out`.
    pub fn convolve_models(&mut self, a: &str, kernel: &str, out: &str) -> Result<(), VlbiError> {
        self.binary(a, kernel, out, models::convolve)
    }

    pub fn shift_model(&mut self, a: &str, out: &str) -> Result<(), VlbiError> {
        let result = models::shift(self.require_model(a)?)?;
        self.set_model(out, result);
        Ok(())
    }

    pub fn dft_model(&mut self, a: &str, magnitude: &str, phase: &str) -> Result<(), VlbiError> {
        let (mag, ph) = models::dft(self.require_model(a)?)?;
        self.set_model(magnitude, mag);
        self.set_model(phase, ph);
        Ok(())
    }

    pub fn idft_model(&mut self, magnitude: &str, phase: &str, out: &str) -> Result<(), VlbiError> {
        self.binary(magnitude, phase, out, models::idft)
    }
}

/// All contexts of the application, plus the current selection.
#[derive(Default)]
pub struct ContextRegistry {
    contexts: NamedCollection<Context>,
    current: Option<String>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context.
    pub fn create(&mut self, name: &str) -> Result<&mut Context, VlbiError> {
        self.create_with(name, |_| Ok(()))
    }

    /// Create a context and run `init` on it before registering it.
    ///
    /// If `init` fails the context is dropped and the registry is left unchanged.
    pub fn create_with(
        &mut self,
        name: &str,
        init: impl FnOnce(&mut Context) -> Result<(), VlbiError>,
    ) -> Result<&mut Context, VlbiError> {
        if self.contexts.contains(name) {
            return Err(VlbiError::DuplicateName(name.to_string()));
        }
        let mut context = Context::new(name);
        init(&mut context)?;
        self.contexts.add(context)?;
        info!(context = %name, "context created");
        self.contexts
            .get_mut(name)
            .ok_or_else(|| VlbiError::ContextNotFound(name.to_string()))
    }

    /// Make `name` the current context.
    pub fn select(&mut self, name: &str) -> Result<(), VlbiError> {
        if !self.contexts.contains(name) {
            return Err(VlbiError::ContextNotFound(name.to_string()));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Remove a context, releasing its nodes, baselines and models.
    ///
    /// Destroying the current context clears the selection. Unknown names are a no-op.
    pub fn destroy(&mut self, name: &str) -> Option<Context> {
        let context = self.contexts.remove(name)?;
        self.contexts.compact();
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        info!(context = %name, "context destroyed");
        Some(context)
    }

    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.get_mut(name)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Context> {
        self.current.as_deref().and_then(|name| self.contexts.get(name))
    }

    pub fn current_mut(&mut self) -> Option<&mut Context> {
        let name = self.current.as_deref()?;
        self.contexts.get_mut(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.contexts.names().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
