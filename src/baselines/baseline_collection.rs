use tracing::debug;

use crate::baselines::combinations::Combinations;
use crate::baselines::{product_delegate, Baseline, BaselineInfo, CorrelationDelegate};
use crate::collection::NamedCollection;
use crate::constants::{Hertz, Meter, DEFAULT_UV_SIZE, SPEED_OF_LIGHT};
use crate::nodes::NodeView;
use crate::stream::{SampleStream, Target};
use crate::vlbi_errors::VlbiError;

/// Every correlation group of a node set, plus the shared UV-plane image.
///
/// Settings applied through the collection (target, wavelength, sample rate, correlation
/// delegate) are fanned out to every baseline and re-applied to the baselines created by the
/// next [`BaselineCollection::update`].
pub struct BaselineCollection {
    baselines: NamedCollection<Baseline>,
    order: usize,
    width: usize,
    height: usize,
    image: Vec<f64>,
    target: Target,
    wavelength: Meter,
    sample_rate: Hertz,
    delegate: CorrelationDelegate,
}

impl BaselineCollection {
    pub fn new() -> Self {
        BaselineCollection {
            baselines: NamedCollection::new(),
            order: 0,
            width: DEFAULT_UV_SIZE,
            height: DEFAULT_UV_SIZE,
            image: vec![0.0; DEFAULT_UV_SIZE * DEFAULT_UV_SIZE],
            target: Target::default(),
            wavelength: 1.0,
            sample_rate: 1.0,
            delegate: product_delegate(),
        }
    }

    /// A collection holding every `order`-combination of the nodes of `view`.
    pub fn build(view: &NodeView<'_>, order: usize) -> Self {
        let mut collection = Self::new();
        collection.update(view, order);
        collection
    }

    /// Rebuild the baselines from the current node set.
    ///
    /// Every `order`-combination of the live nodes becomes one unlocked baseline named after
    /// its members in collection order. A combination whose name is already present is
    /// skipped, so symmetric orderings of the same stations collapse to one entry.
    pub fn update(&mut self, view: &NodeView<'_>, order: usize) {
        self.baselines.clear();
        self.order = order;

        let slots: Vec<usize> = view.nodes.iter_slots().map(|(slot, _)| slot).collect();
        for combination in Combinations::new(slots.len(), order) {
            let members = combination.iter().map(|&i| slots[i]).collect();
            let Some(mut baseline) = Baseline::new(members, view) else {
                continue;
            };
            if self.baselines.contains(baseline.name()) {
                continue;
            }
            baseline.set_target(self.target);
            baseline.set_wavelength(self.wavelength);
            baseline.set_sample_rate(self.sample_rate);
            baseline.set_delegate(self.delegate.clone());
            // names were checked just above
            let _ = self.baselines.add(baseline);
        }

        debug!(
            nodes = slots.len(),
            order,
            baselines = self.baselines.len(),
            "baselines rebuilt"
        );
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Baseline> {
        self.baselines.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Baseline> {
        self.baselines.get_mut(name)
    }

    pub fn at(&self, position: usize) -> Option<&Baseline> {
        self.baselines.at(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Baseline> {
        self.baselines.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Baseline> {
        self.baselines.iter_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.baselines.names().map(str::to_string).collect()
    }

    pub fn infos(&self, view: &NodeView<'_>) -> Vec<BaselineInfo> {
        self.baselines.iter().map(|b| b.info(view)).collect()
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
        self.baselines.iter_mut().for_each(|b| b.set_target(target));
    }

    pub fn wavelength(&self) -> Meter {
        self.wavelength
    }

    pub fn set_wavelength(&mut self, wavelength: Meter) {
        self.wavelength = wavelength;
        self.baselines
            .iter_mut()
            .for_each(|b| b.set_wavelength(wavelength));
    }

    /// Set the observing frequency, stored as the corresponding wavelength.
    pub fn set_frequency(&mut self, frequency: Hertz) {
        self.set_wavelength(SPEED_OF_LIGHT / frequency);
    }

    pub fn sample_rate(&self) -> Hertz {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: Hertz) {
        self.sample_rate = sample_rate;
        self.baselines
            .iter_mut()
            .for_each(|b| b.set_sample_rate(sample_rate));
    }

    pub fn set_delegate(&mut self, delegate: CorrelationDelegate) {
        self.baselines
            .iter_mut()
            .for_each(|b| b.set_delegate(delegate.clone()));
        self.delegate = delegate;
    }

    /// Lock a baseline to an externally supplied correlated stream.
    pub fn lock(&mut self, name: &str, stream: SampleStream) -> Result<(), VlbiError> {
        self.baselines
            .get_mut(name)
            .ok_or_else(|| VlbiError::BaselineNotFound(name.to_string()))?
            .lock(stream);
        Ok(())
    }

    /// Return a baseline to correlating its nodes. Unknown or unlocked baselines are a no-op.
    pub fn unlock(&mut self, name: &str) -> Option<SampleStream> {
        self.baselines.get_mut(name).and_then(Baseline::unlock)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resize the image horizontally. The image is zeroed.
    pub fn set_width(&mut self, width: usize) {
        self.width = width;
        self.reset_image();
    }

    /// Resize the image vertically. The image is zeroed.
    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.reset_image();
    }

    pub fn reset_image(&mut self) {
        self.image = vec![0.0; self.width * self.height];
    }

    /// Row-major `width × height` UV-plane image, index `u + v·width`.
    pub fn image(&self) -> &[f64] {
        &self.image
    }

    /// Replace the image with the result of a synthesis run.
    ///
    /// Return
    /// ------
    /// * [`VlbiError::SizeMismatch`] if `image` is not `width × height`
    pub fn set_image(&mut self, image: Vec<f64>) -> Result<(), VlbiError> {
        if image.len() != self.width * self.height {
            return Err(VlbiError::SizeMismatch {
                expected: vec![self.width, self.height],
                found: vec![image.len()],
            });
        }
        self.image = image;
        Ok(())
    }

    /// The image as a two-dimensional stream carrying the collection settings.
    pub fn image_stream(&self) -> Result<SampleStream, VlbiError> {
        Ok(
            SampleStream::with_shape(self.image.clone(), &[self.width, self.height])?
                .with_target(self.target)
                .with_wavelength(self.wavelength)
                .with_sample_rate(self.sample_rate),
        )
    }
}

impl Default for BaselineCollection {
    fn default() -> Self {
        Self::new()
    }
}
