//! # Model arithmetic
//!
//! A model is a named image kept by a [`crate::context::Context`]: the UV-plane output of a
//! synthesis run, a decoded file, or the result of one of the operations below. Operations
//! never modify their inputs; the result inherits the metadata of the first operand.
//!
//! Binary operations require both operands to have the same shape and fail with
//! [`VlbiError::SizeMismatch`] otherwise.

use crate::collection::Named;
use crate::dsp::{buffer, convolution, fourier};
use crate::stream::SampleStream;
use crate::vlbi_errors::VlbiError;

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    stream: SampleStream,
}

impl Named for Model {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Model {
    pub fn new(name: impl Into<String>, stream: SampleStream) -> Self {
        Model {
            name: name.into(),
            stream,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream(&self) -> &SampleStream {
        &self.stream
    }

    pub fn into_stream(self) -> SampleStream {
        self.stream
    }
}

fn check_same_shape(a: &SampleStream, b: &SampleStream) -> Result<(), VlbiError> {
    if a.shape() != b.shape() {
        return Err(VlbiError::SizeMismatch {
            expected: a.shape().to_vec(),
            found: b.shape().to_vec(),
        });
    }
    Ok(())
}

fn zip_with(
    a: &SampleStream,
    b: &SampleStream,
    f: impl Fn(f64, f64) -> f64,
) -> Result<SampleStream, VlbiError> {
    check_same_shape(a, b)?;
    let data = a.data().iter().zip(b.data()).map(|(&x, &y)| f(x, y)).collect();
    a.derive(data, a.shape())
}

/// Cell-wise mean of two models.
pub fn stack(a: &SampleStream, b: &SampleStream) -> Result<SampleStream, VlbiError> {
    zip_with(a, b, |x, y| (x + y) / 2.0)
}

/// Absolute cell-wise difference, stretched back to the range of `a`.
pub fn diff(a: &SampleStream, b: &SampleStream) -> Result<SampleStream, VlbiError> {
    let mut out = zip_with(a, b, |x, y| (x - y).abs())?;
    let (lo, hi) = (buffer::min(a.data()), buffer::max(a.data()));
    buffer::stretch(out.data_mut(), lo, hi);
    Ok(out)
}

/// Cell-wise product of two models.
pub fn mask(a: &SampleStream, b: &SampleStream) -> Result<SampleStream, VlbiError> {
    zip_with(a, b, |x, y| x * y)
}

/// Convolution of `a` by the kernel `kernel`, same size as `a`.
pub fn convolve(a: &SampleStream, kernel: &SampleStream) -> Result<SampleStream, VlbiError> {
    let data = convolution::convolve(a.data(), a.shape(), kernel.data(), kernel.shape())?;
    a.derive(data, a.shape())
}

/// Swap the halves of every axis, centering the zero frequency of a spectrum.
pub fn shift(a: &SampleStream) -> Result<SampleStream, VlbiError> {
    a.derive(buffer::shift(a.data(), a.shape()), a.shape())
}

/// Fourier transform of a model, as a (magnitude, phase) pair of models.
pub fn dft(a: &SampleStream) -> Result<(SampleStream, SampleStream), VlbiError> {
    let (magnitude, phase) = fourier::dft_magnitude_phase(a.data(), a.shape());
    Ok((a.derive(magnitude, a.shape())?, a.derive(phase, a.shape())?))
}

/// Inverse of [`dft`].
pub fn idft(magnitude: &SampleStream, phase: &SampleStream) -> Result<SampleStream, VlbiError> {
    check_same_shape(magnitude, phase)?;
    let data = fourier::idft_magnitude_phase(magnitude.data(), phase.data(), magnitude.shape());
    magnitude.derive(data, magnitude.shape())
}
