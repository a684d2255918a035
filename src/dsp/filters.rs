//! Frequency-domain filters for one-dimensional recordings.
//!
//! The recording is transformed, every bin whose frequency falls outside the pass band is
//! zeroed together with its mirrored negative-frequency bin, and the result is transformed
//! back. Frequencies are in hertz and interpreted against the stream sample rate.

use rustfft::num_complex::Complex;

use crate::constants::Hertz;
use crate::dsp::fourier::{dft, idft};

/// Frequency in hertz of FFT bin `k` of an `n`-point transform.
fn bin_frequency(k: usize, n: usize, sample_rate: Hertz) -> Hertz {
    let k = if k > n / 2 { n - k } else { k };
    k as f64 * sample_rate / n as f64
}

fn apply_mask(data: &[f64], sample_rate: Hertz, pass: impl Fn(Hertz) -> bool) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let mut spectrum = dft(data, &[n]);
    for (k, bin) in spectrum.iter_mut().enumerate() {
        if !pass(bin_frequency(k, n, sample_rate)) {
            *bin = Complex::default();
        }
    }
    idft(&spectrum, &[n]).into_iter().map(|c| c.re).collect()
}

/// Keep the components at or below `cutoff`.
pub fn low_pass(data: &[f64], sample_rate: Hertz, cutoff: Hertz) -> Vec<f64> {
    apply_mask(data, sample_rate, |f| f <= cutoff)
}

/// Keep the components at or above `cutoff`.
pub fn high_pass(data: &[f64], sample_rate: Hertz, cutoff: Hertz) -> Vec<f64> {
    apply_mask(data, sample_rate, |f| f >= cutoff)
}

/// Keep the components inside `[low, high]`.
pub fn band_pass(data: &[f64], sample_rate: Hertz, low: Hertz, high: Hertz) -> Vec<f64> {
    apply_mask(data, sample_rate, |f| (low..=high).contains(&f))
}

/// Remove the components inside `[low, high]`.
pub fn band_reject(data: &[f64], sample_rate: Hertz, low: Hertz, high: Hertz) -> Vec<f64> {
    apply_mask(data, sample_rate, |f| !(low..=high).contains(&f))
}
