use rustfft::{num_complex::Complex, FftDirection, FftPlanner};

/// In-place n-dimensional FFT, one axis at a time.
///
/// `shape` lists the axis sizes, first axis varying fastest. The inverse transform is
/// normalized by the total number of samples.
fn transform(buffer: &mut [Complex<f64>], shape: &[usize], direction: FftDirection) {
    let mut planner = FftPlanner::<f64>::new();
    let mut stride = 1;

    for &size in shape {
        if size > 1 {
            let fft = planner.plan_fft(size, direction);
            let block = stride * size;
            let mut line = vec![Complex::default(); size];

            for outer in 0..buffer.len() / block {
                for inner in 0..stride {
                    let base = outer * block + inner;
                    for (k, slot) in line.iter_mut().enumerate() {
                        *slot = buffer[base + k * stride];
                    }
                    fft.process(&mut line);
                    for (k, value) in line.iter().enumerate() {
                        buffer[base + k * stride] = *value;
                    }
                }
            }
        }
        stride *= size;
    }

    if direction == FftDirection::Inverse && !buffer.is_empty() {
        let scale = 1.0 / buffer.len() as f64;
        buffer.iter_mut().for_each(|value| *value *= scale);
    }
}

/// Forward transform of a real buffer.
pub fn dft(data: &[f64], shape: &[usize]) -> Vec<Complex<f64>> {
    let mut buffer: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
    transform(&mut buffer, shape, FftDirection::Forward);
    buffer
}

/// Inverse transform, normalized by the number of samples.
pub fn idft(spectrum: &[Complex<f64>], shape: &[usize]) -> Vec<Complex<f64>> {
    let mut buffer = spectrum.to_vec();
    transform(&mut buffer, shape, FftDirection::Inverse);
    buffer
}

/// Forward transform of a real buffer, split into magnitude and phase.
pub fn dft_magnitude_phase(data: &[f64], shape: &[usize]) -> (Vec<f64>, Vec<f64>) {
    dft(data, shape)
        .into_iter()
        .map(|c| (c.norm(), c.arg()))
        .unzip()
}

/// Real part of the inverse transform of a magnitude/phase pair.
pub fn idft_magnitude_phase(magnitude: &[f64], phase: &[f64], shape: &[usize]) -> Vec<f64> {
    let spectrum: Vec<Complex<f64>> = magnitude
        .iter()
        .zip(phase)
        .map(|(&m, &p)| Complex::from_polar(m, p))
        .collect();
    idft(&spectrum, shape).into_iter().map(|c| c.re).collect()
}
