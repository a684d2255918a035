/// Smallest sample, `f64::INFINITY` for an empty buffer.
pub fn min(data: &[f64]) -> f64 {
    data.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Largest sample, `f64::NEG_INFINITY` for an empty buffer.
pub fn max(data: &[f64]) -> f64 {
    data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Arithmetic mean, 0 for an empty buffer.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Linearly rescale the buffer in place so that its range becomes `[lo, hi]`.
///
/// A constant buffer has no range to stretch and is filled with `lo`.
pub fn stretch(data: &mut [f64], lo: f64, hi: f64) {
    let (mn, mx) = (min(data), max(data));
    let range = mx - mn;
    if !(range.is_finite() && range > 0.0) {
        data.iter_mut().for_each(|x| *x = lo);
        return;
    }
    let scale = (hi - lo) / range;
    data.iter_mut().for_each(|x| *x = (*x - mn) * scale + lo);
}

/// Flat index of the position `pos` in a buffer of `shape`, first axis varying fastest.
///
/// Return
/// ------
/// * `None` if the dimensions differ or a coordinate is out of bounds
pub fn pos_to_index(pos: &[usize], shape: &[usize]) -> Option<usize> {
    if pos.len() != shape.len() {
        return None;
    }
    let mut index = 0;
    let mut stride = 1;
    for (&p, &size) in pos.iter().zip(shape) {
        if p >= size {
            return None;
        }
        index += p * stride;
        stride *= size;
    }
    Some(index)
}

/// Inverse of [`pos_to_index`].
pub fn index_to_pos(mut index: usize, shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .map(|&size| {
            if size == 0 {
                return 0;
            }
            let p = index % size;
            index /= size;
            p
        })
        .collect()
}

/// Swap the halves of every axis, moving the zero-frequency bin of a spectrum to the center.
pub fn shift(data: &[f64], shape: &[usize]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for (i, &value) in data.iter().enumerate() {
        let shifted: Vec<usize> = index_to_pos(i, shape)
            .iter()
            .zip(shape)
            .map(|(&p, &size)| (p + size / 2) % size)
            .collect();
        if let Some(j) = pos_to_index(&shifted, shape) {
            out[j] = value;
        }
    }
    out
}
