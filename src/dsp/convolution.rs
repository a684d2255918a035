use crate::vlbi_errors::VlbiError;

/// Width and height of a buffer of at most two dimensions.
fn plane(shape: &[usize]) -> Result<(usize, usize), VlbiError> {
    match shape {
        [w] => Ok((*w, 1)),
        [w, h] => Ok((*w, *h)),
        _ => Err(VlbiError::SizeMismatch {
            expected: vec![0, 0],
            found: shape.to_vec(),
        }),
    }
}

/// Two-dimensional convolution with zero padding, same-size output.
///
/// The kernel is centered on its `(width / 2, height / 2)` element. One-dimensional buffers
/// are treated as a single row.
///
/// Return
/// ------
/// * the convolved buffer with the shape of `data`, or [`VlbiError::SizeMismatch`] for
///   buffers of more than two dimensions
pub fn convolve(
    data: &[f64],
    shape: &[usize],
    kernel: &[f64],
    kernel_shape: &[usize],
) -> Result<Vec<f64>, VlbiError> {
    let (w, h) = plane(shape)?;
    let (kw, kh) = plane(kernel_shape)?;
    let (cx, cy) = ((kw / 2) as isize, (kh / 2) as isize);

    let mut out = vec![0.0; data.len()];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let mut acc = 0.0;
            for ky in 0..kh as isize {
                let sy = y + cy - ky;
                if sy < 0 || sy >= h as isize {
                    continue;
                }
                for kx in 0..kw as isize {
                    let sx = x + cx - kx;
                    if sx < 0 || sx >= w as isize {
                        continue;
                    }
                    acc += data[(sx + sy * w as isize) as usize]
                        * kernel[(kx + ky * kw as isize) as usize];
                }
            }
            out[(x + y * w as isize) as usize] = acc;
        }
    }
    Ok(out)
}
