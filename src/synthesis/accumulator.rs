use crate::coordinates::UvCoordinate;

/// Flat index of the UV-plane cell holding `uv`, `None` outside the image.
///
/// The grid origin sits at `(width / 2, height / 2)`; cell `(U, V)` maps to `U + V·width`.
pub fn pixel_index(uv: &UvCoordinate, width: usize, height: usize) -> Option<usize> {
    if !(uv.u.is_finite() && uv.v.is_finite()) {
        return None;
    }
    // floor, not truncation toward zero: cells straddling an axis stay one unit wide
    let u = uv.u.floor() + (width / 2) as f64;
    let v = uv.v.floor() + (height / 2) as f64;
    if u < 0.0 || v < 0.0 || u >= width as f64 || v >= height as f64 {
        return None;
    }
    Some(u as usize + v as usize * width)
}

/// The image shared by all workers of one synthesis run, with the active-worker count.
///
/// Both live behind the same mutex in the engine.
#[derive(Debug, Clone)]
pub struct UvAccumulator {
    image: Vec<f64>,
    active: usize,
}

impl UvAccumulator {
    pub fn new(width: usize, height: usize) -> Self {
        UvAccumulator {
            image: vec![0.0; width * height],
            active: 0,
        }
    }

    pub fn begin_worker(&mut self) {
        self.active += 1;
    }

    pub fn end_worker(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Fold `value` into the cell as a running mean weighted by the active-worker count:
    /// `cell ← (cell·stack + value) / (stack + 1)`.
    pub fn accumulate(&mut self, index: usize, value: f64) {
        let stack = self.active as f64;
        if let Some(cell) = self.image.get_mut(index) {
            *cell = (*cell * stack + value) / (stack + 1.0);
        }
    }

    pub fn image(&self) -> &[f64] {
        &self.image
    }

    pub fn into_image(self) -> Vec<f64> {
        self.image
    }
}

/// Private image of one worker in deterministic mode: per-cell mean of the written values.
#[derive(Debug, Clone)]
pub struct PartialImage {
    mean: Vec<f64>,
    hits: Vec<u32>,
}

impl PartialImage {
    pub fn new(len: usize) -> Self {
        PartialImage {
            mean: vec![0.0; len],
            hits: vec![0; len],
        }
    }

    pub fn accumulate(&mut self, index: usize, value: f64) {
        if let (Some(cell), Some(hits)) = (self.mean.get_mut(index), self.hits.get_mut(index)) {
            let n = f64::from(*hits);
            *cell = (*cell * n + value) / (n + 1.0);
            *hits += 1;
        }
    }
}

/// Average the partial images cell by cell, over the images that wrote the cell, in the order
/// given.
pub fn reduce_partials<'a>(partials: impl IntoIterator<Item = &'a PartialImage>, len: usize) -> Vec<f64> {
    let mut image = vec![0.0; len];
    let mut writers = vec![0u32; len];
    for partial in partials {
        for (i, (&mean, &hits)) in partial.mean.iter().zip(&partial.hits).enumerate().take(len) {
            if hits > 0 {
                let n = f64::from(writers[i]);
                image[i] = (image[i] * n + mean) / (n + 1.0);
                writers[i] += 1;
            }
        }
    }
    image
}

#[cfg(test)]
mod accumulator_test {
    use super::*;

    fn uv(u: f64, v: f64) -> UvCoordinate {
        UvCoordinate { u, v, delay: 0.0 }
    }

    #[test]
    fn test_pixel_index() {
        assert_eq!(pixel_index(&uv(0.0, 0.0), 64, 64), Some(32 + 32 * 64));
        assert_eq!(pixel_index(&uv(-0.5, 0.2), 64, 64), Some(31 + 32 * 64));
        assert_eq!(pixel_index(&uv(-32.0, -32.0), 64, 64), Some(0));
        assert_eq!(pixel_index(&uv(31.9, 31.9), 64, 64), Some(63 + 63 * 64));
        assert_eq!(pixel_index(&uv(32.0, 0.0), 64, 64), None);
        assert_eq!(pixel_index(&uv(0.0, -33.0), 64, 64), None);
        assert_eq!(pixel_index(&uv(f64::NAN, 0.0), 64, 64), None);
        assert_eq!(pixel_index(&uv(0.0, 0.0), 1, 1), Some(0));
    }

    #[test]
    fn test_running_mean_weighted_by_active_workers() {
        let mut acc = UvAccumulator::new(2, 2);
        acc.begin_worker();
        acc.accumulate(1, 4.0);
        assert_eq!(acc.image()[1], 2.0);

        acc.begin_worker();
        acc.accumulate(1, 8.0);
        assert_eq!(acc.image()[1], 4.0);

        acc.end_worker();
        acc.end_worker();
        acc.end_worker();
        assert_eq!(acc.active(), 0);
        acc.accumulate(3, 5.0);
        acc.accumulate(99, 5.0);
        assert_eq!(acc.into_image(), vec![0.0, 4.0, 0.0, 5.0]);
    }

    #[test]
    fn test_lone_worker_converges_toward_its_value() {
        // the stack counts the writing worker itself, so the first write is halved
        let mut acc = UvAccumulator::new(1, 1);
        acc.begin_worker();
        acc.accumulate(0, 3.0);
        assert_eq!(acc.image()[0], 1.5);
        acc.accumulate(0, 3.0);
        assert_eq!(acc.image()[0], 2.25);
        acc.accumulate(0, 3.0);
        assert!(acc.image()[0] < 3.0);
    }

    #[test]
    fn test_partials_reduce_in_order() {
        let mut a = PartialImage::new(3);
        a.accumulate(0, 1.0);
        a.accumulate(0, 3.0);
        a.accumulate(1, 6.0);

        let mut b = PartialImage::new(3);
        b.accumulate(1, 2.0);

        assert_eq!(reduce_partials([&a, &b], 3), vec![2.0, 4.0, 0.0]);
    }
}
