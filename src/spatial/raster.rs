//! Generic row-major raster for per-cell scalar fields and label maps

use crate::core::types::CellPos;

/// Generic 2D grid of values addressed by [`CellPos`]
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T: Clone> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone> Raster<T> {
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    /// Build a raster from row-major values
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn index_of(&self, pos: CellPos) -> usize {
        pos.j * self.width + pos.i
    }

    #[inline]
    pub fn pos_of(&self, index: usize) -> CellPos {
        CellPos::new(index % self.width, index / self.width)
    }

    #[inline]
    pub fn get(&self, pos: CellPos) -> Option<&T> {
        if pos.i < self.width && pos.j < self.height {
            Some(&self.data[self.index_of(pos)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, pos: CellPos) -> Option<&mut T> {
        if pos.i < self.width && pos.j < self.height {
            let idx = self.index_of(pos);
            Some(&mut self.data[idx])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, pos: CellPos, value: T) {
        if let Some(slot) = self.get_mut(pos) {
            *slot = value;
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate positions in row-major scan order
    pub fn positions(&self) -> impl Iterator<Item = CellPos> {
        let width = self.width;
        (0..self.data.len()).map(move |idx| CellPos::new(idx % width, idx / width))
    }
}

impl Raster<f64> {
    /// Smooth the field with a 3x3 binomial (Gaussian) kernel
    ///
    /// Out-of-bounds taps are dropped and the remaining weights renormalized,
    /// so edges and 1-wide rasters need no padding.
    pub fn gaussian_blur_3x3(&self) -> Raster<f64> {
        const KERNEL: [[f64; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];

        let mut out = Vec::with_capacity(self.data.len());
        for pos in self.positions() {
            let mut sum = 0.0;
            let mut weight = 0.0;
            for (dj, row) in KERNEL.iter().enumerate() {
                for (di, w) in row.iter().enumerate() {
                    if let Some(n) = pos.offset(di as isize - 1, dj as isize - 1, self.width, self.height) {
                        sum += w * self.data[self.index_of(n)];
                        weight += w;
                    }
                }
            }
            out.push(sum / weight);
        }
        Raster::from_vec(self.width, self.height, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        let raster = Raster::new(4, 3, 0u8);
        let pos = CellPos::new(3, 2);
        assert_eq!(raster.pos_of(raster.index_of(pos)), pos);
        assert!(raster.get(CellPos::new(4, 0)).is_none());
    }

    #[test]
    fn test_set_out_of_bounds_is_ignored() {
        let mut raster = Raster::new(2, 2, 1);
        raster.set(CellPos::new(5, 5), 9);
        assert!(raster.values().iter().all(|&v| v == 1));
        raster.set(CellPos::new(1, 1), 9);
        assert_eq!(raster.get(CellPos::new(1, 1)), Some(&9));
    }

    #[test]
    fn test_blur_preserves_constant_field() {
        let raster = Raster::new(5, 4, 0.25);
        let blurred = raster.gaussian_blur_3x3();
        for v in blurred.values() {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_blur_spreads_spike() {
        let mut raster = Raster::new(3, 3, 0.0);
        raster.set(CellPos::new(1, 1), 16.0);
        let blurred = raster.gaussian_blur_3x3();
        assert!((blurred.get(CellPos::new(1, 1)).unwrap() - 4.0).abs() < 1e-12);
        assert!(*blurred.get(CellPos::new(0, 0)).unwrap() > 0.0);
    }

    #[test]
    fn test_blur_single_cell() {
        let raster = Raster::new(1, 1, 0.7);
        assert_eq!(raster.gaussian_blur_3x3().values(), &[0.7]);
    }

    #[test]
    fn test_positions_scan_order() {
        let raster = Raster::new(2, 2, ());
        let order: Vec<_> = raster.positions().collect();
        assert_eq!(
            order,
            vec![
                CellPos::new(0, 0),
                CellPos::new(1, 0),
                CellPos::new(0, 1),
                CellPos::new(1, 1)
            ]
        );
    }
}
