use crate::volume::Voxel;

use image::ImageBuffer;
use image::Luma;
use log::debug;
use ndarray::ArrayView2;
use ndarray::Axis;
use rayon::prelude::*;

/// 8-bit grayscale bitmap, `height` rows of `width` pixels in row-major order.
///
/// Rows follow the first free axis of the slice, columns the second.
pub type RasterSlice = ImageBuffer<Luma<u8>, Vec<u8>>;

/// Intensity range of a single slice, mapped linearly onto `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    min: f64,
    max: f64,
}

impl Window {
    /// Compute the window over the finite samples of `slice`.
    ///
    /// Returns `None` for a degenerate slice: no finite sample at all, or
    /// every finite sample equal.
    pub fn of_slice<A: Voxel>(slice: &ArrayView2<'_, A>) -> Option<Self> {
        let (min, max) = slice
            .into_par_iter()
            .map(|&v| -> f64 { v.into() })
            .filter(|v| v.is_finite())
            .fold(
                || (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f64::INFINITY, f64::NEG_INFINITY),
                |a, b| (a.0.min(b.0), a.1.max(b.1)),
            );

        (min < max).then_some(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// NaN maps to 0, values outside the window saturate.
    #[inline]
    pub fn apply(&self, value: f64) -> u8 {
        // halved so a range wider than f64::MAX stays finite
        let (value, min, max) = (value / 2.0, self.min / 2.0, self.max / 2.0);
        let scaled = ((value - min) / (max - min) * 255.0).round();
        scaled.clamp(0.0, 255.0) as u8
    }
}

/// Per-slice min-max windowing onto an 8-bit range.
///
/// A degenerate slice (constant, or without finite samples) yields an
/// all-zero raster. It is never an error.
pub struct Normalizer;

impl Normalizer {
    /// Raster for on-screen display, computed from a display volume slice.
    pub fn to_display_raster<A: Voxel>(slice: &ArrayView2<'_, A>) -> RasterSlice {
        Self::rasterize(slice)
    }

    /// Raster written on export, computed from a geometric volume slice.
    ///
    /// Uses the same formula as [`Normalizer::to_display_raster`] but is
    /// windowed independently, so the exported pixels need not match the
    /// preview bit for bit.
    pub fn to_export_raster<A: Voxel>(slice: &ArrayView2<'_, A>) -> RasterSlice {
        Self::rasterize(slice)
    }

    fn rasterize<A: Voxel>(slice: &ArrayView2<'_, A>) -> RasterSlice {
        let (height, width) = slice.dim();
        let mut raster = RasterSlice::new(width as u32, height as u32);

        let Some(window) = Window::of_slice(slice) else {
            debug!("degenerate {height}x{width} slice, using a flat raster");
            return raster;
        };

        // a window only exists for non-empty slices, so width > 0 here
        raster
            .par_chunks_mut(width)
            .zip(slice.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(row, samples)| {
                for (pixel, &v) in row.iter_mut().zip(samples.iter()) {
                    *pixel = window.apply(v.into());
                }
            });

        raster
    }
}
