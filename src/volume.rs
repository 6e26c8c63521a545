use crate::enums::PlaneSelector;

use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::Axis;
use thiserror::Error;

/// Scalar sample types a volume may hold.
pub trait Voxel: Copy + Into<f64> + Send + Sync {}

impl<T: Copy + Into<f64> + Send + Sync> Voxel for T {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SliceError {
    #[error("{plane} slice index {index} is out of range (extent {extent})")]
    IndexOutOfRange {
        plane: PlaneSelector,
        index: usize,
        extent: usize,
    },
}

/// A 3D grid of scalar intensity samples, read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Volume<A> {
    data: Array3<A>,
    spacing: (f32, f32, f32),
}

/// Viewer-oriented representation, used for on-screen rendering.
pub type DisplayVolume = Volume<f32>;

/// Representation with axis order and values as stored, used for export.
pub type GeometricVolume = Volume<f64>;

impl<A: Voxel> Volume<A> {
    pub fn new(data: Array3<A>, spacing: (f32, f32, f32)) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume `(D0, D1, D2)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<A> {
        &self.data
    }

    /// Voxel spacing along `(D0, D1, D2)` as reported by the decoder.
    pub fn spacing(&self) -> (f32, f32, f32) {
        self.spacing
    }

    /// Number of slices available for `plane`, i.e. the length of its fixed axis.
    pub fn extent(&self, plane: PlaneSelector) -> usize {
        self.data.len_of(Axis(plane.fixed_axis()))
    }

    /// `(rows, columns)` of any slice taken along `plane`.
    pub fn free_dimensions(&self, plane: PlaneSelector) -> (usize, usize) {
        let shape = self.data.shape();
        let (rows, columns) = plane.free_axes();
        (shape[rows], shape[columns])
    }

    pub fn is_valid_index(&self, index: usize, plane: PlaneSelector) -> bool {
        index < self.extent(plane)
    }

    /// Slice the volume at `index` along the fixed axis of `plane`.
    ///
    /// The index is never clamped: anything outside
    /// `0..self.extent(plane)` is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::IndexOutOfRange`] for an invalid index.
    pub fn extract(
        &self,
        plane: PlaneSelector,
        index: usize,
    ) -> Result<ArrayView2<'_, A>, SliceError> {
        if !self.is_valid_index(index, plane) {
            return Err(SliceError::IndexOutOfRange {
                plane,
                index,
                extent: self.extent(plane),
            });
        }
        Ok(self.data.index_axis(Axis(plane.fixed_axis()), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    fn ramp(shape: (usize, usize, usize)) -> Volume<f64> {
        let (_, d1, d2) = shape;
        let data = Array3::from_shape_fn(shape, |(i, j, k)| (i * d1 * d2 + j * d2 + k) as f64);
        Volume::new(data, (1.0, 1.0, 1.0))
    }

    #[test]
    fn extents_follow_fixed_axis() {
        let volume = ramp((10, 20, 30));
        assert_eq!(volume.extent(PlaneSelector::Sagittal), 30);
        assert_eq!(volume.extent(PlaneSelector::Coronal), 20);
        assert_eq!(volume.extent(PlaneSelector::Axial), 10);
    }

    #[test]
    fn slices_have_free_axis_shape() {
        let volume = ramp((10, 20, 30));
        for plane in PlaneSelector::ALL {
            let slice = volume.extract(plane, 3).expect("index 3 is valid");
            assert_eq!(slice.dim(), volume.free_dimensions(plane), "{plane}");
        }
        assert_eq!(volume.free_dimensions(PlaneSelector::Sagittal), (10, 20));
        assert_eq!(volume.free_dimensions(PlaneSelector::Coronal), (10, 30));
        assert_eq!(volume.free_dimensions(PlaneSelector::Axial), (20, 30));
    }

    #[test]
    fn slices_match_ndarray_indexing() {
        let volume = ramp((4, 5, 6));
        let data = volume.data();
        assert_eq!(
            volume.extract(PlaneSelector::Sagittal, 2).unwrap(),
            data.slice(s![.., .., 2])
        );
        assert_eq!(
            volume.extract(PlaneSelector::Coronal, 4).unwrap(),
            data.slice(s![.., 4, ..])
        );
        assert_eq!(
            volume.extract(PlaneSelector::Axial, 3).unwrap(),
            data.slice(s![3, .., ..])
        );
    }

    #[test]
    fn last_index_is_valid_and_extent_is_not() {
        let volume = ramp((10, 20, 30));
        assert!(volume.extract(PlaneSelector::Axial, 9).is_ok());
        assert_eq!(
            volume.extract(PlaneSelector::Axial, 10),
            Err(SliceError::IndexOutOfRange {
                plane: PlaneSelector::Axial,
                index: 10,
                extent: 10,
            })
        );
        assert!(volume.extract(PlaneSelector::Sagittal, 30).is_err());
        assert!(volume.extract(PlaneSelector::Coronal, usize::MAX).is_err());
    }
}
