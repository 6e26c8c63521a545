use crate::{
    enums::PlaneSelector,
    normalizer::{Normalizer, RasterSlice},
    volume::{DisplayVolume, GeometricVolume, SliceError},
};

use log::{debug, info, warn};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Slice(#[from] SliceError),

    #[error("Nothing has been rendered yet")]
    NothingRendered,

    #[error("Failed to write {path:?}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Plane and slice currently viewed, over a pair of volumes loaded once.
///
/// The session borrows both volumes and only owns the geometric slice of
/// the last successful render, which is what [`ViewerSession::export_current`]
/// writes. Mutation goes through `&mut self`, so a session has a single writer.
pub struct ViewerSession<'a> {
    display: &'a DisplayVolume,
    geometric: &'a GeometricVolume,
    current_plane: PlaneSelector,
    current_index: usize,
    last_geometric_slice: Option<Array2<f64>>,
    last_export_path: Option<PathBuf>,
    stale: bool,
}

impl<'a> ViewerSession<'a> {
    /// Starts on the sagittal plane at its center slice, with nothing rendered.
    pub fn new(display: &'a DisplayVolume, geometric: &'a GeometricVolume) -> Self {
        let current_plane = PlaneSelector::default();
        Self {
            display,
            geometric,
            current_plane,
            current_index: display.extent(current_plane) / 2,
            last_geometric_slice: None,
            last_export_path: None,
            stale: true,
        }
    }

    pub fn current_plane(&self) -> PlaneSelector {
        self.current_plane
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn last_geometric_slice(&self) -> Option<&Array2<f64>> {
        self.last_geometric_slice.as_ref()
    }

    pub fn last_export_path(&self) -> Option<&Path> {
        self.last_export_path.as_deref()
    }

    /// True when the plane or index changed since the last render.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of slices along `plane`.
    pub fn extent(&self, plane: PlaneSelector) -> usize {
        self.display.extent(plane)
    }

    /// Largest valid index for the current plane, the upper bound of a slider.
    pub fn slider_max(&self) -> usize {
        self.extent(self.current_plane).saturating_sub(1)
    }

    /// Clamp a requested index into the valid range of the current plane.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.slider_max())
    }

    /// Switch plane and jump to its center slice.
    pub fn set_plane(&mut self, plane: PlaneSelector) {
        self.current_plane = plane;
        self.current_index = self.extent(plane) / 2;
        self.stale = true;
        debug!("plane set to {plane}, index {}", self.current_index);
    }

    /// Move to `index` on the current plane.
    ///
    /// The index is taken as is; callers clamp it beforehand (see
    /// [`ViewerSession::clamp_index`]), otherwise the next render fails.
    pub fn set_index(&mut self, index: usize) {
        self.current_index = index;
        self.stale = true;
    }

    /// Extract the current slice from both volumes and return the display raster.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Slice`] when the current index is out of
    /// range for the current plane. The cached slice is left untouched.
    pub fn render(&mut self) -> Result<RasterSlice, SessionError> {
        let (plane, index) = (self.current_plane, self.current_index);
        let display_slice = self.display.extract(plane, index)?;
        let geometric_slice = self.geometric.extract(plane, index)?;

        self.last_geometric_slice = Some(geometric_slice.to_owned());
        self.stale = false;
        debug!(
            "rendered {plane} slice {index} ({}x{})",
            display_slice.nrows(),
            display_slice.ncols()
        );

        Ok(Normalizer::to_display_raster(&display_slice))
    }

    /// Write the last rendered geometric slice as an 8-bit grayscale image.
    ///
    /// The image format follows the extension of `destination`. An empty
    /// destination (a cancelled save dialog) writes nothing and returns
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NothingRendered`] before the first render and
    /// [`SessionError::Export`] if the image cannot be written. Neither
    /// changes the session state.
    pub fn export_current(
        &mut self,
        destination: impl AsRef<Path>,
    ) -> Result<Option<&Path>, SessionError> {
        let destination = destination.as_ref();
        if destination.as_os_str().is_empty() {
            debug!("empty export destination, nothing written");
            return Ok(None);
        }

        let slice = self
            .last_geometric_slice
            .as_ref()
            .ok_or(SessionError::NothingRendered)?;
        if self.stale {
            warn!(
                "exporting the last rendered slice, the view changed to {} slice {} since",
                self.current_plane, self.current_index
            );
        }

        let raster = Normalizer::to_export_raster(&slice.view());
        raster.save(destination).map_err(|source| SessionError::Export {
            path: destination.to_path_buf(),
            source,
        })?;
        info!(
            "exported {}x{} slice to {destination:?}",
            raster.width(),
            raster.height()
        );

        Ok(Some(self.last_export_path.insert(destination.to_path_buf()).as_path()))
    }
}
