//! # Volume slicer library
//!
//! This crate serves the core of a multi-planar viewer for volumetric
//! medical images (MRI, CT)

//!
//! A volume file is decoded twice: once into a display volume used for
//! on-screen rendering and once into a geometric volume that keeps axis
//! order and stored values as they are, used for export. Both must describe
//! the same voxel grid. The volume can be sliced in the three different
//! medical planes:
//!  - Sagittal (fixes axis 2)
//!  - Coronal (fixes axis 1)
//!  - Axial (fixes axis 0)
//!
//!  Each slice is windowed onto 8 bits by its own minimum and maximum. A
//!  constant slice renders as a black raster. Supported files:
//!   - NIfTI-1 (`.nii`, `.nii.gz`)
//!   - Multi-frame DICOM (`.dcm`)
//!
//! The display raster and the exported image are windowed independently
//! from their own volume, so they are not guaranteed to be bit identical.
//!
//! # Examples
//!
//! ## Browsing and exporting a slice
//!
//! Load a volume, switch to the axial plane (which jumps to its center
//! slice), render it and save it as a JPEG.
//!
//! ```no_run
//! # use volume_slicer::{PlaneSelector, ViewerSession, VolumeSource};
//! let (display, geometric) = VolumeSource::load("brain.nii.gz")
//!     .expect("should have loaded the volume");
//! let mut session = ViewerSession::new(&display, &geometric);
//! session.set_plane(PlaneSelector::Axial);
//! let raster = session.render().expect("center slice is always valid");
//! println!("{}x{}", raster.width(), raster.height());
//! session
//!     .export_current("axial.jpg")
//!     .expect("should have written the slice");
//! ```

pub mod enums;
pub mod normalizer;
pub mod session;
pub mod volume;
pub mod volume_source;

pub use enums::{PLANE_BUTTONS, PlaneSelector, VolumeFormat};
pub use normalizer::{Normalizer, RasterSlice, Window};
pub use session::{SessionError, ViewerSession};
pub use volume::{DisplayVolume, GeometricVolume, SliceError, Volume, Voxel};
pub use volume_source::{
    DisplayDecoder, GeometricDecoder, VolumeDecoder, VolumeSource, VolumeSourceError,
};
