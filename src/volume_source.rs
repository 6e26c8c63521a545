use crate::{
    enums::VolumeFormat,
    volume::{DisplayVolume, GeometricVolume, Volume, Voxel},
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, DecodedPixelData, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{debug, info};
use ndarray::{Array3, Array4, ArrayD, Axis, Ix3, s};
use nifti::{InMemNiftiVolume, IntoNdArray, NiftiObject, ReaderOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Voxel spacing along `(D0, D1, D2)`.
type Spacing = (f32, f32, f32);

#[derive(Debug, Error)]
pub enum VolumeSourceError {
    #[error("Unreadable volume {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Unsupported volume format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error(
        "Display volume {display:?} and geometric volume {geometric:?} disagree on shape"
    )]
    ShapeMismatch {
        display: (usize, usize, usize),
        geometric: (usize, usize, usize),
    },
}

impl VolumeSourceError {
    fn unreadable(path: &Path, source: impl Into<BoxError>) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    /// True for every failure to decode the file itself, as opposed to a
    /// disagreement between the two decoders.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Unreadable { .. } | Self::UnsupportedFormat(_))
    }
}

/// Turns a file on disk into a 3D scalar array.
pub trait VolumeDecoder {
    type Voxel: Voxel;

    /// # Errors
    ///
    /// Returns [`VolumeSourceError::Unreadable`] or
    /// [`VolumeSourceError::UnsupportedFormat`] when the path cannot be decoded.
    fn decode(&self, path: &Path) -> Result<Volume<Self::Voxel>, VolumeSourceError>;
}

/// Decoder for the on-screen representation.
///
/// Voxels are `f32` in standard (row-major) layout. DICOM pixel data goes
/// through its first VOI LUT window, the way a viewer presents it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayDecoder;

/// Decoder for the export representation.
///
/// Voxels are `f64`, axis order as decoded and no windowing applied. DICOM
/// modality rescaling is skipped so the stored values survive.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricDecoder;

impl VolumeDecoder for DisplayDecoder {
    type Voxel = f32;

    fn decode(&self, path: &Path) -> Result<DisplayVolume, VolumeSourceError> {
        let volume = match format_of(path)? {
            VolumeFormat::Nifti => {
                let (data, spacing) = read_nifti(path, |volume| volume.into_ndarray::<f32>())?;
                Volume::new(data.as_standard_layout().into_owned(), spacing)
            }
            VolumeFormat::Dicom => {
                let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
                let (data, spacing) =
                    read_dicom(path, |pixels| pixels.to_ndarray_with_options::<u16>(&options))?;
                Volume::new(data.mapv(f32::from), spacing)
            }
        };
        Ok(volume)
    }
}

impl VolumeDecoder for GeometricDecoder {
    type Voxel = f64;

    fn decode(&self, path: &Path) -> Result<GeometricVolume, VolumeSourceError> {
        let volume = match format_of(path)? {
            VolumeFormat::Nifti => {
                let (data, spacing) = read_nifti(path, |volume| volume.into_ndarray::<f64>())?;
                Volume::new(data, spacing)
            }
            VolumeFormat::Dicom => {
                let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
                let (data, spacing) =
                    read_dicom(path, |pixels| pixels.to_ndarray_with_options::<f64>(&options))?;
                Volume::new(data, spacing)
            }
        };
        Ok(volume)
    }
}

pub struct VolumeSource;

impl VolumeSource {
    /// Load the display and geometric representations of one volume file
    ///
    /// # Arguments
    ///
    /// * `path` - NIfTI (`.nii`, `.nii.gz`) or multi-frame DICOM file (`.dcm`,
    ///   or any name when the file carries the `DICM` marker)
    ///
    /// # Errors
    ///
    /// Returns error if either decoder fails or both disagree on the voxel grid
    pub fn load(
        path: impl AsRef<Path>,
    ) -> Result<(DisplayVolume, GeometricVolume), VolumeSourceError> {
        Self::load_with(path, &DisplayDecoder, &GeometricDecoder)
    }

    /// Same as [`VolumeSource::load`] with caller supplied decoders.
    pub fn load_with<D, G>(
        path: impl AsRef<Path>,
        display_decoder: &D,
        geometric_decoder: &G,
    ) -> Result<(Volume<D::Voxel>, Volume<G::Voxel>), VolumeSourceError>
    where
        D: VolumeDecoder,
        G: VolumeDecoder,
    {
        let path = path.as_ref();
        let display = display_decoder.decode(path)?;
        let geometric = geometric_decoder.decode(path)?;

        if display.dim() != geometric.dim() {
            return Err(VolumeSourceError::ShapeMismatch {
                display: display.dim(),
                geometric: geometric.dim(),
            });
        }

        info!(
            "loaded {path:?}: dimensions {:?}, spacing {:?}",
            display.dim(),
            geometric.spacing()
        );
        Ok((display, geometric))
    }
}

fn format_of(path: &Path) -> Result<VolumeFormat, VolumeSourceError> {
    VolumeFormat::detect(path)
        .ok_or_else(|| VolumeSourceError::UnsupportedFormat(path.to_path_buf()))
}

fn read_nifti<T, F>(path: &Path, convert: F) -> Result<(Array3<T>, Spacing), VolumeSourceError>
where
    F: FnOnce(InMemNiftiVolume) -> nifti::Result<ArrayD<T>>,
{
    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| VolumeSourceError::unreadable(path, e))?;
    let header = obj.header();
    let spacing = (header.pixdim[1], header.pixdim[2], header.pixdim[3]);

    let data = convert(obj.into_volume()).map_err(|e| VolumeSourceError::unreadable(path, e))?;
    debug!("nifti {path:?} decoded with shape {:?}", data.shape());

    Ok((into_volume_array(path, data)?, spacing))
}

/// Accepts a 3D array, or a 4D one whose last axis holds a single volume.
fn into_volume_array<T>(path: &Path, data: ArrayD<T>) -> Result<Array3<T>, VolumeSourceError> {
    let single_volume = matches!(data.shape(), [_, _, _, 1]);
    let data = if single_volume {
        data.index_axis_move(Axis(3), 0)
    } else {
        data
    };
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|e| VolumeSourceError::unreadable(path, e))?;
    validate_dimensions(path, data)
}

fn validate_dimensions<T>(path: &Path, data: Array3<T>) -> Result<Array3<T>, VolumeSourceError> {
    if data.is_empty() {
        return Err(VolumeSourceError::unreadable(
            path,
            format!("volume has an empty axis: {:?}", data.dim()),
        ));
    }
    Ok(data)
}

fn read_dicom<T, F>(path: &Path, convert: F) -> Result<(Array3<T>, Spacing), VolumeSourceError>
where
    F: FnOnce(&DecodedPixelData<'_>) -> Result<Array4<T>, dicom::pixeldata::Error>,
{
    let dicom_object = open_file(path).map_err(|e| VolumeSourceError::unreadable(path, e))?;
    let pixel_data = dicom_object
        .decode_pixel_data()
        .map_err(|e| VolumeSourceError::unreadable(path, e))?;

    // (frames, rows, columns, samples); only the first sample is used
    let data = convert(&pixel_data)
        .map_err(|e| VolumeSourceError::unreadable(path, e))?
        .slice_move(s![.., .., .., 0]);
    debug!("dicom {path:?} decoded with shape {:?}", data.dim());

    let spacing = get_spacing(&dicom_object).unwrap_or((1.0, 1.0, 1.0));
    Ok((validate_dimensions(path, data)?, spacing))
}

/// Spacing along (frames, rows, columns).
fn get_spacing(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Spacing> {
    let pixel_spacing = dicom_object
        .element(tags::PIXEL_SPACING)
        .ok()?
        .to_multi_float32()
        .ok()?;

    let slice_thickness = dicom_object
        .element(tags::SLICE_THICKNESS)
        .ok()?
        .to_float32()
        .ok()?;

    Some((
        slice_thickness,
        *pixel_spacing.first()?,
        *pixel_spacing.get(1)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    struct FixedDecoder(Array3<f32>);

    impl VolumeDecoder for FixedDecoder {
        type Voxel = f32;

        fn decode(&self, _path: &Path) -> Result<Volume<f32>, VolumeSourceError> {
            Ok(Volume::new(self.0.clone(), (1.0, 1.0, 1.0)))
        }
    }

    struct FailingDecoder;

    impl VolumeDecoder for FailingDecoder {
        type Voxel = f64;

        fn decode(&self, path: &Path) -> Result<Volume<f64>, VolumeSourceError> {
            Err(VolumeSourceError::unreadable(path, "corrupt header"))
        }
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let result = VolumeSource::load_with(
            "scan.nii",
            &FixedDecoder(Array3::zeros((4, 5, 6))),
            &FixedDecoder(Array3::zeros((6, 5, 4))),
        );
        match result {
            Err(VolumeSourceError::ShapeMismatch { display, geometric }) => {
                assert_eq!(display, (4, 5, 6));
                assert_eq!(geometric, (6, 5, 4));
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn matching_shapes_load() {
        let (display, geometric) = VolumeSource::load_with(
            "scan.nii",
            &FixedDecoder(Array3::zeros((4, 5, 6))),
            &FixedDecoder(Array3::ones((4, 5, 6))),
        )
        .expect("shapes agree");
        assert_eq!(display.dim(), geometric.dim());
    }

    #[test]
    fn decoder_failure_is_unreadable() {
        let err = VolumeSource::load_with(
            "scan.nii",
            &FixedDecoder(Array3::zeros((4, 5, 6))),
            &FailingDecoder,
        )
        .unwrap_err();
        assert!(err.is_unreadable());
        assert!(err.to_string().contains("corrupt header"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = VolumeSource::load("volume.raw").unwrap_err();
        assert!(matches!(err, VolumeSourceError::UnsupportedFormat(_)));
        assert!(err.is_unreadable());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = VolumeSource::load("/nonexistent/volume.nii").unwrap_err();
        assert!(matches!(err, VolumeSourceError::Unreadable { .. }));
    }

    #[test]
    fn singleton_fourth_axis_is_dropped() {
        let data = ArrayD::<f32>::zeros(IxDyn(&[3, 4, 5, 1]));
        let volume = into_volume_array(Path::new("a.nii"), data).unwrap();
        assert_eq!(volume.dim(), (3, 4, 5));
    }

    #[test]
    fn time_series_and_empty_volumes_are_rejected() {
        let series = ArrayD::<f32>::zeros(IxDyn(&[3, 4, 5, 2]));
        assert!(into_volume_array(Path::new("a.nii"), series).is_err());

        let flat = ArrayD::<f32>::zeros(IxDyn(&[3, 4]));
        assert!(into_volume_array(Path::new("a.nii"), flat).is_err());

        let empty = ArrayD::<f32>::zeros(IxDyn(&[3, 0, 5]));
        assert!(into_volume_array(Path::new("a.nii"), empty).is_err());
    }
}
