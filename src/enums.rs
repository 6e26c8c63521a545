use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One of the three canonical anatomical viewing planes.
///
/// Each plane holds one array axis fixed when slicing a volume:
///  - Sagittal fixes axis 2
///  - Coronal fixes axis 1
///  - Axial fixes axis 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaneSelector {
    #[default]
    Sagittal,
    Coronal,
    Axial,
}

impl PlaneSelector {
    pub const ALL: [PlaneSelector; 3] = [
        PlaneSelector::Sagittal,
        PlaneSelector::Coronal,
        PlaneSelector::Axial,
    ];

    /// The axis of a `(D0, D1, D2)` volume held at the slice index.
    pub fn fixed_axis(self) -> usize {
        match self {
            PlaneSelector::Sagittal => 2,
            PlaneSelector::Coronal => 1,
            PlaneSelector::Axial => 0,
        }
    }

    /// The two axes left free, in the order they appear in the sliced array.
    pub fn free_axes(self) -> (usize, usize) {
        match self {
            PlaneSelector::Sagittal => (0, 1),
            PlaneSelector::Coronal => (0, 2),
            PlaneSelector::Axial => (1, 2),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaneSelector::Sagittal => "Sagittal",
            PlaneSelector::Coronal => "Coronal",
            PlaneSelector::Axial => "Axial",
        }
    }

    /// Look a plane up by its button label, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        PLANE_BUTTONS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(label.trim()))
            .map(|&(_, plane)| plane)
    }
}

impl fmt::Display for PlaneSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Button label to plane table used by viewer front ends.
pub const PLANE_BUTTONS: [(&str, PlaneSelector); 3] = [
    ("Sagittal", PlaneSelector::Sagittal),
    ("Coronal", PlaneSelector::Coronal),
    ("Axial", PlaneSelector::Axial),
];

/// On-disk volume formats understood by the decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    /// NIfTI-1, plain (`.nii`) or gzipped (`.nii.gz`)
    Nifti,
    /// Multi-frame DICOM (`.dcm`)
    Dicom,
}

impl VolumeFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(VolumeFormat::Nifti)
        } else if name.ends_with(".dcm") {
            Some(VolumeFormat::Dicom)
        } else {
            None
        }
    }

    /// Format by extension, falling back to the `DICM` marker after the
    /// 128 byte preamble for DICOM files named without `.dcm`.
    pub fn detect(path: &Path) -> Option<Self> {
        Self::from_path(path).or_else(|| has_dicom_marker(path).then_some(VolumeFormat::Dicom))
    }
}

fn has_dicom_marker(path: &Path) -> bool {
    let mut header = [0u8; 132];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .is_ok_and(|()| &header[128..] == b"DICM")
}
