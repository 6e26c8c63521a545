use std::{error::Error, path::PathBuf};

use clap::Parser;
use log::info;
use volume_slicer::{PLANE_BUTTONS, PlaneSelector, ViewerSession, VolumeSource};

fn parse_plane(label: &str) -> Result<PlaneSelector, String> {
    PlaneSelector::from_label(label).ok_or_else(|| {
        let labels: Vec<_> = PLANE_BUTTONS.iter().map(|(text, _)| *text).collect();
        format!("unknown plane {label:?}, expected one of {}", labels.join(", "))
    })
}

#[derive(Parser, Debug)]
struct Args {
    /// NIfTI (.nii, .nii.gz) or multi-frame DICOM (.dcm) volume
    volume_path: PathBuf,
    #[arg(long, default_value = "sagittal", value_parser = parse_plane)]
    plane: PlaneSelector,
    /// slice index, clamped to the plane; the center slice if not given
    #[arg(long)]
    index: Option<usize>,
    /// save the display raster here
    #[arg(long)]
    preview: Option<PathBuf>,
    /// save the export raster here (format from the extension, e.g. .jpg)
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let args = Args::parse();

    let (display, geometric) = VolumeSource::load(&args.volume_path)?;
    let mut session = ViewerSession::new(&display, &geometric);

    session.set_plane(args.plane);
    if let Some(index) = args.index {
        session.set_index(session.clamp_index(index));
    }
    info!(
        "{} slice {} of 0..={}",
        session.current_plane(),
        session.current_index(),
        session.slider_max()
    );

    let raster = session.render()?;
    if let Some(preview) = &args.preview {
        raster.save(preview)?;
        info!("preview written to {preview:?}");
    }

    if let Some(export) = &args.export {
        session.export_current(export)?;
    }

    Ok(())
}
