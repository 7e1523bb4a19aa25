use std::path::Path;

use crate::error::PipelineError;

/// Recreate the output directory from scratch
///
/// # Arguments
/// * `outdir` - The directory every step writes into
///
/// # Example
/// ```rust, no_run
/// let outdir = PathBuf::from("/path/to/out");
/// workspace::prepare(&outdir)?;
///
/// assert!(std::fs::read_dir(&outdir)?.next().is_none());
/// ```
pub fn prepare(outdir: &Path) -> Result<(), PipelineError> {
    if outdir.exists() {
        log::warn!("WARN: {} already exists, removing it", outdir.display());
        std::fs::remove_dir_all(outdir)?;
    }

    std::fs::create_dir_all(outdir)?;
    log::info!("INFO [STEP 1]: Workspace ready at {}", outdir.display());

    Ok(())
}

/// Remove a file or directory if it exists
pub fn remove<P: AsRef<Path>>(path: P) -> Result<(), PipelineError> {
    let path = path.as_ref();

    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }

    Ok(())
}
