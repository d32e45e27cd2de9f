//! # Archive fetching
//!
//! Downloads a dataset archive over HTTP and extracts it into the dataset
//! root. Failures are logged rather than returned: the loader that follows
//! reports the missing files.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::DatasetConfig;
use crate::error::Result;

/// Archive container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

/// Make sure `root/dir_name` exists, downloading `url` when allowed
pub fn ensure_extracted(config: &DatasetConfig, dir_name: &str, url: &str, kind: ArchiveKind) {
    let target = config.root.join(dir_name);
    if target.exists() {
        debug!(path = %target.display(), "Dataset already present");
        return;
    }

    if !config.download {
        warn!(
            path = %target.display(),
            "Dataset missing and downloads are disabled"
        );
        return;
    }

    info!(url, root = %config.root.display(), "Downloading dataset...");
    match fetch_and_extract(url, &config.root, kind) {
        Ok(()) => info!(path = %target.display(), "Dataset downloaded and extracted successfully"),
        Err(e) => warn!(url, error = %e, "Failed to download dataset"),
    }
}

/// Download `url` and unpack it under `root`
#[cfg(feature = "download")]
pub fn fetch_and_extract(url: &str, root: &Path, kind: ArchiveKind) -> Result<()> {
    let body = fetch(url)?;
    debug!(bytes = body.len(), "Archive fetched");
    std::fs::create_dir_all(root)?;
    extract(&body, root, kind)
}

#[cfg(not(feature = "download"))]
pub fn fetch_and_extract(url: &str, _root: &Path, _kind: ArchiveKind) -> Result<()> {
    Err(crate::error::DataError::Download(format!(
        "cannot fetch {url}: built without the `download` feature"
    )))
}

#[cfg(feature = "download")]
fn fetch(url: &str) -> Result<Vec<u8>> {
    use std::io::Read;

    use crate::error::DataError;

    let response = match ureq::get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            return Err(DataError::Download(format!("GET {url} returned HTTP {code}")));
        }
        Err(e) => return Err(DataError::Download(format!("GET {url} failed: {e}"))),
    };

    if response.status() != 200 {
        return Err(DataError::Download(format!(
            "GET {url} returned HTTP {}",
            response.status()
        )));
    }

    let mut body = Vec::new();
    response.into_reader().read_to_end(&mut body)?;
    Ok(body)
}

/// Unpack an in-memory archive under `root`
#[cfg(feature = "download")]
pub fn extract(archive: &[u8], root: &Path, kind: ArchiveKind) -> Result<()> {
    match kind {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive))?;
            zip.extract(root)?;
        }
        ArchiveKind::TarGz => {
            let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
            tar.unpack(root)?;
        }
    }
    Ok(())
}
