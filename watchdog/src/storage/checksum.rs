//! Data file fingerprinting for deployment directories

use std::path::Path;
use std::time::UNIX_EPOCH;

use tokio::fs;

use crate::errors::WatchdogError;
use crate::utils::sha256_hash;

/// Checksum and newest data file of a deployment directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirFingerprint {
    pub checksum: Option<String>,
    pub latest_file: Option<String>,
}

/// Whether a file name looks like a netCDF data file (`.nc`, `.nc3`, `.ncCF.nc` ...)
pub fn is_data_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().starts_with("nc"))
        .unwrap_or(false)
}

struct DataFile {
    name: String,
    size: u64,
    mtime_nanos: u128,
}

/// Fingerprint the data files directly inside `dir`.
///
/// A missing directory has no fingerprint.
pub async fn fingerprint(dir: &Path) -> Result<DirFingerprint, WatchdogError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DirFingerprint::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !is_data_file(&name) {
            continue;
        }
        // dangling symlinks and files removed mid-scan are skipped
        let Ok(metadata) = fs::metadata(entry.path()).await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        files.push(DataFile {
            name,
            size: metadata.len(),
            mtime_nanos,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    let listing: String = files
        .iter()
        .map(|f| format!("{}:{}:{}\n", f.name, f.size, f.mtime_nanos))
        .collect();
    let checksum = sha256_hash(listing.as_bytes());

    let latest_file = files
        .iter()
        .max_by(|a, b| {
            a.mtime_nanos
                .cmp(&b.mtime_nanos)
                .then_with(|| a.name.cmp(&b.name))
        })
        .map(|f| f.name.clone());

    Ok(DirFingerprint {
        checksum: Some(checksum),
        latest_file,
    })
}
