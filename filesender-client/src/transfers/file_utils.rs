//! File system helpers for downloads

use std::io;
use std::path::{Path, PathBuf};

use crate::constants::PART_SUFFIX;

/// Attempts before giving up on finding a free name
const MAX_UNIQUE_ATTEMPTS: u32 = 1000;

/// Pick the final path for a download in `directory`
///
/// Uses `file_name` as-is when neither it nor its `.part` file exists,
/// otherwise the first free `name (N).ext`.
pub async fn resolve_destination(directory: &Path, file_name: &str) -> io::Result<PathBuf> {
    let candidate = directory.join(file_name);
    if is_free(&candidate).await {
        return Ok(candidate);
    }
    generate_unique_path(&candidate).await
}

/// Generate `name (N).ext` next to `original` that is not taken
pub async fn generate_unique_path(original: &Path) -> io::Result<PathBuf> {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let extension = original.extension().and_then(|s| s.to_str());
    let parent = original.parent();

    for i in 1..MAX_UNIQUE_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };

        let new_path = match parent {
            Some(parent) => parent.join(&new_name),
            None => PathBuf::from(&new_name),
        };

        if is_free(&new_path).await {
            return Ok(new_path);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {}", original.display()),
    ))
}

/// Neither the path nor its `.part` file exists
async fn is_free(path: &Path) -> bool {
    let mut part = path.as_os_str().to_owned();
    part.push(PART_SUFFIX);

    tokio::fs::metadata(path).await.is_err() && tokio::fs::metadata(&part).await.is_err()
}

/// Returns true if `path` is an existing directory
pub async fn is_directory(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
