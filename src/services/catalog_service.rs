use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

use crate::{dto::catalog::RomEntry, error::ServiceError};

/// List the playable titles in `dir`, sorted by file name.
///
/// The directory is created when missing so a fresh install serves an empty catalog.
pub async fn list_roms(dir: &Path) -> Result<Vec<RomEntry>, ServiceError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|err| ServiceError::io("unable to prepare catalog directory", err))?;

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|err| ServiceError::io("unable to scan files", err))?;

    let mut roms = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| ServiceError::io("unable to scan files", err))?
    {
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(err) => {
                debug!(path = %entry.path().display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !file_type.is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(rom) = RomEntry::from_filename(&file_name) {
            roms.push(rom);
        }
    }

    roms.sort_by(|a, b| a.filename.cmp(&b.filename));
    info!(dir = %dir.display(), count = roms.len(), "scanned catalog");
    Ok(roms)
}
