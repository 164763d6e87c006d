use serde::Serialize;
use utoipa::ToSchema;

/// Extension a file must carry to be listed as a game title.
const ROM_EXTENSION: &str = ".nes";

/// One playable title found in the catalog directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RomEntry {
    /// File name relative to the catalog directory.
    pub filename: String,
    /// Display name: the file name without extension, underscores shown as spaces.
    pub name: String,
}

impl RomEntry {
    /// Build an entry when `filename` has the catalog extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let split = filename.len().checked_sub(ROM_EXTENSION.len())?;
        let (stem, extension) = (filename.get(..split)?, filename.get(split..)?);
        if !extension.eq_ignore_ascii_case(ROM_EXTENSION) {
            return None;
        }

        Some(Self {
            filename: filename.to_string(),
            name: stem.replace('_', " "),
        })
    }
}
