//! Storage service - uploaded CSV content
//!
//! Uploaded files are copied under `<dir>/uploads` with a generated name so
//! an import always works on a stable snapshot of the file.

use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;
use uuid::Uuid;

use crate::domain::result::{Error, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Service storing and retrieving upload content
pub struct StorageService {
    upload_dir: PathBuf,
}

impl StorageService {
    pub fn new(dir: &Path) -> Self {
        Self {
            upload_dir: dir.join("uploads"),
        }
    }

    /// Store content and return the name to retrieve it by
    pub fn store_content(&self, content: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.upload_dir)?;
        let name = format!("{}.csv", Uuid::new_v4());
        std::fs::write(self.upload_dir.join(&name), content)?;
        tracing::debug!("stored {} bytes as {}", content.len(), name);
        Ok(name)
    }

    /// Get stored content as text
    ///
    /// With `convert`, content that is not valid UTF-8 is decoded as
    /// Windows-1252 instead of being rejected.
    pub fn get_content(&self, name: &str, convert: bool) -> Result<String> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(Error::not_found(format!("stored upload '{}'", name)));
        }
        let bytes = std::fs::read(&path)?;
        decode_content(&bytes, convert)
    }

    /// Remove stored content
    pub fn delete_content(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        // Names are generated by store_content; anything else is refused
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::validation(format!("invalid upload name '{}'", name)));
        }
        Ok(self.upload_dir.join(name))
    }
}

/// Decode raw CSV bytes into text, stripping a UTF-8 byte order mark
pub fn decode_content(bytes: &[u8], convert: bool) -> Result<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(e) if convert => {
            tracing::info!("content is not UTF-8 ({}), converting from Windows-1252", e);
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            Ok(text.into_owned())
        }
        Err(e) => Err(Error::validation(format!(
            "file is not valid UTF-8 ({}); enable encoding conversion to import it",
            e
        ))),
    }
}
