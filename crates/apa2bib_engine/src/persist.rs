use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("bibliography path is not usable: {0}")]
    Target(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Appends BibTeX entries to a `.bib` file.
///
/// Every append rewrites the whole file through a temp file in the same
/// directory followed by a rename, so readers never see a half-written entry.
pub struct BibFileWriter {
    path: PathBuf,
}

impl BibFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &str) -> Result<(), PersistError> {
        let dir = self.parent_dir()?;
        let existing = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        let mut content = existing.trim_end().to_string();
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(entry.trim());
        content.push('\n');

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }

    fn parent_dir(&self) -> Result<PathBuf, PersistError> {
        if self.path.is_dir() {
            return Err(PersistError::Target("path is a directory".into()));
        }
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| PersistError::Target(e.to_string()))?;
        }
        Ok(dir)
    }
}
