use crate::error::IngestError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Lazy, single-pass walk over every regular file below a root directory.
///
/// Entries inside one directory are visited in file-name order, so two walks
/// over the same snapshot yield the same sequence.
pub struct FileScanner {
    root: PathBuf,
    entries: walkdir::IntoIter,
}

impl FileScanner {
    pub fn new(root: &Path) -> Result<Self, IngestError> {
        if !root.is_dir() {
            return Err(IngestError::RootNotFound(root.to_path_buf()));
        }

        let root = std::path::absolute(root)
            .map_err(|_| IngestError::RootNotFound(root.to_path_buf()))?;
        let entries = WalkDir::new(&root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        Ok(Self { root, entries })
    }
}

impl Iterator for FileScanner {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(root = %self.root.display(), %error, "skipping unreadable entry");
                    continue;
                }
            };

            let file_type = entry.file_type();
            let is_file = if file_type.is_symlink() {
                // follows the link target, directories behind links are not descended
                entry.path().is_file()
            } else {
                file_type.is_file()
            };

            if is_file {
                return Some(entry.into_path());
            }
        }
    }
}
