use std::{fs, path::PathBuf};

use tracing::{info, warn};

/// Saves exported bytes somewhere the user can find them. Best effort: there
/// is no failure path back to the caller.
pub trait Exporter: Send + Sync {
    fn export(&self, file_name: &str, bytes: &[u8]);
}

pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl Exporter for FileExporter {
    fn export(&self, file_name: &str, bytes: &[u8]) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), "could not prepare export directory: {err}");
            return;
        }

        let path = self.dir.join(file_name);
        match fs::write(&path, bytes) {
            Ok(()) => info!(path = %path.display(), bytes = bytes.len(), "exported translated image"),
            Err(err) => warn!(path = %path.display(), "failed to export translated image: {err}"),
        }
    }
}
