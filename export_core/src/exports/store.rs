use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs::{self as async_fs, File};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::sanitize::ExportName;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("export not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read export {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read-only view over the directory the export producer writes into.
#[derive(Debug, Clone)]
pub struct ExportStore {
    dir: Arc<Path>,
}

/// An opened export. The handle lives as long as this value or the stream
/// produced from it.
#[derive(Debug)]
pub struct ExportFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    file: File,
}

impl ExportFile {
    pub fn into_stream(self, chunk_size: usize) -> ReaderStream<File> {
        ReaderStream::with_capacity(self.file, chunk_size)
    }
}

impl ExportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir: PathBuf = dir.into();
        Self { dir: Arc::from(dir) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn resolve(&self, name: &ExportName<'_>) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn open(&self, name: &ExportName<'_>) -> Result<ExportFile, StoreError> {
        let path = self.resolve(name);

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Requested export does not exist");
                return Err(StoreError::NotFound { path });
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let metadata = match file.metadata().await {
            Ok(metadata) => metadata,
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if !metadata.is_file() {
            warn!(path = %path.display(), "Requested export is not a regular file");
            return Err(StoreError::NotFound { path });
        }

        debug!(path = %path.display(), size = metadata.len(), "Opened export");

        Ok(ExportFile {
            name: name.as_str().to_string(),
            path,
            size: metadata.len(),
            file,
        })
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        match async_fs::metadata(&self.dir).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Io {
                path: self.dir.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "export path is not a directory"),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                path: self.dir.to_path_buf(),
            }),
            Err(source) => Err(StoreError::Io {
                path: self.dir.to_path_buf(),
                source,
            }),
        }
    }
}
