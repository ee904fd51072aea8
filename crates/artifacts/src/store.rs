use std::fs::{File, OpenOptions};
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};

use betadrop_protocol::{ArtifactKey, ArtifactKind};
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};

use crate::ArtifactError;

/// Computes SHA-256 of a byte slice and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A file durably written by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Resolves [`ArtifactKey`]s to files under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Opens the store, creating `app/` and `icon/` under `root` if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        for dir in [ArtifactKind::PACKAGE_DIR, ArtifactKind::ICON_DIR] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the artifact lives at; the file may not exist yet.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.kind.dir_name()).join(key.file_name())
    }

    /// Writes package bytes under a fresh key and fsyncs them.
    pub fn write_package(&self, key: &ArtifactKey, data: &[u8]) -> Result<StoredFile, ArtifactError> {
        let path = self.path_for(key);
        write_once(&path, data)?;
        tracing::debug!(path = %path.display(), size = data.len(), "package staged");
        Ok(StoredFile {
            path,
            size: data.len() as u64,
            sha256: checksum_bytes(data),
        })
    }

    /// PNG-encodes `icon` and writes it under `<root>/icon/<id>.png`.
    pub fn write_icon(&self, id: &str, icon: &DynamicImage) -> Result<StoredFile, ArtifactError> {
        let key = ArtifactKey {
            id: id.to_string(),
            kind: ArtifactKind::Icon,
        };
        let mut png = Vec::new();
        icon.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let path = self.path_for(&key);
        write_once(&path, &png)?;
        Ok(StoredFile {
            path,
            size: png.len() as u64,
            sha256: checksum_bytes(&png),
        })
    }

    /// Opens an artifact for streaming, returning the handle and its length.
    pub fn open_file(&self, key: &ArtifactKey) -> Result<(File, u64), ArtifactError> {
        let not_found = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => ArtifactError::NotFound(key.file_name()),
            _ => ArtifactError::Io(e),
        };
        let file = File::open(self.path_for(key)).map_err(not_found)?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(ArtifactError::NotFound(key.file_name()));
        }
        Ok((file, meta.len()))
    }

    pub fn exists(&self, key: &ArtifactKey) -> bool {
        self.path_for(key).is_file()
    }
}

/// Creates `path` exclusively, writes `data` and syncs it to disk.
///
/// A partially written file is removed before the error is returned.
fn write_once(path: &Path, data: &[u8]) -> Result<(), ArtifactError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(ArtifactError::AlreadyExists(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = write_and_sync(&mut file, data) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}

fn write_and_sync(file: &mut File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data)?;
    file.sync_all()
}
