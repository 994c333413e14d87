use std::{
    fs::File,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use jiff::Timestamp;

use crate::{
    audio::AudioFormat,
    error::{EngineError, Result},
};

/// Prefix of in-progress files; never served
const PARTIAL_PREFIX: &str = ".partial-";

/// A generated audio file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAudioFile {
    pub path: PathBuf,
    pub created: Timestamp,
    pub format: AudioFormat,
    pub mime_type: &'static str,
}

/// Flat directory of generated audio files
///
/// Presence of a file is the only cache metadata; there is no index. The
/// store never evicts. A hit refreshes the file's modification time so
/// that external housekeeping can expire files least-recently-used first.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    /// Open the store, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root)
            .map_err(|e| EngineError::storage(&format!("failed to create {}", root.display()), e))?;

        tracing::debug!(root = %root.display(), "audio store ready");

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).is_file()
    }

    /// Mark a file as recently used without touching its content
    ///
    /// Returns `false` when the file is gone, e.g. removed by housekeeping
    /// after an earlier [`AudioStore::exists`] check.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the timestamp cannot be updated
    pub fn touch(&self, filename: &str) -> Result<bool> {
        let path = self.path_for(filename);

        match File::options()
            .append(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now()))
        {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EngineError::storage(&format!("failed to touch {filename}"), e)),
        }
    }

    /// Encode and persist samples under `filename`
    ///
    /// The bytes go to a temporary file in the same directory which is then
    /// renamed into place, so readers see either the old file or the
    /// complete new one.
    ///
    /// # Errors
    ///
    /// Returns a storage error on encoding or I/O failure
    pub fn write(&self, filename: &str, samples: &[i16], sample_rate: u32, format: AudioFormat) -> Result<()> {
        let bytes = format.encode(samples, sample_rate)?;

        let mut partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|e| EngineError::storage("failed to create temporary file", e))?;

        partial
            .write_all(&bytes)
            .and_then(|()| partial.as_file().sync_all())
            .map_err(|e| EngineError::storage(&format!("failed to write {filename}"), e))?;

        partial
            .persist(self.path_for(filename))
            .map_err(|e| EngineError::storage(&format!("failed to move {filename} into place"), e.error))?;

        tracing::debug!(filename, bytes = bytes.len(), "wrote audio file");

        Ok(())
    }

    /// Metadata for a stored file
    ///
    /// Filesystems that do not record creation time report the last
    /// modification instead.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be inspected
    pub fn stat(&self, filename: &str, format: AudioFormat) -> Result<CachedAudioFile> {
        let path = self.path_for(filename);

        let metadata =
            std::fs::metadata(&path).map_err(|e| EngineError::storage(&format!("failed to stat {filename}"), e))?;

        let system_time = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| EngineError::storage(&format!("no timestamp for {filename}"), e))?;

        let created = Timestamp::try_from(system_time)
            .map_err(|e| EngineError::storage(&format!("timestamp out of range for {filename}"), e))?;

        Ok(CachedAudioFile {
            path,
            created,
            format,
            mime_type: format.mime_type(),
        })
    }

    /// Resolve a caller-supplied filename to a stored file
    ///
    /// Returns `None` for anything that is not a plain name of an existing
    /// file in the store, including in-progress temporary files.
    pub fn lookup(&self, filename: &str) -> Option<PathBuf> {
        let plain = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\'])
            && Path::new(filename).file_name().is_some_and(|name| name == filename);

        if !plain {
            return None;
        }

        let path = self.path_for(filename);
        path.is_file().then_some(path)
    }
}
