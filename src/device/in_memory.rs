//! In-memory device implementation.
//!
//! Backs the browsing stack without hardware or a filesystem: tests drive it
//! directly, and the shell falls back to the canned demo tree when no root
//! directory is given.

use super::{Device, DetectedDevice, DeviceError, as_directory_path, as_relative_path};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// Default free space reported by a fresh in-memory device (64 GB).
const DEFAULT_FREE_SPACE_BYTES: u64 = 64_000_000_000;

#[derive(Default)]
struct State {
    /// File path -> contents. Keys never carry a trailing slash.
    files: BTreeMap<String, Vec<u8>>,
    /// Directory paths in trailing-slash form ("DCIM/", "DCIM/Photos/").
    directories: BTreeSet<String>,
    free_space: u64,
    read_only: bool,
}

/// A device held entirely in memory.
pub struct InMemoryDevice {
    name: String,
    state: RwLock<State>,
}

impl InMemoryDevice {
    /// Creates an empty device with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(State {
                free_space: DEFAULT_FREE_SPACE_BYTES,
                ..State::default()
            }),
        }
    }

    /// Creates a device pre-populated with the given files.
    ///
    /// Parent directories are registered automatically.
    pub fn with_files(name: impl Into<String>, files: &[(&str, &[u8])]) -> Self {
        let device = Self::new(name);
        {
            let mut state = device.state.write().unwrap();
            for (path, data) in files {
                let path = as_relative_path(path).to_string();
                register_parents(&mut state.directories, &path);
                state.files.insert(path, data.to_vec());
            }
        }
        device
    }

    /// Creates the canned demo device: the fixed tree the app shows when no
    /// hardware answers.
    pub fn demo() -> Self {
        let device = Self::with_files(
            "Demo device",
            &[
                ("DCIM/Photos/image1.jpg", b"\xff\xd8\xff\xe0 demo image 1".as_slice()),
                ("DCIM/Photos/image2.jpg", b"\xff\xd8\xff\xe0 demo image 2".as_slice()),
                ("Documents/file1.txt", b"demo document one".as_slice()),
                ("Documents/file2.txt", b"demo document two".as_slice()),
                ("test.txt", b"demo test file".as_slice()),
            ],
        );
        {
            let mut state = device.state.write().unwrap();
            state.directories.insert("DCIM/Videos/".to_string());
            state.directories.insert("Music/".to_string());
        }
        device
    }

    /// Marks every mutating operation as rejected, like a read-only storage.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.write().unwrap().read_only = read_only;
    }

    /// Overrides the reported free space (0 renders as "Unknown").
    pub fn set_free_space(&self, bytes: u64) {
        self.state.write().unwrap().free_space = bytes;
    }

    fn check_writable(state: &State, path: &str) -> Result<(), DeviceError> {
        if state.read_only {
            Err(DeviceError::PermissionDenied(path.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Registers every ancestor of `path` as a directory.
fn register_parents(directories: &mut BTreeSet<String>, path: &str) {
    for (idx, ch) in path.char_indices() {
        if ch == '/' {
            directories.insert(path[..=idx].to_string());
        }
    }
}

impl Device for InMemoryDevice {
    fn detect_devices(&self) -> Vec<DetectedDevice> {
        vec![DetectedDevice {
            friendly_name: self.name.clone(),
            mtp_version: "1.1".to_string(),
        }]
    }

    fn device_info(&self) -> String {
        self.name.clone()
    }

    fn device_version(&self) -> String {
        "MTP Version: 1.1".to_string()
    }

    fn free_space(&self) -> u64 {
        self.state.read().unwrap().free_space
    }

    fn list_files(&self, path: &str) -> Result<Vec<String>, DeviceError> {
        let rel = as_relative_path(path);
        let prefix = if rel.is_empty() {
            String::new()
        } else {
            as_directory_path(rel)
        };

        let state = self.state.read().unwrap();
        if !prefix.is_empty() && !state.directories.contains(&prefix) {
            return Err(DeviceError::NotFound(path.to_string()));
        }

        let mut result: Vec<String> = state
            .directories
            .iter()
            .filter(|dir| *dir != &prefix && dir.starts_with(&prefix))
            .cloned()
            .chain(
                state
                    .files
                    .keys()
                    .filter(|file| file.starts_with(&prefix))
                    .cloned(),
            )
            .collect();
        result.sort();
        Ok(result)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, DeviceError> {
        let key = as_relative_path(path);
        self.state
            .read()
            .unwrap()
            .files
            .get(key)
            .cloned()
            .ok_or_else(|| DeviceError::NotFound(path.to_string()))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), DeviceError> {
        let key = as_relative_path(path).to_string();
        let mut state = self.state.write().unwrap();
        Self::check_writable(&state, path)?;
        register_parents(&mut state.directories, &key);
        state.files.insert(key, data.to_vec());
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<(), DeviceError> {
        let key = as_relative_path(path);
        let mut state = self.state.write().unwrap();
        Self::check_writable(&state, path)?;
        state
            .files
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| DeviceError::NotFound(path.to_string()))
    }

    fn create_directory(&self, path: &str) -> Result<(), DeviceError> {
        let rel = as_relative_path(path);
        let mut state = self.state.write().unwrap();
        Self::check_writable(&state, path)?;
        if rel.is_empty() {
            // The root always exists; creating it again is a no-op
            return Ok(());
        }
        let dir = as_directory_path(rel);
        register_parents(&mut state.directories, dir.trim_end_matches('/'));
        state.directories.insert(dir);
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> Result<(), DeviceError> {
        let rel = as_relative_path(path);
        if rel.is_empty() {
            // The root is the device, not a directory on it
            return Err(DeviceError::PermissionDenied(path.to_string()));
        }
        let dir = as_directory_path(rel);
        let mut state = self.state.write().unwrap();
        Self::check_writable(&state, path)?;
        if !state.directories.remove(&dir) {
            return Err(DeviceError::NotFound(path.to_string()));
        }
        state.directories.retain(|d| !d.starts_with(&dir));
        state.files.retain(|f, _| !f.starts_with(&dir));
        Ok(())
    }
}
