//! Filesystem-backed device simulator.
//!
//! Stands in for real hardware by mapping the device's virtual paths onto a
//! local directory tree. Useful for development without a device plugged in,
//! and for exercising the full controller stack against real I/O in tests.

use super::{Device, DetectedDevice, DeviceError, as_relative_path};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Free space reported by the simulator (1 GiB).
///
/// A fixed value, like the simulated device it replaces; it only has to be
/// non-zero so renderers don't show "Unknown".
const SIMULATED_FREE_SPACE_BYTES: u64 = 1024 * 1024 * 1024;

/// A device backed by a local directory tree.
///
/// Virtual device paths resolve relative to the configured root. The root
/// itself is never exposed in listings and cannot be deleted.
pub struct FsDevice {
    name: String,
    root: PathBuf,
}

impl FsDevice {
    /// Creates a simulator with the given display name and root directory.
    ///
    /// The root directory is created if it does not exist yet.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self, DeviceError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { name: name.into(), root })
    }

    /// Returns the simulator's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a virtual device path to an absolute path under the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let rel = as_relative_path(path);
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }
}

impl Device for FsDevice {
    fn detect_devices(&self) -> Vec<DetectedDevice> {
        vec![DetectedDevice {
            friendly_name: self.name.clone(),
            mtp_version: "1.0".to_string(),
        }]
    }

    fn device_info(&self) -> String {
        self.name.clone()
    }

    fn device_version(&self) -> String {
        "MTP Version: 1.0 (simulated)".to_string()
    }

    fn free_space(&self) -> u64 {
        SIMULATED_FREE_SPACE_BYTES
    }

    fn list_files(&self, path: &str) -> Result<Vec<String>, DeviceError> {
        let rel = as_relative_path(path);
        let base = self.resolve(path);
        if !base.is_dir() {
            return Err(DeviceError::NotFound(path.to_string()));
        }

        let prefix = if rel.is_empty() {
            String::new()
        } else {
            format!("{}/", rel)
        };

        let mut result = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| DeviceError::IoError(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(&base)
                .map_err(|e| DeviceError::IoError(e.to_string()))?;
            // Join components with '/' so listings are platform-independent
            let components: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            let mut virtual_path = format!("{}{}", prefix, components.join("/"));
            if entry.file_type().is_dir() {
                virtual_path.push('/');
            }
            result.push(virtual_path);
        }
        Ok(result)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, DeviceError> {
        let abs = self.resolve(path);
        Ok(std::fs::read(&abs)?)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), DeviceError> {
        let abs = self.resolve(path);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&abs, data)?;
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<(), DeviceError> {
        let abs = self.resolve(path);
        std::fs::remove_file(&abs)?;
        Ok(())
    }

    fn create_directory(&self, path: &str) -> Result<(), DeviceError> {
        let abs = self.resolve(path);
        std::fs::create_dir_all(&abs)?;
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> Result<(), DeviceError> {
        if as_relative_path(path).is_empty() {
            // The root is the device, not a directory on it
            return Err(DeviceError::PermissionDenied(path.to_string()));
        }
        let abs = self.resolve(path);
        if !abs.is_dir() {
            return Err(DeviceError::NotFound(path.to_string()));
        }
        std::fs::remove_dir_all(&abs)?;
        Ok(())
    }
}
