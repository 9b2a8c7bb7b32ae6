//! Device trait for abstracting MTP device access.
//!
//! This module provides the `Device` trait which abstracts the operations a
//! browsing UI needs from a device, enabling different backends (real MTP
//! hardware, a filesystem-backed simulator, an in-memory device for tests).
//!
//! # Path convention
//!
//! Paths are `/`-separated strings relative to the device root, without a
//! leading slash. A trailing `/` denotes a directory; a file never carries
//! one. This is the only structural marker crossing the device boundary;
//! listings do not transmit a separate directory flag.

use serde::{Deserialize, Serialize};

mod fs;
mod in_memory;
#[cfg(all(feature = "mtp-device", any(target_os = "macos", target_os = "linux")))]
mod mtp;

pub use fs::FsDevice;
pub use in_memory::InMemoryDevice;
#[cfg(all(feature = "mtp-device", any(target_os = "macos", target_os = "linux")))]
pub use mtp::UsbMtpDevice;

#[cfg(test)]
mod fs_test;
#[cfg(test)]
mod in_memory_test;

/// Information about a visible device, before any session is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedDevice {
    /// For example, "Pixel 8" or "Simulated device".
    pub friendly_name: String,
    /// Device-reported MTP version, or "Unknown".
    pub mtp_version: String,
}

/// Error type for device operations.
#[derive(Debug, Clone)]
pub enum DeviceError {
    /// Path not found
    NotFound(String),
    /// Permission denied
    PermissionDenied(String),
    /// Path already exists
    AlreadyExists(String),
    /// Operation not supported by this device
    NotSupported,
    /// Generic I/O error
    IoError(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Path not found: {}", path),
            Self::PermissionDenied(path) => write!(f, "Permission denied: {}", path),
            Self::AlreadyExists(path) => write!(f, "Already exists: {}", path),
            Self::NotSupported => write!(f, "Operation not supported"),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

/// Trait for device access.
///
/// Implementations provide the browsing operations over different backends:
/// - `UsbMtpDevice`: real hardware via mtp-rs (feature `mtp-device`)
/// - `FsDevice`: a local directory tree standing in for a device
/// - `InMemoryDevice`: in-memory device for tests and demos
///
/// Methods are synchronous and may block on device I/O; the controller only
/// ever calls them from a blocking worker, one call at a time. Implementors
/// therefore need `Send + Sync` but no internal serialization against
/// concurrent calls.
pub trait Device: Send + Sync {
    /// Enumerates visible devices without opening sessions.
    ///
    /// Returns an empty vector when nothing answers; enumeration failures
    /// degrade to empty rather than erroring.
    fn detect_devices(&self) -> Vec<DetectedDevice>;

    /// Returns a display string for the device.
    ///
    /// Degraded states come back as an error-marker string
    /// ("Error: ..."), never as a panic or an `Err`.
    fn device_info(&self) -> String;

    /// Returns the device-reported MTP version as a display string.
    fn device_version(&self) -> String;

    /// Total free space in bytes across all storages.
    ///
    /// 0 means unknown/unavailable, not a full device. Renderers must show
    /// "Unknown" for 0, never "0 MB".
    fn free_space(&self) -> u64;

    /// Lists all paths reachable under `path` as a flat sequence.
    ///
    /// Recursion into subdirectories happens here, inside the backend;
    /// callers treat the result as flat and pre-resolved. Directories carry
    /// a trailing `/`.
    fn list_files(&self, path: &str) -> Result<Vec<String>, DeviceError>;

    /// Reads a file's full contents.
    ///
    /// `Ok` with empty data is a successfully read empty file; a missing or
    /// unreadable file is an `Err`. The two are never conflated.
    fn read_file(&self, path: &str) -> Result<Vec<u8>, DeviceError>;

    /// Creates or overwrites a file with the given content.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), DeviceError>;

    /// Deletes a file.
    fn delete_file(&self, path: &str) -> Result<(), DeviceError>;

    /// Creates a directory (and missing parents, where the backend can).
    fn create_directory(&self, path: &str) -> Result<(), DeviceError>;

    /// Deletes a directory and everything under it.
    fn delete_directory(&self, path: &str) -> Result<(), DeviceError>;
}

/// Returns true if `path` denotes a directory under the trailing-slash
/// convention.
pub fn is_directory_path(path: &str) -> bool {
    path.ends_with('/')
}

/// Normalizes a path to the directory form (exactly one trailing `/`).
pub fn as_directory_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    format!("{}/", trimmed)
}

/// Strips the leading-slash and trailing-slash decorations, yielding the
/// bare relative form backends resolve against their root.
pub fn as_relative_path(path: &str) -> &str {
    path.trim_start_matches('/').trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_directory_path() {
        assert!(is_directory_path("DCIM/"));
        assert!(is_directory_path("DCIM/Photos/"));
        assert!(!is_directory_path("DCIM/Photos/image1.jpg"));
        assert!(!is_directory_path("notes.txt"));
        assert!(!is_directory_path(""));
    }

    #[test]
    fn test_as_directory_path_appends_single_slash() {
        assert_eq!(as_directory_path("DCIM"), "DCIM/");
        assert_eq!(as_directory_path("DCIM/"), "DCIM/");
        assert_eq!(as_directory_path("DCIM//"), "DCIM/");
    }

    #[test]
    fn test_as_relative_path_strips_decorations() {
        assert_eq!(as_relative_path("/DCIM/"), "DCIM");
        assert_eq!(as_relative_path("DCIM/Photos"), "DCIM/Photos");
        assert_eq!(as_relative_path("/"), "");
        assert_eq!(as_relative_path(""), "");
    }

    #[test]
    fn test_device_error_display() {
        assert_eq!(
            DeviceError::NotFound("a.txt".to_string()).to_string(),
            "Path not found: a.txt"
        );
        assert_eq!(DeviceError::NotSupported.to_string(), "Operation not supported");
    }

    #[test]
    fn test_device_error_from_io_error_kind() {
        let err: DeviceError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, DeviceError::NotFound(_)));

        let err: DeviceError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, DeviceError::PermissionDenied(_)));

        let err: DeviceError = std::io::Error::other("boom").into();
        assert!(matches!(err, DeviceError::IoError(_)));
    }

    #[test]
    fn test_detected_device_serialization() {
        let device = DetectedDevice {
            friendly_name: "Pixel 8".to_string(),
            mtp_version: "1.1".to_string(),
        };
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"friendlyName\":\"Pixel 8\""));
        assert!(json.contains("\"mtpVersion\":\"1.1\""));
    }
}
