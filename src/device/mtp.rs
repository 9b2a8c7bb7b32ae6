//! Real MTP hardware backend via mtp-rs.
//!
//! Opens the device for each call and releases it when the call completes,
//! so no session is pinned between operations and an unplugged device is
//! noticed on the next call rather than wedging a long-lived handle. Paths
//! resolve to object handles by walking listings from the storage root.
//!
//! Only compiled with the `mtp-device` feature on macOS/Linux; the rest of
//! the crate runs against the simulators.

use super::{Device, DetectedDevice, DeviceError, as_relative_path};
use log::{debug, warn};
use mtp_rs::ptp::{ObjectFormatCode, ResponseCode};
use mtp_rs::{MtpDevice, MtpDeviceBuilder, NewObjectInfo, ObjectHandle};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Default timeout for MTP operations (30 seconds - some devices are slow).
const MTP_TIMEOUT_SECS: u64 = 30;

/// Info string used when no device answers, matching the degraded-state
/// contract (an error marker, not an error value).
const NO_DEVICE_INFO: &str = "Error: No device found or failed to open";

/// A `Device` backed by real hardware through mtp-rs.
///
/// The underlying crate is async; this adapter bridges it onto the blocking
/// `Device` trait with a private single-threaded runtime, since the
/// controller already calls trait methods from a blocking worker.
pub struct UsbMtpDevice {
    location_id: u64,
    timeout: Duration,
    runtime: Runtime,
}

impl UsbMtpDevice {
    /// Creates an adapter for the device at the given USB location.
    pub fn new(location_id: u64) -> Result<Self, DeviceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DeviceError::IoError(e.to_string()))?;
        Ok(Self {
            location_id,
            timeout: Duration::from_secs(MTP_TIMEOUT_SECS),
            runtime,
        })
    }

    async fn open(&self) -> Result<MtpDevice, DeviceError> {
        debug!("opening MTP device at location {}", self.location_id);
        MtpDeviceBuilder::new()
            .timeout(self.timeout)
            .open_by_location(self.location_id)
            .await
            .map_err(map_mtp_error)
    }
}

async fn first_storage(device: &MtpDevice) -> Result<mtp_rs::Storage, DeviceError> {
    let mut storages = device.storages().await.map_err(map_mtp_error)?;
    if storages.is_empty() {
        return Err(DeviceError::NotFound("no storage on device".to_string()));
    }
    Ok(storages.remove(0))
}

/// Resolves a path to its object on the device by walking listings.
///
/// Returns `None` for the storage root.
async fn resolve_object(
    storage: &mtp_rs::Storage,
    path: &str,
) -> Result<Option<(ObjectHandle, bool)>, DeviceError> {
    let rel = as_relative_path(path);
    if rel.is_empty() {
        return Ok(None);
    }
    let mut parent: Option<ObjectHandle> = None;
    let mut resolved = None;
    for component in rel.split('/') {
        let objects = storage.list_objects(parent).await.map_err(map_mtp_error)?;
        let found = objects
            .into_iter()
            .find(|info| info.filename == component)
            .ok_or_else(|| DeviceError::NotFound(path.to_string()))?;
        let is_dir = found.format == ObjectFormatCode::Association;
        parent = Some(found.handle);
        resolved = Some((found.handle, is_dir));
    }
    Ok(resolved)
}

/// Splits a relative path into its parent directory and final component.
fn split_parent(rel: &str) -> (&str, &str) {
    match rel.rfind('/') {
        Some(idx) => (&rel[..idx], &rel[idx + 1..]),
        None => ("", rel),
    }
}

fn map_mtp_error(e: mtp_rs::Error) -> DeviceError {
    match e {
        mtp_rs::Error::NoDevice => DeviceError::NotFound("no MTP device found".to_string()),
        mtp_rs::Error::Protocol { code, operation } => match code {
            ResponseCode::StoreReadOnly | ResponseCode::AccessDenied => {
                DeviceError::PermissionDenied(format!("(operation: {:?})", operation))
            }
            ResponseCode::InvalidObjectHandle | ResponseCode::InvalidParentObject => {
                DeviceError::NotFound(format!("(operation: {:?})", operation))
            }
            ResponseCode::StoreFull => DeviceError::IoError("storage full".to_string()),
            _ => DeviceError::IoError(format!("protocol error: {:?}", code)),
        },
        other => DeviceError::IoError(other.to_string()),
    }
}

impl Device for UsbMtpDevice {
    fn detect_devices(&self) -> Vec<DetectedDevice> {
        match MtpDevice::list_devices() {
            Ok(devices) => devices
                .into_iter()
                .map(|d| DetectedDevice {
                    friendly_name: format!("MTP device ({:04x}:{:04x})", d.vendor_id, d.product_id),
                    // String descriptors would require opening the device
                    mtp_version: "Unknown".to_string(),
                })
                .collect(),
            Err(e) => {
                warn!("failed to enumerate MTP devices: {}", e);
                Vec::new()
            }
        }
    }

    fn device_info(&self) -> String {
        let result: Result<String, DeviceError> = self.runtime.block_on(async {
            let device = self.open().await?;
            let info = device.device_info();
            Ok(format!("{} {}", info.manufacturer, info.model).trim().to_string())
        });
        match result {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => "Unknown Device".to_string(),
            Err(err) => {
                warn!("device info unavailable: {}", err);
                NO_DEVICE_INFO.to_string()
            }
        }
    }

    fn device_version(&self) -> String {
        let result: Result<String, DeviceError> = self.runtime.block_on(async {
            let device = self.open().await?;
            let info = device.device_info();
            Ok(info.device_version.clone())
        });
        match result {
            Ok(version) if !version.is_empty() => format!("MTP Version: {}", version),
            Ok(_) => "MTP Version: Unknown".to_string(),
            Err(err) => {
                warn!("device version unavailable: {}", err);
                NO_DEVICE_INFO.to_string()
            }
        }
    }

    fn free_space(&self) -> u64 {
        let result: Result<u64, DeviceError> = self.runtime.block_on(async {
            let device = self.open().await?;
            let storages = device.storages().await.map_err(map_mtp_error)?;
            let mut free = 0u64;
            for storage in &storages {
                let info = storage.info();
                if info.max_capacity > 0 {
                    free += info.free_space_bytes;
                }
            }
            Ok(free)
        });
        match result {
            Ok(free) => free,
            Err(err) => {
                // 0 is the "unknown" sentinel for free space
                warn!("free space unavailable: {}", err);
                0
            }
        }
    }

    fn list_files(&self, path: &str) -> Result<Vec<String>, DeviceError> {
        self.runtime.block_on(async {
            let device = self.open().await?;
            let storage = first_storage(&device).await?;

            let start = match resolve_object(&storage, path).await? {
                None => None,
                Some((handle, true)) => Some(handle),
                Some((_, false)) => return Err(DeviceError::NotFound(path.to_string())),
            };

            let rel = as_relative_path(path);
            let root_prefix = if rel.is_empty() {
                String::new()
            } else {
                format!("{}/", rel)
            };

            let mut files = Vec::new();
            let mut stack = vec![(start, root_prefix)];
            while let Some((parent, prefix)) = stack.pop() {
                let objects = storage.list_objects(parent).await.map_err(map_mtp_error)?;
                for info in objects {
                    if info.format == ObjectFormatCode::Association {
                        let dir_path = format!("{}{}/", prefix, info.filename);
                        files.push(dir_path.clone());
                        stack.push((Some(info.handle), dir_path));
                    } else {
                        files.push(format!("{}{}", prefix, info.filename));
                    }
                }
            }
            files.sort();
            Ok(files)
        })
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, DeviceError> {
        self.runtime.block_on(async {
            let device = self.open().await?;
            let storage = first_storage(&device).await?;
            let (handle, is_dir) = resolve_object(&storage, path)
                .await?
                .ok_or_else(|| DeviceError::NotFound(path.to_string()))?;
            if is_dir {
                return Err(DeviceError::IoError(format!("not a file: {}", path)));
            }

            let mut download = storage.download_stream(handle).await.map_err(map_mtp_error)?;
            let mut data = Vec::new();
            while let Some(chunk) = download.next_chunk().await {
                let chunk = chunk.map_err(map_mtp_error)?;
                data.extend_from_slice(&chunk);
            }
            Ok(data)
        })
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), DeviceError> {
        self.runtime.block_on(async {
            let device = self.open().await?;
            let storage = first_storage(&device).await?;

            let rel = as_relative_path(path);
            let (parent_path, filename) = split_parent(rel);
            if filename.is_empty() {
                return Err(DeviceError::IoError(format!("not a file: {}", path)));
            }
            let parent = match resolve_object(&storage, parent_path).await? {
                None => None,
                Some((handle, true)) => Some(handle),
                Some((_, false)) => return Err(DeviceError::NotFound(parent_path.to_string())),
            };

            let object_info = NewObjectInfo::file(filename, data.len() as u64);
            // Single-chunk stream; iter's items are ready, making it Unpin
            let data_stream =
                futures_util::stream::iter(vec![Ok::<_, std::io::Error>(bytes::Bytes::copy_from_slice(data))]);
            storage
                .upload(parent, object_info, data_stream)
                .await
                .map_err(map_mtp_error)?;
            Ok(())
        })
    }

    fn delete_file(&self, path: &str) -> Result<(), DeviceError> {
        self.runtime.block_on(async {
            let device = self.open().await?;
            let storage = first_storage(&device).await?;
            let (handle, is_dir) = resolve_object(&storage, path)
                .await?
                .ok_or_else(|| DeviceError::NotFound(path.to_string()))?;
            if is_dir {
                return Err(DeviceError::IoError(format!("not a file: {}", path)));
            }
            storage.delete(handle).await.map_err(map_mtp_error)
        })
    }

    fn create_directory(&self, path: &str) -> Result<(), DeviceError> {
        self.runtime.block_on(async {
            let device = self.open().await?;
            let storage = first_storage(&device).await?;

            let rel = as_relative_path(path);
            let (parent_path, name) = split_parent(rel);
            if name.is_empty() {
                return Err(DeviceError::IoError(format!("not a directory name: {}", path)));
            }
            let parent = match resolve_object(&storage, parent_path).await? {
                None => None,
                Some((handle, true)) => Some(handle),
                Some((_, false)) => return Err(DeviceError::NotFound(parent_path.to_string())),
            };
            storage
                .create_folder(parent, name)
                .await
                .map_err(map_mtp_error)?;
            Ok(())
        })
    }

    fn delete_directory(&self, path: &str) -> Result<(), DeviceError> {
        self.runtime.block_on(async {
            let device = self.open().await?;
            let storage = first_storage(&device).await?;
            let (handle, is_dir) = resolve_object(&storage, path)
                .await?
                .ok_or_else(|| DeviceError::NotFound(path.to_string()))?;
            if !is_dir {
                return Err(DeviceError::IoError(format!("not a directory: {}", path)));
            }

            // Folders must be empty before deletion, so walk the subtree and
            // delete children before their parents
            let mut to_delete = vec![handle];
            let mut queue = vec![handle];
            while let Some(parent) = queue.pop() {
                let children = storage.list_objects(Some(parent)).await.map_err(map_mtp_error)?;
                for child in children {
                    to_delete.push(child.handle);
                    if child.format == ObjectFormatCode::Association {
                        queue.push(child.handle);
                    }
                }
            }
            for handle in to_delete.into_iter().rev() {
                storage.delete(handle).await.map_err(map_mtp_error)?;
            }
            Ok(())
        })
    }
}
