//! The asynchronous device controller (view-model).
//!
//! Owns exactly one device handle and serializes every operation against it
//! through a single-flight busy gate. Callers fire operations and get results
//! back as [`ControllerEvent`] notifications; nothing here ever blocks the
//! caller or lets a device error escape as a panic or a `Result`.
//!
//! ## Gate protocol
//!
//! - Any operation entry flips the gate `Idle -> Busy`, or is rejected
//!   synchronously with an `OperationFailed` notification naming the skipped
//!   operation. Rejected operations never run and change no state.
//! - Accepted work runs the device call on a blocking worker under a
//!   deadline.
//! - Mutating operations that succeed refresh the file listing *before* the
//!   gate is released, so observers never see a stale list after a reported
//!   success.
//! - Every terminal path (success, device failure, deadline expiry)
//!   releases the gate exactly once.

mod events;

pub use events::ControllerEvent;


use crate::device::{Device, DeviceError, as_directory_path, is_directory_path};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

/// Default deadline for a dispatched device call (some devices are slow).
const DEVICE_TIMEOUT_SECS: u64 = 30;

/// Capacity of the notification channel. Slow subscribers that fall further
/// behind than this see a lag error from the broadcast receiver.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Renders a free-space byte count for display.
///
/// 0 means the device could not report free space, so it renders as
/// "Unknown" rather than "0 MB". Everything else is whole mebibytes,
/// truncated toward zero.
pub fn format_free_space(bytes: u64) -> String {
    if bytes == 0 {
        "Unknown".to_string()
    } else {
        format!("{} MB", bytes / (1024 * 1024))
    }
}

/// State cached from the device by refresh completions.
///
/// Written only by the completion handler of the operation holding the gate;
/// read by the synchronous accessors between refreshes.
struct Snapshot {
    device_info: String,
    free_space: String,
    file_list: Vec<String>,
}

/// How a dispatched call failed before producing a device result.
enum DispatchError {
    /// The deadline expired. The abandoned call keeps running on its worker
    /// thread until it returns; only the gate and the caller give up on it.
    TimedOut,
    /// The blocking task itself died (panic in a device backend).
    TaskFailed,
}

struct Inner {
    device: Arc<dyn Device>,
    busy: AtomicBool,
    events: broadcast::Sender<ControllerEvent>,
    snapshot: RwLock<Snapshot>,
    op_timeout: Duration,
}

/// Single-flight asynchronous view-model over one device handle.
///
/// Cheap to clone; clones share the gate, the snapshot, and the notification
/// channel. Must be created and used within a Tokio runtime.
pub struct DeviceController {
    inner: Arc<Inner>,
}

impl Clone for DeviceController {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl DeviceController {
    /// Creates a controller bound to `device` and starts the initial full
    /// refresh.
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self::with_timeout(device, Duration::from_secs(DEVICE_TIMEOUT_SECS))
    }

    /// Like [`DeviceController::new`] with an explicit per-call deadline.
    pub fn with_timeout(device: Arc<dyn Device>, op_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let controller = Self {
            inner: Arc::new(Inner {
                device,
                busy: AtomicBool::new(false),
                events,
                snapshot: RwLock::new(Snapshot {
                    device_info: "Initializing...".to_string(),
                    free_space: "N/A".to_string(),
                    file_list: Vec::new(),
                }),
                op_timeout,
            }),
        };
        controller.refresh_device();
        controller
    }

    /// Subscribes to controller notifications.
    ///
    /// Events published before the subscription (including the construction
    /// refresh, if it already completed) are not replayed; read the current
    /// state through the accessors instead.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.inner.events.subscribe()
    }

    /// Device display string from the last refresh.
    pub fn device_info(&self) -> String {
        self.inner.snapshot.read().unwrap().device_info.clone()
    }

    /// Rendered free space ("123 MB" or "Unknown") from the last refresh.
    pub fn free_space(&self) -> String {
        self.inner.snapshot.read().unwrap().free_space.clone()
    }

    /// Flat file listing from the last refresh.
    pub fn file_list(&self) -> Vec<String> {
        self.inner.snapshot.read().unwrap().file_list.clone()
    }

    /// Whether an operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Refreshes device info, free space, and the file listing.
    ///
    /// Always publishes whatever the device reports: a device in a degraded
    /// state yields an error-marker info string and "Unknown" free space,
    /// not a failure notification.
    pub fn refresh_device(&self) {
        let inner = Arc::clone(&self.inner);
        if !inner.try_acquire("Refresh device") {
            return;
        }
        tokio::spawn(async move {
            inner.refresh_device_task().await;
            inner.release();
        });
    }

    /// Refreshes only the file listing.
    pub fn refresh_file_list(&self) {
        let inner = Arc::clone(&self.inner);
        if !inner.try_acquire("Refresh file list") {
            return;
        }
        tokio::spawn(async move {
            inner.refresh_file_list_task().await;
            inner.release();
        });
    }

    /// Reads a file; publishes `FileRead` with its contents (possibly empty)
    /// or `OperationFailed` if the device cannot produce it.
    pub fn read_file(&self, path: impl Into<String>) {
        let path = path.into();
        if is_directory_path(&path) {
            debug!("read rejected, directory path: {}", path);
            self.inner.publish_failure(format!("Failed to read file: {}", path));
            return;
        }
        let inner = Arc::clone(&self.inner);
        if !inner.try_acquire(&format!("Read {}", path)) {
            return;
        }
        tokio::spawn(async move {
            inner.read_file_task(path).await;
            inner.release();
        });
    }

    /// Writes a file, then refreshes the listing on success.
    pub fn write_file(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        if is_directory_path(&path) {
            debug!("write rejected, directory path: {}", path);
            self.inner.publish_failure(format!("Failed to write file: {}", path));
            return;
        }
        let data = data.into();
        let device_path = path.clone();
        self.run_mutation(
            format!("Write {}", path),
            format!("Failed to write file: {}", path),
            move |device| device.write_file(&device_path, &data),
        );
    }

    /// Deletes a file, then refreshes the listing on success.
    pub fn delete_file(&self, path: impl Into<String>) {
        let path = path.into();
        if is_directory_path(&path) {
            debug!("delete rejected, directory path: {}", path);
            self.inner.publish_failure(format!("Failed to delete file: {}", path));
            return;
        }
        let device_path = path.clone();
        self.run_mutation(
            format!("Delete {}", path),
            format!("Failed to delete file: {}", path),
            move |device| device.delete_file(&device_path),
        );
    }

    /// Creates a directory, then refreshes the listing on success.
    ///
    /// Accepts the path with or without its trailing slash.
    pub fn create_directory(&self, path: impl Into<String>) {
        let path = as_directory_path(&path.into());
        let device_path = path.clone();
        self.run_mutation(
            format!("Create directory {}", path),
            format!("Failed to create directory: {}", path),
            move |device| device.create_directory(&device_path),
        );
    }

    /// Deletes a directory and its contents, then refreshes the listing on
    /// success.
    pub fn delete_directory(&self, path: impl Into<String>) {
        let path = as_directory_path(&path.into());
        let device_path = path.clone();
        self.run_mutation(
            format!("Delete directory {}", path),
            format!("Failed to delete directory: {}", path),
            move |device| device.delete_directory(&device_path),
        );
    }

    /// Gate-then-dispatch for all mutating operations.
    fn run_mutation<F>(&self, context: String, failure_message: String, op: F)
    where
        F: FnOnce(&dyn Device) -> Result<(), DeviceError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        if !inner.try_acquire(&context) {
            return;
        }
        tokio::spawn(async move {
            inner.mutation_task(&context, failure_message, op).await;
            inner.release();
        });
    }
}

impl Inner {
    /// Flips the gate `Idle -> Busy`, or rejects with a failure notification
    /// naming the skipped operation.
    fn try_acquire(&self, context: &str) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.events.send(ControllerEvent::BusyChanged { busy: true });
            true
        } else {
            debug!("controller busy, operation skipped: {}", context);
            self.publish_failure(format!(
                "Operation skipped: Another operation is in progress. ({})",
                context
            ));
            false
        }
    }

    /// Returns the gate to `Idle`; publishes the transition only if it was
    /// actually held.
    fn release(&self) {
        if self.busy.swap(false, Ordering::AcqRel) {
            let _ = self.events.send(ControllerEvent::BusyChanged { busy: false });
        }
    }

    fn publish_failure(&self, message: String) {
        let _ = self.events.send(ControllerEvent::OperationFailed { message });
    }

    fn publish_dispatch_failure(&self, context: &str, failure: DispatchError) {
        let message = match failure {
            DispatchError::TimedOut => {
                warn!("device call timed out: {}", context);
                format!("Operation timed out: {}", context)
            }
            DispatchError::TaskFailed => format!("Operation failed unexpectedly: {}", context),
        };
        self.publish_failure(message);
    }

    /// Runs one device call on a blocking worker under the deadline.
    async fn run_device_call<T, F>(&self, call: F) -> Result<T, DispatchError>
    where
        F: FnOnce(&dyn Device) -> T + Send + 'static,
        T: Send + 'static,
    {
        let device = Arc::clone(&self.device);
        let task = tokio::task::spawn_blocking(move || call(device.as_ref()));
        match tokio::time::timeout(self.op_timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) => {
                error!("device task failed: {}", join_error);
                Err(DispatchError::TaskFailed)
            }
            Err(_) => Err(DispatchError::TimedOut),
        }
    }

    async fn refresh_device_task(&self) {
        debug!("refreshing device info and file list");
        let fetched = self
            .run_device_call(|device| {
                let info = format!("{} ({})", device.device_info(), device.device_version());
                let free_space = format_free_space(device.free_space());
                let files = match device.list_files("/") {
                    Ok(files) => files,
                    Err(err) => {
                        warn!("file listing failed during refresh: {}", err);
                        Vec::new()
                    }
                };
                (info, free_space, files)
            })
            .await;
        match fetched {
            Ok((device_info, free_space, files)) => {
                info!(
                    "device refreshed: {} - free: {}, {} entries",
                    device_info,
                    free_space,
                    files.len()
                );
                {
                    let mut snapshot = self.snapshot.write().unwrap();
                    snapshot.device_info = device_info;
                    snapshot.free_space = free_space;
                    snapshot.file_list = files.clone();
                }
                let _ = self.events.send(ControllerEvent::DeviceUpdated);
                let _ = self.events.send(ControllerEvent::FileListUpdated { files });
            }
            Err(failure) => self.publish_dispatch_failure("Refresh device", failure),
        }
    }

    async fn refresh_file_list_task(&self) {
        debug!("refreshing file list");
        let fetched = self.run_device_call(|device| device.list_files("/")).await;
        match fetched {
            Ok(result) => {
                let files = result.unwrap_or_else(|err| {
                    warn!("file listing failed: {}", err);
                    Vec::new()
                });
                {
                    let mut snapshot = self.snapshot.write().unwrap();
                    snapshot.file_list = files.clone();
                }
                let _ = self.events.send(ControllerEvent::FileListUpdated { files });
            }
            Err(failure) => self.publish_dispatch_failure("Refresh file list", failure),
        }
    }

    async fn read_file_task(&self, path: String) {
        let device_path = path.clone();
        let result = self
            .run_device_call(move |device| device.read_file(&device_path))
            .await;
        match result {
            Ok(Ok(data)) => {
                debug!("file read: {} ({} bytes)", path, data.len());
                let _ = self.events.send(ControllerEvent::FileRead { data });
            }
            Ok(Err(err)) => {
                warn!("failed to read {}: {}", path, err);
                self.publish_failure(format!("Failed to read file: {}", path));
            }
            Err(failure) => self.publish_dispatch_failure(&format!("Read {}", path), failure),
        }
    }

    async fn mutation_task<F>(&self, context: &str, failure_message: String, op: F)
    where
        F: FnOnce(&dyn Device) -> Result<(), DeviceError> + Send + 'static,
    {
        match self.run_device_call(op).await {
            Ok(Ok(())) => {
                info!("{} complete", context);
                // Continuation of the operation already holding the gate: the
                // dependent listing must be fresh before the gate opens again
                self.refresh_file_list_task().await;
            }
            Ok(Err(err)) => {
                warn!("{} failed: {}", context, err);
                self.publish_failure(failure_message);
            }
            Err(failure) => self.publish_dispatch_failure(context, failure),
        }
    }
}
