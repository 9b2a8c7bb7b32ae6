//! Notification types published by the controller.
//!
//! These are serialized to JSON at the presentation boundary (the shell
//! prints them as JSON lines; a GUI frontend would receive them the same
//! way).

use serde::Serialize;

/// A terminal or state-change notification from the controller.
///
/// Every accepted operation publishes exactly one terminal notification
/// (`FileListUpdated`, `FileRead`, or `OperationFailed`; a full refresh
/// publishes `DeviceUpdated` immediately followed by `FileListUpdated`).
/// `BusyChanged` brackets accepted operations and fires only on actual
/// transitions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ControllerEvent {
    /// Device info and free space were refreshed; read them through the
    /// controller's accessors.
    DeviceUpdated,
    /// The file listing changed (after a refresh, or after any successful
    /// mutating operation).
    FileListUpdated { files: Vec<String> },
    /// A file was read successfully. Empty `data` is an empty file, not a
    /// failure.
    FileRead { data: Vec<u8> },
    /// An operation was rejected, failed on the device, or timed out.
    OperationFailed { message: String },
    /// The busy gate changed state.
    BusyChanged { busy: bool },
}
