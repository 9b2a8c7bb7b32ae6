// Use log::* macros instead of println!/eprintln! for proper log level control
#![deny(clippy::print_stdout, clippy::print_stderr)]
// Warn on redundant path prefixes (e.g., std::path::Path when Path is imported)
#![warn(unused_qualifications)]

//! Asynchronous view-model for browsing MTP (Media Transfer Protocol) devices.
//!
//! The MTP wire protocol itself lives in an external crate; this library is
//! the layer between a device handle and a UI. Its job is to keep a slow,
//! one-operation-at-a-time device from ever blocking or corrupting the
//! interactive side.
//!
//! # Architecture
//!
//! - `device`: the capability seam (`Device` trait) plus backends: a
//!   filesystem-backed simulator, an in-memory device for tests and demos,
//!   and a real-hardware adapter behind the `mtp-device` feature
//! - `controller`: the single-flight view-model. One busy gate, one
//!   background task at a time, results published as `ControllerEvent`s
//! - `tree`: pure transformation of flat device listings into a tree for
//!   presentation
//!
//! # Concurrency model
//!
//! The controller owns the only path to the device. Operations are accepted
//! only when the controller is idle; everything else is rejected
//! synchronously with a failure notification. Accepted work runs on a
//! blocking worker under a deadline, and every terminal path (success,
//! device failure, or timeout) releases the gate.

pub mod controller;
pub mod device;
pub mod tree;

pub use controller::{ControllerEvent, DeviceController, format_free_space};
pub use device::{DetectedDevice, Device, DeviceError, FsDevice, InMemoryDevice};
#[cfg(all(feature = "mtp-device", any(target_os = "macos", target_os = "linux")))]
pub use device::UsbMtpDevice;
pub use tree::{FileNode, build_tree};
