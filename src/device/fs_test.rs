//! Tests for the filesystem-backed device simulator.

use super::*;
use tempfile::tempdir;

fn sample_device() -> (tempfile::TempDir, FsDevice) {
    let dir = tempdir().unwrap();
    let device = FsDevice::new("Simulated device", dir.path()).unwrap();
    (dir, device)
}

#[test]
fn test_new_creates_missing_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("device_root");
    assert!(!root.exists());

    let device = FsDevice::new("Simulated device", &root).unwrap();
    assert!(root.is_dir());
    assert_eq!(device.root(), root);
}

#[test]
fn test_identity_and_free_space() {
    let (_dir, device) = sample_device();

    assert_eq!(device.device_info(), "Simulated device");
    assert_eq!(device.device_version(), "MTP Version: 1.0 (simulated)");
    assert_eq!(device.free_space(), 1024 * 1024 * 1024);

    let detected = device.detect_devices();
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].friendly_name, "Simulated device");
}

#[test]
fn test_list_files_is_flat_recursive_and_slash_marked() {
    let (dir, device) = sample_device();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
    std::fs::create_dir(dir.path().join("dir")).unwrap();
    std::fs::write(dir.path().join("dir/b.txt"), b"b").unwrap();

    let files = device.list_files("/").unwrap();
    assert_eq!(files, vec!["a.txt", "dir/", "dir/b.txt"]);
}

#[test]
fn test_list_files_of_subdirectory_keeps_full_paths() {
    let (dir, device) = sample_device();
    std::fs::create_dir_all(dir.path().join("dir/nested")).unwrap();
    std::fs::write(dir.path().join("dir/nested/c.txt"), b"c").unwrap();

    let files = device.list_files("dir/").unwrap();
    assert_eq!(files, vec!["dir/nested/", "dir/nested/c.txt"]);
}

#[test]
fn test_list_files_of_missing_directory_errors() {
    let (_dir, device) = sample_device();
    assert!(matches!(device.list_files("nope/"), Err(DeviceError::NotFound(_))));
}

#[test]
fn test_write_creates_parent_directories() {
    let (_dir, device) = sample_device();

    device.write_file("x/y/z.txt", b"deep").unwrap();

    assert_eq!(device.read_file("x/y/z.txt").unwrap(), b"deep");
    let files = device.list_files("/").unwrap();
    assert_eq!(files, vec!["x/", "x/y/", "x/y/z.txt"]);
}

#[test]
fn test_read_distinguishes_empty_from_missing() {
    let (dir, device) = sample_device();
    std::fs::write(dir.path().join("empty.txt"), b"").unwrap();

    assert_eq!(device.read_file("empty.txt").unwrap(), Vec::<u8>::new());
    assert!(matches!(
        device.read_file("missing.txt"),
        Err(DeviceError::NotFound(_))
    ));
}

#[test]
fn test_delete_file() {
    let (dir, device) = sample_device();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
    std::fs::create_dir(dir.path().join("dir")).unwrap();

    device.delete_file("a.txt").unwrap();
    assert_eq!(device.list_files("/").unwrap(), vec!["dir/"]);
    assert!(!dir.path().join("a.txt").exists());

    // Directories are not files
    assert!(device.delete_file("dir").is_err());
}

#[test]
fn test_create_directory_accepts_trailing_slash() {
    let (dir, device) = sample_device();

    device.create_directory("photos/").unwrap();
    device.create_directory("music").unwrap();

    assert!(dir.path().join("photos").is_dir());
    assert!(dir.path().join("music").is_dir());
    assert_eq!(device.list_files("/").unwrap(), vec!["music/", "photos/"]);
}

#[test]
fn test_delete_directory_is_recursive() {
    let (dir, device) = sample_device();
    std::fs::create_dir_all(dir.path().join("dir/nested")).unwrap();
    std::fs::write(dir.path().join("dir/nested/c.txt"), b"c").unwrap();
    std::fs::write(dir.path().join("keep.txt"), b"k").unwrap();

    device.delete_directory("dir/").unwrap();

    assert_eq!(device.list_files("/").unwrap(), vec!["keep.txt"]);
}

#[test]
fn test_delete_directory_refuses_the_root() {
    let (_dir, device) = sample_device();
    assert!(matches!(
        device.delete_directory("/"),
        Err(DeviceError::PermissionDenied(_))
    ));
    assert!(matches!(
        device.delete_directory(""),
        Err(DeviceError::PermissionDenied(_))
    ));
}

#[test]
fn test_delete_missing_directory_errors() {
    let (_dir, device) = sample_device();
    assert!(matches!(
        device.delete_directory("nope/"),
        Err(DeviceError::NotFound(_))
    ));
}
