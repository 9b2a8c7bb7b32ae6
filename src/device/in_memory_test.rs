//! Tests for the in-memory device.

use super::*;

#[test]
fn test_demo_tree_contents() {
    let device = InMemoryDevice::demo();
    let files = device.list_files("/").unwrap();

    assert_eq!(
        files,
        vec![
            "DCIM/",
            "DCIM/Photos/",
            "DCIM/Photos/image1.jpg",
            "DCIM/Photos/image2.jpg",
            "DCIM/Videos/",
            "Documents/",
            "Documents/file1.txt",
            "Documents/file2.txt",
            "Music/",
            "test.txt",
        ]
    );
    assert_eq!(device.device_info(), "Demo device");
    assert_eq!(device.device_version(), "MTP Version: 1.1");
    assert!(device.free_space() > 0);
}

#[test]
fn test_list_files_under_a_directory() {
    let device = InMemoryDevice::demo();
    let files = device.list_files("DCIM/").unwrap();

    assert_eq!(
        files,
        vec![
            "DCIM/Photos/",
            "DCIM/Photos/image1.jpg",
            "DCIM/Photos/image2.jpg",
            "DCIM/Videos/",
        ]
    );
}

#[test]
fn test_list_files_of_missing_directory_errors() {
    let device = InMemoryDevice::demo();
    assert!(matches!(
        device.list_files("Downloads/"),
        Err(DeviceError::NotFound(_))
    ));
}

#[test]
fn test_write_registers_parent_directories() {
    let device = InMemoryDevice::new("Test device");

    device.write_file("new/dir/f.txt", b"data").unwrap();

    assert_eq!(
        device.list_files("/").unwrap(),
        vec!["new/", "new/dir/", "new/dir/f.txt"]
    );
    assert_eq!(device.read_file("new/dir/f.txt").unwrap(), b"data");
}

#[test]
fn test_read_distinguishes_empty_from_missing() {
    let device = InMemoryDevice::with_files("Test device", &[("empty.txt", b"".as_slice())]);

    assert_eq!(device.read_file("empty.txt").unwrap(), Vec::<u8>::new());
    assert!(matches!(
        device.read_file("missing.txt"),
        Err(DeviceError::NotFound(_))
    ));
}

#[test]
fn test_delete_file() {
    let device = InMemoryDevice::with_files("Test device", &[("a.txt", b"a".as_slice())]);

    device.delete_file("a.txt").unwrap();
    assert!(device.list_files("/").unwrap().is_empty());
    assert!(matches!(
        device.delete_file("a.txt"),
        Err(DeviceError::NotFound(_))
    ));
}

#[test]
fn test_create_directory_is_idempotent_and_registers_parents() {
    let device = InMemoryDevice::new("Test device");

    device.create_directory("a/b/c").unwrap();
    device.create_directory("a/b/c/").unwrap();

    assert_eq!(device.list_files("/").unwrap(), vec!["a/", "a/b/", "a/b/c/"]);
}

#[test]
fn test_delete_directory_drops_the_subtree() {
    let device = InMemoryDevice::demo();

    device.delete_directory("DCIM/").unwrap();

    let files = device.list_files("/").unwrap();
    assert!(!files.iter().any(|f| f.starts_with("DCIM/")), "files: {:?}", files);
    assert!(files.contains(&"Music/".to_string()));
    assert!(matches!(
        device.delete_directory("DCIM/"),
        Err(DeviceError::NotFound(_))
    ));
}

#[test]
fn test_read_only_mode_rejects_mutations() {
    let device = InMemoryDevice::demo();
    device.set_read_only(true);

    assert!(matches!(
        device.write_file("x.txt", b"x"),
        Err(DeviceError::PermissionDenied(_))
    ));
    assert!(matches!(
        device.delete_file("test.txt"),
        Err(DeviceError::PermissionDenied(_))
    ));
    assert!(matches!(
        device.create_directory("y/"),
        Err(DeviceError::PermissionDenied(_))
    ));
    assert!(matches!(
        device.delete_directory("Music/"),
        Err(DeviceError::PermissionDenied(_))
    ));

    // Reads still work
    assert!(device.read_file("test.txt").is_ok());
    assert!(device.list_files("/").is_ok());

    device.set_read_only(false);
    assert!(device.write_file("x.txt", b"x").is_ok());
}

#[test]
fn test_free_space_override() {
    let device = InMemoryDevice::new("Test device");
    device.set_free_space(0);
    assert_eq!(device.free_space(), 0);
}

#[test]
fn test_detect_devices_reports_the_device() {
    let device = InMemoryDevice::new("Test device");
    let detected = device.detect_devices();
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].friendly_name, "Test device");
    assert_eq!(detected[0].mtp_version, "1.1");
}
