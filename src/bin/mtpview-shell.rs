//! Interactive shell for the MTP browser view-model.
//!
//! Reads commands from stdin, fires them at the controller, and prints every
//! controller notification as a JSON line on stdout. Status and prompts go
//! to stderr so stdout stays machine-readable.
//!
//! Usage:
//!   mtpview-shell [--root DIR]
//!
//! With `--root`, the given directory backs a simulated device; without it,
//! the canned in-memory demo device is used.

use mtpview::{Device, DeviceController, FsDevice, InMemoryDevice, build_tree};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

fn print_usage() {
    eprintln!("Usage: mtpview-shell [--root DIR]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  refresh              refresh device info and file list");
    eprintln!("  ls                   refresh the file list only");
    eprintln!("  tree                 print the cached listing as a tree");
    eprintln!("  info                 print cached device info and free space");
    eprintln!("  devices              list visible devices");
    eprintln!("  read <path>          read a file");
    eprintln!("  write <path> <text>  write text to a file");
    eprintln!("  rm <path>            delete a file");
    eprintln!("  mkdir <path>         create a directory");
    eprintln!("  rmdir <path>         delete a directory recursively");
    eprintln!("  quit                 exit");
}

#[tokio::main]
async fn main() {
    // Respects RUST_LOG env var (default: info)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut root: Option<String> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--root" => match args.get(i + 1) {
                Some(dir) => {
                    root = Some(dir.clone());
                    i += 2;
                }
                None => {
                    eprintln!("--root needs a directory argument");
                    std::process::exit(2);
                }
            },
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("unknown argument: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    let backend: Arc<dyn Device> = match &root {
        Some(dir) => match FsDevice::new("Simulated device", dir) {
            Ok(device) => Arc::new(device),
            Err(err) => {
                eprintln!("cannot use {} as a device root: {}", dir, err);
                std::process::exit(1);
            }
        },
        None => Arc::new(InMemoryDevice::demo()),
    };

    let controller = DeviceController::new(Arc::clone(&backend));
    let mut events = controller.subscribe();

    // One JSON line per notification
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(err) => eprintln!("cannot serialize event: {}", err),
                },
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("event printer lagged, {} events dropped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Blocking stdin reader feeding the async command loop
    let (lines_tx, mut lines_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if lines_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    eprintln!("mtpview shell ready; type 'quit' to exit, '-h' on the command line for commands");

    while let Some(line) = lines_rx.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line
            .split_once(' ')
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((line, ""));
        match command {
            "refresh" => controller.refresh_device(),
            "ls" => controller.refresh_file_list(),
            "info" => eprintln!("{} - Free: {}", controller.device_info(), controller.free_space()),
            "devices" => match serde_json::to_string(&backend.detect_devices()) {
                Ok(line) => println!("{}", line),
                Err(err) => eprintln!("cannot serialize device list: {}", err),
            },
            "tree" => {
                let tree = build_tree(&controller.file_list());
                match serde_json::to_string_pretty(&tree) {
                    Ok(text) => println!("{}", text),
                    Err(err) => eprintln!("cannot serialize tree: {}", err),
                }
            }
            "read" => controller.read_file(rest),
            "write" => match rest.split_once(' ') {
                Some((path, text)) => controller.write_file(path, text.as_bytes().to_vec()),
                None => eprintln!("usage: write <path> <text>"),
            },
            "rm" => controller.delete_file(rest),
            "mkdir" => controller.create_directory(rest),
            "rmdir" => controller.delete_directory(rest),
            "quit" | "exit" => break,
            other => eprintln!("unknown command: {}", other),
        }
    }
}
