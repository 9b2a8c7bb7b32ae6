//! Builds a presentation tree from the flat path listings devices return.
//!
//! Listings are flat sequences of full paths where a trailing `/` is the
//! only directory marker. This module materializes the hierarchy those
//! paths imply, including ancestor directories the listing never named
//! explicitly.

use crate::device::is_directory_path;
use serde::Serialize;
use std::collections::BTreeSet;

/// One node of the presentation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Last path component.
    pub name: String,
    /// Full path from the device root; directories keep their trailing `/`.
    pub path: String,
    pub is_directory: bool,
    pub children: Vec<FileNode>,
}

/// Builds the tree implied by a flat listing.
///
/// Duplicates collapse, ancestors missing from the listing are created, and
/// children sort directories-first in natural order.
pub fn build_tree(paths: &[String]) -> Vec<FileNode> {
    // Pass 1: normalize and collect every entry plus its implied ancestors
    let mut all_paths = BTreeSet::new();
    for raw in paths {
        let normalized = raw.trim_start_matches('/');
        if normalized.trim_end_matches('/').is_empty() {
            continue;
        }
        let is_dir = is_directory_path(normalized);
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        let mut prefix = String::new();
        for (i, part) in parts.iter().enumerate() {
            prefix.push_str(part);
            if i + 1 < parts.len() || is_dir {
                prefix.push('/');
            }
            all_paths.insert(prefix.clone());
        }
    }

    // Pass 2: lexicographic order puts ancestors before descendants, so each
    // entry slots under nodes that already exist
    let mut roots = Vec::new();
    for entry in &all_paths {
        insert(&mut roots, entry);
    }
    sort_nodes(&mut roots);
    roots
}

fn insert(roots: &mut Vec<FileNode>, entry: &str) {
    let entry_is_dir = is_directory_path(entry);
    let parts: Vec<&str> = entry.trim_end_matches('/').split('/').collect();
    let mut current = roots;
    let mut prefix = String::new();
    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        let is_dir = !last || entry_is_dir;
        prefix.push_str(part);
        if is_dir {
            prefix.push('/');
        }
        let index = match current
            .iter()
            .position(|node| node.name == *part && node.is_directory == is_dir)
        {
            Some(index) => index,
            None => {
                current.push(FileNode {
                    name: (*part).to_string(),
                    path: prefix.clone(),
                    is_directory: is_dir,
                    children: Vec::new(),
                });
                current.len() - 1
            }
        };
        current = &mut current[index].children;
    }
}

/// Sorts siblings directories-first, then by name in natural order, at every
/// level.
fn sort_nodes(nodes: &mut Vec<FileNode>) {
    nodes.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| alphanumeric_sort::compare_str(&a.name, &b.name))
    });
    for node in nodes {
        sort_nodes(&mut node.children);
    }
}
