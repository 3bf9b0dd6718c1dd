use std::path::Path;

use walkdir::WalkDir;

use crate::domain::{FileTreeNode, NodeKind};
use crate::error::{LogboxError, Result};

/// Walk an extraction root and return its entries as a tree, sorted by name
/// at every level.
///
/// The walk is iterative: walkdir yields entries depth-first in sorted
/// order and `open` holds the chain of directories still being filled, so
/// `open[i]` sits at depth `i + 1`.
pub fn list_tree(root: &Path) -> Result<Vec<FileTreeNode>> {
    if !root.is_dir() {
        return Err(LogboxError::NotFound(format!(
            "log directory {} does not exist",
            root.display()
        )));
    }

    let mut top = Vec::new();
    let mut open: Vec<FileTreeNode> = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        while open.len() >= entry.depth() {
            close_last(&mut open, &mut top);
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| LogboxError::Internal(e.to_string()))?;
        let node = FileTreeNode {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: slash_path(rel),
            kind: if entry.file_type().is_dir() {
                NodeKind::Directory {
                    children: Vec::new(),
                }
            } else {
                NodeKind::File {
                    size: entry.metadata()?.len(),
                }
            },
        };

        if node.is_dir() {
            open.push(node);
        } else {
            attach(&mut open, &mut top, node);
        }
    }
    while !open.is_empty() {
        close_last(&mut open, &mut top);
    }
    Ok(top)
}

/// Number of file nodes in a tree.
pub fn count_files(nodes: &[FileTreeNode]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&FileTreeNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        if node.is_dir() {
            stack.extend(node.children());
        } else {
            count += 1;
        }
    }
    count
}

fn close_last(open: &mut Vec<FileTreeNode>, top: &mut Vec<FileTreeNode>) {
    if let Some(done) = open.pop() {
        attach(open, top, done);
    }
}

fn attach(open: &mut [FileTreeNode], top: &mut Vec<FileTreeNode>, node: FileTreeNode) {
    match open.last_mut() {
        Some(FileTreeNode {
            kind: NodeKind::Directory { children },
            ..
        }) => children.push(node),
        _ => top.push(node),
    }
}

fn slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
