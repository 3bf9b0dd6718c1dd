use std::fmt;

use logbox_core::error::Result;
use logbox_core::{ContentType, FileTreeNode, LogRecord, LogService, LogboxError, NodeKind};

pub async fn handle_search(svc: &LogService, keyword: &str) -> Result<()> {
    let hits = svc.search(keyword).await?;
    for h in &hits {
        println!("{:<24}  {:<20}  {:<20}  {}", h.id, h.boxname, h.createat, h.description);
    }
    eprintln!("search: {} result(s)", hits.len());
    Ok(())
}

pub async fn handle_fetch(svc: &LogService, id: &str) -> Result<()> {
    let rec = svc.acquire(id).await?;
    eprintln!(
        "fetch: {} ({} bytes, blake3 {}) -> {}",
        rec.id,
        rec.archive_size,
        rec.archive_blake3,
        rec.extract_root.display()
    );
    Ok(())
}

pub async fn handle_ls(svc: &LogService) -> Result<()> {
    for rec in svc.records().await? {
        println!("{}", record_line(&rec));
    }
    Ok(())
}

pub async fn handle_show(svc: &LogService, id: &str) -> Result<()> {
    let rec = svc.record(id).await?;
    let json = serde_json::to_string_pretty(&rec)
        .map_err(|e| LogboxError::Internal(format!("cannot render record: {e}")))?;
    println!("{json}");
    Ok(())
}

pub async fn handle_tree(svc: &LogService, id: &str) -> Result<()> {
    let nodes = svc.tree(id).await?;
    let mut out = String::new();
    write_tree(&mut out, &nodes)
        .map_err(|e| LogboxError::Internal(format!("cannot render tree: {e}")))?;
    print!("{out}");
    Ok(())
}

pub async fn handle_cat(svc: &LogService, id: &str, path: &str, meta: bool) -> Result<()> {
    let file = svc.read_file(id, path).await?;
    if meta {
        eprintln!("cat: {} type={} size={}", path, wire_name(file.kind)?, file.size);
    }
    println!("{}", file.content);
    Ok(())
}

pub async fn handle_rm(svc: &LogService, id: &str) -> Result<()> {
    svc.delete(id).await?;
    eprintln!("rm: {id}");
    Ok(())
}

fn record_line(rec: &LogRecord) -> String {
    format!(
        "{:<24}  {}  {:>12}  {}",
        rec.id,
        rec.acquired_at,
        rec.archive_size,
        rec.extract_root.display()
    )
}

/// The name the API reports for `kind`.
fn wire_name(kind: ContentType) -> Result<String> {
    match serde_json::to_value(kind) {
        Ok(serde_json::Value::String(name)) => Ok(name),
        Ok(other) => Err(LogboxError::Internal(format!("unexpected content type {other}"))),
        Err(e) => Err(LogboxError::Internal(format!("cannot name content type: {e}"))),
    }
}

/// Indented listing, directories suffixed with `/`.
fn write_tree(out: &mut impl fmt::Write, nodes: &[FileTreeNode]) -> fmt::Result {
    let mut stack: Vec<(usize, &FileTreeNode)> = nodes.iter().rev().map(|n| (0, n)).collect();
    while let Some((depth, node)) = stack.pop() {
        let indent = "  ".repeat(depth);
        match &node.kind {
            NodeKind::Directory { children } => {
                writeln!(out, "{indent}{}/", node.name)?;
                stack.extend(children.iter().rev().map(|c| (depth + 1, c)));
            }
            NodeKind::File { size } => {
                writeln!(out, "{indent}{}  ({size} bytes)", node.name)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, path: &str, size: u64) -> FileTreeNode {
        FileTreeNode {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File { size },
        }
    }

    #[test]
    fn tree_renders_depth_first_in_order() {
        let nodes = vec![
            FileTreeNode {
                name: "a".into(),
                path: "a".into(),
                kind: NodeKind::Directory {
                    children: vec![file("b.txt", "a/b.txt", 5)],
                },
            },
            file("c.json", "c.json", 7),
        ];
        let mut out = String::new();
        write_tree(&mut out, &nodes).unwrap();
        assert_eq!(out, "a/\n  b.txt  (5 bytes)\nc.json  (7 bytes)\n");
    }

    #[test]
    fn empty_tree_renders_nothing() {
        let mut out = String::new();
        write_tree(&mut out, &[]).unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn tree_write_errors_propagate() {
        struct Full;
        impl fmt::Write for Full {
            fn write_str(&mut self, _: &str) -> fmt::Result {
                Err(fmt::Error)
            }
        }
        assert!(write_tree(&mut Full, &[file("x", "x", 1)]).is_err());
    }

    #[test]
    fn content_types_print_their_api_names() {
        assert_eq!(wire_name(ContentType::Json).unwrap(), "json");
        assert_eq!(wire_name(ContentType::Binary).unwrap(), "binary");
        assert_eq!(wire_name(ContentType::Error).unwrap(), "error");
    }
}
