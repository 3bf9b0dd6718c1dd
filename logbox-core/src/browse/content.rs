use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use encoding_rs::GBK;
use serde_json::Value;

use crate::domain::{ContentType, FileContent};
use crate::error::{LogboxError, Result};
use crate::util::sanitize::resolve_within;

pub const BINARY_PLACEHOLDER: &str = "Binary file, cannot be displayed";

/// Files with a NUL byte in this prefix never fall back to Latin-1.
const BINARY_SNIFF_LEN: usize = 8000;

/// Read a file below an extraction root and classify it for display.
///
/// Only path problems are errors (`NotFound`/`Forbidden`). Anything that
/// goes wrong after the file has been located is reported in-band as an
/// `error` content type.
pub fn read_file(root: &Path, rel: &str) -> Result<FileContent> {
    let target = resolve_within(root, rel)?;
    if !target.is_file() {
        return Err(LogboxError::NotFound(format!("file does not exist: {rel}")));
    }

    let size = fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
    Ok(from_read(rel, fs::read(&target), size))
}

/// Turn the outcome of reading `name` into displayable content. A failed
/// read is reported in-band with the file's `size` on disk.
pub fn from_read(name: &str, read: io::Result<Vec<u8>>, size: u64) -> FileContent {
    match read {
        Ok(bytes) => render(name, &bytes),
        Err(e) => FileContent {
            content: format!("Error reading file: {e}"),
            kind: ContentType::Error,
            size,
        },
    }
}

/// Decode, classify and format raw file bytes.
pub fn render(name: &str, bytes: &[u8]) -> FileContent {
    let Some(text) = decode(bytes) else {
        return FileContent {
            content: BINARY_PLACEHOLDER.to_string(),
            kind: ContentType::Binary,
            size: bytes.len() as u64,
        };
    };

    let parsed = serde_json::from_str::<Value>(&text).ok();
    let kind = classify(name, parsed.is_some());
    let size = text.len() as u64;
    let content = match (kind, parsed) {
        (ContentType::Json, Some(value)) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.into_owned())
        }
        _ => text.into_owned(),
    };
    FileContent {
        content,
        kind,
        size,
    }
}

/// Try UTF-8, then GBK, then Latin-1. Latin-1 maps every byte and is
/// skipped for content that looks binary.
pub fn decode(bytes: &[u8]) -> Option<Cow<'_, str>> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Some(Cow::Borrowed(s));
    }
    if let Some(s) = GBK.decode_without_bom_handling_and_without_replacement(bytes) {
        return Some(s);
    }
    if looks_binary(bytes) {
        return None;
    }
    Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect()))
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

/// Pick a content type from the file extension; unknown extensions are
/// JSON when the body parses, text otherwise.
pub fn classify(name: &str, parses_as_json: bool) -> ContentType {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") if parses_as_json => ContentType::Json,
        Some("json") | Some("log") | Some("txt") => ContentType::Text,
        Some("xml") => ContentType::Xml,
        Some("yaml") | Some("yml") => ContentType::Yaml,
        Some("html") | Some("htm") => ContentType::Html,
        _ if parses_as_json => ContentType::Json,
        _ => ContentType::Text,
    }
}
