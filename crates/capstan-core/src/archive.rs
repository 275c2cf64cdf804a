//! Chart archive ingestion
//!
//! Streams a gzip-compressed tar archive into buffered files, validating
//! every entry name before its contents are accepted. Validation happens
//! on the normalized forward-slash form; archives produced on Windows may
//! carry backslash separators and drive-letter prefixes, both of which are
//! handled here.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use regex::Regex;
use tar::{Archive, EntryType};

use crate::chart::File;
use crate::error::{CoreError, Result};

/// Gzip stream magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How many leading bytes the dispatcher sniffs before committing to the
/// archive reader.
pub(crate) const SNIFF_LEN: usize = 512;

/// Read every regular file out of a gzipped tar stream.
///
/// Directory entries and PAX extension headers are skipped. Each surviving
/// entry name is validated and normalized with its top-level directory
/// segment stripped. An archive that yields no files at all is an error.
pub fn read_archive_files<R: Read>(reader: R) -> Result<Vec<File>> {
    let decoder = GzDecoder::new(reader);
    let mut archive = Archive::new(decoder);
    let drive_pattern = Regex::new("^[a-zA-Z]:/").expect("valid regex");

    let mut files = Vec::new();
    let entries = archive.entries().map_err(|e| CoreError::Archive {
        message: e.to_string(),
    })?;
    for entry in entries {
        let mut entry = entry.map_err(|e| CoreError::Archive {
            message: e.to_string(),
        })?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        match entry.header().entry_type() {
            EntryType::XGlobalHeader | EntryType::XHeader => continue,
            _ => {}
        }

        let raw_name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let name = validate_entry_name(&raw_name, &drive_pattern)?;

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).map_err(|e| CoreError::Archive {
            message: format!("reading {raw_name:?}: {e}"),
        })?;
        files.push(File { name, data });
    }

    if files.is_empty() {
        return Err(CoreError::Archive {
            message: "no files in chart archive".to_string(),
        });
    }
    Ok(files)
}

/// Validate a raw tar entry name and return the normalized relative path
/// with the archive's top-level directory segment stripped.
fn validate_entry_name(raw: &str, drive_pattern: &Regex) -> Result<String> {
    let delimiter = if raw.contains('\\') { '\\' } else { '/' };

    let mut parts = raw.split(delimiter);
    let top = parts.next().unwrap_or("");
    let name = parts.collect::<Vec<&str>>().join("/");

    if name.starts_with('/') {
        return Err(CoreError::AbsolutePath);
    }

    let name = clean_path(&name);
    if name == "." {
        // The entry had no top-level directory to strip.
        return Err(CoreError::OutsideBaseDirectory {
            name: raw.to_string(),
        });
    }
    if name.starts_with("..") {
        return Err(CoreError::ParentDirectory);
    }

    // Mixed UNIX and Windows separators can smuggle a drive-letter path
    // past the absolute-path check above.
    if drive_pattern.is_match(&name) {
        return Err(CoreError::IllegallyNamedFiles);
    }

    if name == "Chart.yaml" && top == "Chart.yaml" {
        return Err(CoreError::ChartfileNotInBase);
    }

    Ok(name)
}

/// Lexically collapse `.`, `..`, and repeated separators. Leading `..`
/// segments are preserved; an empty result becomes `.`.
fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(last) if *last != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Verify that a chart file looks like a gzipped archive, from its first
/// bytes.
///
/// Users sometimes hand a values file where a chart archive is expected;
/// the YAML-specific hint makes that mistake obvious.
pub(crate) fn ensure_archive(path: &Path, head: &[u8]) -> Result<()> {
    if head.len() >= GZIP_MAGIC.len() && head[..GZIP_MAGIC.len()] == GZIP_MAGIC {
        return Ok(());
    }
    let name = path.to_string_lossy().into_owned();
    if name.ends_with(".yml") || name.ends_with(".yaml") {
        return Err(CoreError::YamlNotArchive { path: name });
    }
    Err(CoreError::NotAnArchive {
        path: name,
        detected: detect_content_type(head).to_string(),
    })
}

/// Coarse content-type detection, only used to name the offender in
/// `NotAnArchive` errors.
fn detect_content_type(head: &[u8]) -> &'static str {
    if head.starts_with(b"PK\x03\x04") {
        "application/zip"
    } else if head.starts_with(b"BZh") {
        "application/x-bzip2"
    } else if head.is_empty() {
        "empty file"
    } else if head
        .iter()
        .all(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
    {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}
