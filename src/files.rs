//! One-shot file reads for SSH keys and user-data parts.
//!
//! Reads go through a `cap-std` handle on the file's parent directory,
//! opened from ambient authority. Nothing is retried.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::error::ProvisionError;

/// Expands a leading `~/` using `HOME`; other paths are returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_owned()
}

/// Reads a whole UTF-8 file after tilde expansion.
///
/// # Errors
///
/// Returns [`ProvisionError::Io`] naming the expanded path when the file
/// cannot be opened or decoded.
pub fn read_to_string(path: &Utf8Path) -> Result<String, ProvisionError> {
    let expanded = expand_tilde(path.as_str());
    read_to_string_ambient(&expanded).map_err(|message| ProvisionError::Io {
        path: expanded.clone(),
        message,
    })
}

/// Returns the first line of a file without its line terminator.
///
/// # Errors
///
/// Returns [`ProvisionError::Io`] when the file cannot be read or is empty.
pub fn read_first_line(path: &Utf8Path) -> Result<String, ProvisionError> {
    let content = read_to_string(path)?;
    content
        .lines()
        .next()
        .map(|line| line.trim_end_matches('\r').to_owned())
        .ok_or_else(|| ProvisionError::Io {
            path: expand_tilde(path.as_str()),
            message: String::from("file is empty"),
        })
}

/// Splits a path into the directory to open and the entry to read from it.
///
/// A bare file name lives in the working directory. Any other path opens
/// its own parent, so relative paths that climb with `..` still resolve.
fn split_for_open(path: &Utf8Path) -> Result<(&Utf8Path, &str), String> {
    let name = path
        .file_name()
        .ok_or_else(|| format!("{path} does not name a file"))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    Ok((parent, name))
}

fn read_to_string_ambient(path: &str) -> Result<String, String> {
    let (parent, name) = split_for_open(Utf8Path::new(path))?;
    Dir::open_ambient_dir(parent, ambient_authority())
        .and_then(|dir| dir.read_to_string(name))
        .map_err(|err| err.to_string())
}
