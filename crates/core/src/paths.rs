//! Input, output and background image path resolution.

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory used when no output path is given.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Extensions accepted by the input scan, in priority order.
const HTML_EXTENSIONS: &[&str] = &[".html", ".htm"];

/// Return the HTML file to process.
///
/// An explicit path must name an existing file. Without one, the working
/// directory is scanned and the bare file name of the first match is
/// returned.
pub fn find_html(explicit: Option<&Path>) -> Result<PathBuf> {
    find_html_in(Path::new(""), explicit)
}

/// Like [`find_html`], scanning `dir` instead of the working directory.
///
/// The returned path is `dir` joined with the file name.
pub fn find_html_in(dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        return Ok(path.to_path_buf());
    }

    let scan_dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let mut names: Vec<String> = fs::read_dir(scan_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();

    // Every .html beats every .htm
    for ext in HTML_EXTENSIONS {
        if let Some(name) = names.iter().find(|name| name.ends_with(ext)) {
            log::debug!("Auto-detected input file {}", name);
            return Ok(dir.join(name));
        }
    }

    Err(Error::NoCandidateFile(scan_dir.to_path_buf()))
}

/// Return the PPTX path to write, creating its directory.
///
/// Without an explicit path, `output/mind_map_clickable_<YYYYMMDD>_<HHMMSS>.pptx`
/// is used, relative to the working directory.
pub fn make_output_path(explicit: Option<&Path>) -> Result<PathBuf> {
    make_output_path_in(Path::new(""), explicit, Local::now())
}

/// Like [`make_output_path`], with the default directory placed under
/// `base` and an explicit timestamp.
pub fn make_output_path_in(
    base: &Path,
    explicit: Option<&Path>,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        return Ok(path.to_path_buf());
    }

    let out_dir = base.join(DEFAULT_OUTPUT_DIR);
    fs::create_dir_all(&out_dir)?;
    Ok(out_dir.join(default_file_name(now)))
}

fn default_file_name(now: DateTime<Local>) -> String {
    format!("mind_map_clickable_{}.pptx", now.format("%Y%m%d_%H%M%S"))
}

/// Locate the background image referenced by `src`.
///
/// `src` is tried as given first, then relative to the HTML file's
/// directory. Returns `None` when neither is a file.
pub fn find_background(src: &str, html_path: &Path) -> Option<PathBuf> {
    let direct = PathBuf::from(src);
    if direct.is_file() {
        return Some(direct);
    }

    let beside_html = html_path.parent()?.join(src);
    if beside_html.is_file() {
        return Some(beside_html);
    }

    None
}
