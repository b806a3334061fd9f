use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::compile_pattern;
use crate::error::NmrError;

pub const DEFAULT_FILE_NAME_PATTERN: &str = r".*\.xml$";

#[derive(Debug, Clone)]
pub struct FileDiscovery {
    root: Utf8PathBuf,
    pattern: Regex,
    pdata: Option<u32>,
}

impl FileDiscovery {
    pub fn new(root: &Utf8Path, pattern: &str, pdata: Option<u32>) -> Result<Self, NmrError> {
        Ok(Self {
            root: root.to_path_buf(),
            pattern: compile_pattern(pattern)?,
            pdata,
        })
    }

    pub fn discover(&self) -> Result<Vec<Utf8PathBuf>, NmrError> {
        if !self.root.as_std_path().is_dir() {
            return Err(NmrError::Filesystem(format!(
                "source directory not found: {}",
                self.root
            )));
        }

        let mut files = Vec::new();
        for path in walk_files(self.root.as_std_path())? {
            let path = match Utf8PathBuf::from_path_buf(path) {
                Ok(path) => path,
                Err(path) => {
                    warn!(path = %path.display(), "skipping non UTF-8 path");
                    continue;
                }
            };
            let Some(name) = path.file_name() else {
                continue;
            };
            if !self.pattern.is_match(name) {
                continue;
            }
            if !pdata_matches(&path, self.pdata) {
                debug!(%path, "skipping report from another processing state");
                continue;
            }
            files.push(path);
        }
        files.sort();
        debug!(root = %self.root, count = files.len(), "discovered report files");
        Ok(files)
    }
}

pub fn pdata_from_path(path: &Utf8Path) -> Option<u32> {
    let components: Vec<&str> = path.components().map(|c| c.as_str()).collect();
    components
        .windows(2)
        .rev()
        .find(|pair| pair[0] == "pdata")
        .and_then(|pair| pair[1].parse().ok())
}

fn pdata_matches(path: &Utf8Path, selector: Option<u32>) -> bool {
    match (selector, pdata_from_path(path)) {
        (Some(wanted), Some(found)) => wanted == found,
        _ => true,
    }
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>, NmrError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path)
            .map_err(|err| NmrError::Filesystem(format!("read {}: {err}", path.display())))?;
        for entry in entries {
            let entry = entry.map_err(|err| NmrError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                items.push(path);
            }
        }
    }
    Ok(items)
}
