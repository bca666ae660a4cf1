use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Word-processing formats picked up from directories and glob patterns
pub const DOCUMENT_EXTENSIONS: &[&str] = &["docx", "doc", "odt", "rtf"];

/// Resolve user-supplied inputs (files, directories, glob patterns) into an
/// ordered, duplicate-free list of documents
pub fn collect_documents(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut documents = Vec::new();

    for input in inputs {
        for path in expand_input(input)? {
            let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if seen.insert(key) {
                documents.push(path);
            } else {
                debug!("Skipping duplicate input: {:?}", path);
            }
        }
    }

    Ok(documents)
}

fn expand_input(input: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(input);

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        return Ok(walk_directory(path));
    }

    if is_glob(input) {
        let matches: Vec<PathBuf> = glob::glob(input)
            .map_err(|e| anyhow!("Invalid pattern '{}': {}", input, e))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file() && is_document(p))
            .collect();
        if matches.is_empty() {
            return Err(anyhow!("No documents match pattern: {}", input));
        }
        return Ok(matches);
    }

    Err(anyhow!("Input does not exist: {:?}", path))
}

fn walk_directory(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_document(p))
        .inspect(|p| trace!("Found document: {:?}", p))
        .collect()
}

/// Supported extension, and not one of Word's `~$name.docx` owner files
pub fn is_document(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with("~$"))
        .unwrap_or(false);

    !is_lock_file
        && path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                DOCUMENT_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
}

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}
