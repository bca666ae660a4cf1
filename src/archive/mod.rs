//! ZIP packaging of converted PDFs.
//!
//! The archive is assembled in a temporary file inside the destination
//! directory and only renamed over the destination once every entry has been
//! written, so a failed run never leaves a truncated archive behind.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

use crate::error::PackagingError;

/// Write `pdfs` into a flat ZIP at `destination`, AES-256 encrypted when `password` is given.
///
/// `on_entry` is called after each entry with (entries written, total entries).
pub fn package<F>(
    pdfs: &[PathBuf],
    password: Option<&str>,
    destination: &Path,
    mut on_entry: F,
) -> Result<PathBuf, PackagingError>
where
    F: FnMut(usize, usize),
{
    if pdfs.is_empty() {
        return Err(PackagingError::NothingToPackage);
    }

    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let staging = tempfile::Builder::new()
        .prefix(".docbundle-")
        .suffix(".zip.part")
        .tempfile_in(dir)
        .map_err(|source| PackagingError::Destination {
            path: destination.to_path_buf(),
            source,
        })?;

    info!(
        "📦 Creating ZIP with {} PDF(s){}",
        pdfs.len(),
        if password.is_some() { " (AES-256)" } else { "" }
    );

    // On any error `staging` is dropped here and its file removed
    write_entries(&staging, pdfs, password, &mut on_entry)?;

    staging.as_file().sync_all()?;
    staging
        .persist(destination)
        .map_err(|e| PackagingError::Destination {
            path: destination.to_path_buf(),
            source: e.error,
        })?;

    info!("✅ Archive written: {:?}", destination);
    Ok(destination.to_path_buf())
}

fn write_entries<F>(
    staging: &NamedTempFile,
    pdfs: &[PathBuf],
    password: Option<&str>,
    on_entry: &mut F,
) -> Result<(), PackagingError>
where
    F: FnMut(usize, usize),
{
    let mut zip = ZipWriter::new(BufWriter::new(staging.as_file()));
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let names = entry_names(pdfs);

    for (done, (pdf, name)) in pdfs.iter().zip(&names).enumerate() {
        let options = match password {
            Some(password) => base.with_aes_encryption(AesMode::Aes256, password),
            None => base,
        };

        zip.start_file(name.as_str(), options).map_err(|source| {
            if password.is_some() {
                PackagingError::Encryption {
                    entry: name.clone(),
                    source,
                }
            } else {
                PackagingError::Zip(source)
            }
        })?;

        let mut input = File::open(pdf)?;
        std::io::copy(&mut input, &mut zip)?;
        debug!("Added {:?} as {}", pdf, name);
        on_entry(done + 1, pdfs.len());
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}

/// Flat entry names; duplicates are disambiguated so no PDF is shadowed
fn entry_names(pdfs: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    pdfs.iter()
        .map(|pdf| {
            let name = pdf
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());
            if used.insert(name.to_lowercase()) {
                return name;
            }
            let stem = Path::new(&name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (2..)
                .map(|n| format!("{stem} ({n}).pdf"))
                .find(|candidate| used.insert(candidate.to_lowercase()))
                .unwrap_or(name)
        })
        .collect()
}
