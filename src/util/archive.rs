// ─── Archive extraction ───
// ZIP and tar.gz unpacking share one shape: extract everything under a
// destination directory, surface each entry to an optional callback, and
// report the first top-level entry name (JDK archives wrap the
// installation in a single root directory).

use std::fs;
use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Called once per extracted entry with its archive-relative path.
pub type EntryCallback<'a> = &'a mut dyn FnMut(&Path);

/// Extract a ZIP archive. Returns the first top-level entry name.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> CoreResult<Option<String>> {
    let file = fs::File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
    extract_zip_from(file, archive_path, dest, &mut |_| {})
}

/// Extract a ZIP archive from any seekable reader, invoking `on_entry`
/// per entry header.
pub fn extract_zip_from<R: Read + Seek>(
    reader: R,
    archive_path: &Path,
    dest: &Path,
    on_entry: EntryCallback<'_>,
) -> CoreResult<Option<String>> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut root: Option<String> = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(CoreError::MalformedArchive {
                path: archive_path.to_path_buf(),
                reason: format!("unsafe entry name: {}", entry.name()),
            });
        };

        if root.is_none() {
            root = top_level_component(&rel);
        }
        on_entry(&rel);

        let out_path = dest.join(&rel);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| CoreError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let mut out = fs::File::create(&out_path).map_err(|e| CoreError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| CoreError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode));
        }
    }

    debug!("Extracted {:?} -> {:?}", archive_path, dest);
    Ok(root)
}

/// Extract a gzip-compressed tarball. Returns the first top-level entry name.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> CoreResult<Option<String>> {
    extract_tar_gz_with(archive_path, dest, &mut |_| {})
}

/// Extract a tarball invoking `on_entry` per entry header.
pub fn extract_tar_gz_with(
    archive_path: &Path,
    dest: &Path,
    on_entry: EntryCallback<'_>,
) -> CoreResult<Option<String>> {
    let file = fs::File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut root: Option<String> = None;

    fs::create_dir_all(dest).map_err(|e| CoreError::io(dest, e))?;

    let entries = archive
        .entries()
        .map_err(|e| CoreError::MalformedArchive {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| CoreError::MalformedArchive {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let rel: PathBuf = entry
            .path()
            .map_err(|e| CoreError::MalformedArchive {
                path: archive_path.to_path_buf(),
                reason: e.to_string(),
            })?
            .into_owned();

        if root.is_none() {
            root = top_level_component(&rel);
        }
        on_entry(&rel);

        entry
            .unpack_in(dest)
            .map_err(|e| CoreError::io(dest, e))?;
    }

    debug!("Extracted {:?} -> {:?}", archive_path, dest);
    Ok(root)
}

/// Dispatch on the archive filename: `.zip` vs `.tar.gz` / `.tgz`.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> CoreResult<Option<String>> {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if name.ends_with(".zip") {
        extract_zip(archive_path, dest)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest)
    } else {
        Err(CoreError::MalformedArchive {
            path: archive_path.to_path_buf(),
            reason: "unrecognized archive extension".into(),
        })
    }
}

fn top_level_component(rel: &Path) -> Option<String> {
    rel.components().find_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    })
}
