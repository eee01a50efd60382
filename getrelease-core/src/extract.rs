// getrelease-core/src/extract.rs
//! Materializes a downloaded asset into its own directory under `data_dir`.
//!
//! Everything is unpacked into a hidden temp directory first and renamed into
//! place only when the whole archive succeeded, so a failed extraction never
//! leaves a usable-looking directory behind.
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use getrelease_common::error::{GrError, Result};
use tar::{Archive, EntryType};
use tracing::{debug, error};
use xz2::read::XzDecoder;
use zip::read::ZipArchive;

const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";
const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
    Zip,
    /// A single gzip-compressed file.
    Gz,
    Bz2,
    Xz,
    /// Not an archive; the asset is the executable.
    Raw,
}

impl ArchiveKind {
    /// Sniffs the file's magic bytes, looking inside compressed streams for a
    /// tar header.
    pub fn detect(path: &Path) -> Result<Self> {
        let head = read_prefix(open(path)?, SNIFF_LEN)
            .map_err(|e| extraction_err(path, format!("cannot read file: {e}")))?;
        let Some(kind) = infer::get(&head) else {
            return Ok(if is_tar(&head) { Self::Tar } else { Self::Raw });
        };
        debug!("{} sniffed as {}", path.display(), kind.mime_type());
        let inner = |decoded: io::Result<Vec<u8>>| decoded.map(|b| is_tar(&b)).unwrap_or(false);
        let detected = match kind.extension() {
            "gz" if inner(read_prefix(GzDecoder::new(open(path)?), SNIFF_LEN)) => Self::TarGz,
            "gz" => Self::Gz,
            "bz2" if inner(read_prefix(BzDecoder::new(open(path)?), SNIFF_LEN)) => Self::TarBz2,
            "bz2" => Self::Bz2,
            "xz" if inner(read_prefix(XzDecoder::new(open(path)?), SNIFF_LEN)) => Self::TarXz,
            "xz" => Self::Xz,
            "zip" => Self::Zip,
            "tar" => Self::Tar,
            other if kind.matcher_type() == infer::MatcherType::Archive => {
                return Err(extraction_err(
                    path,
                    format!("unsupported archive format '{other}'"),
                ))
            }
            _ => Self::Raw,
        };
        Ok(detected)
    }
}

fn is_tar(head: &[u8]) -> bool {
    head.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()) == Some(TAR_MAGIC)
}

fn read_prefix<R: Read>(reader: R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    reader.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| extraction_err(path, format!("cannot open: {e}")))
}

fn extraction_err(path: &Path, reason: impl Into<String>) -> GrError {
    GrError::ExtractionError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Directory name for an asset: the file name minus archive/compression
/// suffixes.
pub fn asset_stem(file_name: &str) -> &str {
    const SUFFIXES: &[&str] = &[
        ".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".tbz2", ".tbz", ".txz", ".tar", ".zip",
        ".gz", ".bz2", ".xz",
    ];
    let lower = file_name.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|s| lower.ends_with(*s) && lower.len() > s.len())
        .map(|s| &file_name[..file_name.len() - s.len()])
        .unwrap_or(file_name)
}

/// Unpacks `asset` into `<data_dir>/<asset stem>` and returns that directory.
///
/// A previous directory of the same name is replaced.
pub fn extract(asset: &Path, data_dir: &Path) -> Result<PathBuf> {
    let file_name = asset
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| extraction_err(asset, "asset path has no file name"))?;
    let kind = ArchiveKind::detect(asset)?;
    let target = data_dir.join(asset_stem(&file_name));
    debug!(
        "Extracting {} ({:?}) to {}",
        asset.display(),
        kind,
        target.display()
    );

    fs::create_dir_all(data_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(data_dir)?;

    let unpacked = match kind {
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(open(asset)?), staging.path(), asset),
        ArchiveKind::TarBz2 => unpack_tar(BzDecoder::new(open(asset)?), staging.path(), asset),
        ArchiveKind::TarXz => unpack_tar(XzDecoder::new(open(asset)?), staging.path(), asset),
        ArchiveKind::Tar => unpack_tar(open(asset)?, staging.path(), asset),
        ArchiveKind::Zip => unpack_zip(open(asset)?, staging.path(), asset),
        ArchiveKind::Gz => write_single(GzDecoder::new(open(asset)?), staging.path(), &file_name, asset),
        ArchiveKind::Bz2 => write_single(BzDecoder::new(open(asset)?), staging.path(), &file_name, asset),
        ArchiveKind::Xz => write_single(XzDecoder::new(open(asset)?), staging.path(), &file_name, asset),
        ArchiveKind::Raw => write_single(open(asset)?, staging.path(), &file_name, asset),
    };
    if let Err(e) = unpacked {
        error!("Extraction of {} failed: {}", asset.display(), e);
        // `staging` is dropped here, removing the partial tree.
        return Err(e);
    }

    if target.symlink_metadata().is_ok() {
        debug!("Replacing previous extraction at {}", target.display());
        if target.is_dir() {
            fs::remove_dir_all(&target)?;
        } else {
            fs::remove_file(&target)?;
        }
    }
    fs::rename(staging.path(), &target).map_err(|e| {
        extraction_err(
            asset,
            format!("cannot move extracted files to {}: {e}", target.display()),
        )
    })?;
    debug!("Extracted {} to {}", asset.display(), target.display());
    Ok(target)
}

/// Joins an archive entry path onto `root`, rejecting anything that could
/// escape it.
fn safe_join(root: &Path, entry: &Path, archive: &Path) -> Result<PathBuf> {
    let mut out = root.to_path_buf();
    for comp in entry.components() {
        match comp {
            Component::Normal(p) => out.push(p),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(extraction_err(
                    archive,
                    format!("unsafe entry path '{}'", entry.display()),
                ));
            }
        }
    }
    Ok(out)
}

/// Requires a symlink stored at `link` (already inside `root`) to point at
/// a relative location that stays inside `root`.
fn check_symlink_target(root: &Path, link: &Path, target: &Path, archive: &Path) -> Result<()> {
    let escapes = || {
        extraction_err(
            archive,
            format!(
                "symlink '{}' -> '{}' points outside the extraction directory",
                link.strip_prefix(root).unwrap_or(link).display(),
                target.display()
            ),
        )
    };
    let mut resolved = link.parent().map(Path::to_path_buf).ok_or_else(escapes)?;
    for comp in target.components() {
        match comp {
            Component::Normal(p) => resolved.push(p),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(root) {
                    return Err(escapes());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(escapes())
    }
}

/// Links are created only after every file and directory is on disk, so no
/// entry is ever written through one.
#[derive(Default)]
struct DeferredLinks {
    symlinks: Vec<(PathBuf, PathBuf)>,
    /// Link path, already-joined target path.
    hardlinks: Vec<(PathBuf, PathBuf)>,
}

impl DeferredLinks {
    fn create(self, root: &Path, archive: &Path) -> Result<()> {
        for (link, target) in &self.symlinks {
            if link.symlink_metadata().is_ok() {
                return Err(extraction_err(
                    archive,
                    format!("symlink '{}' collides with another entry", link.display()),
                ));
            }
            make_symlink(target, link).map_err(|e| {
                extraction_err(
                    archive,
                    format!("cannot create symlink {}: {e}", link.display()),
                )
            })?;
        }

        // Each target was checked on its own; a chain of links can still
        // resolve elsewhere.
        let canonical_root = root.canonicalize()?;
        let inside = |path: &Path| {
            path.canonicalize()
                .map(|p| p.starts_with(&canonical_root))
                .unwrap_or(true)
        };
        if let Some((link, _)) = self.symlinks.iter().find(|(link, _)| !inside(link.as_path())) {
            return Err(extraction_err(
                archive,
                format!("symlink '{}' resolves outside the extraction directory", link.display()),
            ));
        }

        for (link, target) in self.hardlinks {
            let target_dir_inside = target.parent().is_some_and(|dir| {
                dir.canonicalize()
                    .map(|p| p.starts_with(&canonical_root))
                    .unwrap_or(false)
            });
            if !target_dir_inside {
                return Err(extraction_err(
                    archive,
                    format!("hardlink target '{}' is outside the extraction directory", target.display()),
                ));
            }
            if link.symlink_metadata().is_ok() {
                fs::remove_file(&link)?;
            }
            hard_link(&target, &link).map_err(|e| {
                extraction_err(
                    archive,
                    format!(
                        "cannot create hardlink {} -> {}: {e}",
                        link.display(),
                        target.display()
                    ),
                )
            })?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    tracing::warn!(
        "Skipping symlink {} -> {} on this platform",
        link.display(),
        target.display()
    );
    Ok(())
}

#[cfg(unix)]
fn hard_link(target: &Path, link: &Path) -> io::Result<()> {
    fs::hard_link(target, link)
}

#[cfg(not(unix))]
fn hard_link(target: &Path, link: &Path) -> io::Result<()> {
    tracing::warn!(
        "Skipping hardlink {} -> {} on this platform",
        link.display(),
        target.display()
    );
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, root: &Path, archive_path: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut deferred = DeferredLinks::default();

    let entries = archive
        .entries()
        .map_err(|e| extraction_err(archive_path, format!("not a readable tar stream: {e}")))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| extraction_err(archive_path, format!("corrupt tar entry: {e}")))?;
        let in_archive = entry
            .path()
            .map_err(|e| extraction_err(archive_path, format!("invalid tar path: {e}")))?
            .into_owned();
        let dest = safe_join(root, &in_archive, archive_path)?;
        if dest == root {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let entry_type = entry.header().entry_type();
        if entry_type == EntryType::Link || entry_type == EntryType::Symlink {
            let Ok(Some(target)) = entry.link_name() else {
                return Err(extraction_err(
                    archive_path,
                    format!("link '{}' has no target", in_archive.display()),
                ));
            };
            let target = target.into_owned();
            if entry_type == EntryType::Link {
                let target = safe_join(root, &target, archive_path)?;
                deferred.hardlinks.push((dest, target));
            } else {
                check_symlink_target(root, &dest, &target, archive_path)?;
                deferred.symlinks.push((dest, target));
            }
            continue;
        }

        entry.unpack(&dest).map_err(|e| {
            extraction_err(
                archive_path,
                format!("cannot unpack '{}': {e}", in_archive.display()),
            )
        })?;
    }

    deferred.create(root, archive_path)
}

fn unpack_zip<R: Read + Seek>(reader: R, root: &Path, archive_path: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| extraction_err(archive_path, format!("not a readable zip: {e}")))?;
    let mut deferred = DeferredLinks::default();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| extraction_err(archive_path, format!("corrupt zip entry {i}: {e}")))?;
        let in_archive = file.enclosed_name().ok_or_else(|| {
            extraction_err(archive_path, format!("unsafe entry path '{}'", file.name()))
        })?;
        let dest = safe_join(root, &in_archive, archive_path)?;
        let mode = file.unix_mode();
        let is_symlink = mode.is_some_and(|m| m & 0o170000 == 0o120000);

        if file.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if is_symlink {
            let mut target = String::new();
            file.read_to_string(&mut target)?;
            let target = PathBuf::from(target);
            check_symlink_target(root, &dest, &target, archive_path)?;
            deferred.symlinks.push((dest, target));
            continue;
        }

        let mut out = File::create(&dest)?;
        io::copy(&mut file, &mut out).map_err(|e| {
            extraction_err(
                archive_path,
                format!("cannot unpack '{}': {e}", in_archive.display()),
            )
        })?;
        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dest, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }
    deferred.create(root, archive_path)
}

/// Writes a non-archive asset as one executable file named after its stem.
fn write_single<R: Read>(mut reader: R, root: &Path, file_name: &str, asset: &Path) -> Result<()> {
    let dest = root.join(asset_stem(file_name));
    let mut out = File::create(&dest)?;
    io::copy(&mut reader, &mut out)
        .map_err(|e| extraction_err(asset, format!("cannot decompress: {e}")))?;
    out.sync_all()?;
    mark_executable(&dest)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
