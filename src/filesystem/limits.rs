//! Mount table lookup and OS-reported length limits.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use sysinfo::Disks;

/// Limit used when the OS cannot tell us. Sized for the most restrictive
/// filesystem we write to (FAT/NTFS through Windows APIs).
pub const FALLBACK_MAX_LENGTH: usize = 248;

static MOUNT_TABLE: OnceLock<Vec<(PathBuf, String)>> = OnceLock::new();

/// Mount points and their filesystem types, read on first use and cached
/// for the life of the process.
fn mount_table() -> &'static [(PathBuf, String)] {
    MOUNT_TABLE.get_or_init(|| {
        Disks::new_with_refreshed_list()
            .list()
            .iter()
            .map(|disk| {
                (
                    disk.mount_point().to_path_buf(),
                    disk.file_system().to_string_lossy().into_owned(),
                )
            })
            .collect()
    })
}

/// Return the lower-cased filesystem type of the mount holding `path`.
///
/// The mount point that is the longest prefix of `path` wins; the root
/// mount is the fallback. Returns an empty string if the mount table
/// cannot be read or has no usable entry. The mount table itself is read
/// once per process.
pub fn detect_filesystem_kind(path: &Path) -> String {
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let kind = select_mount(mount_table(), &target)
        .unwrap_or_default()
        .to_lowercase();
    tracing::info!(path = %path.display(), filesystem = %kind, "Detected target filesystem");
    kind
}

/// Pick the filesystem type of the longest mount point containing `path`.
fn select_mount<'a>(mounts: &'a [(PathBuf, String)], path: &Path) -> Option<&'a str> {
    mounts
        .iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.as_os_str().len())
        .or_else(|| mounts.iter().find(|(mount, _)| mount == Path::new("/")))
        .map(|(_, fs)| fs.as_str())
}

/// Maximum path length for files under `path`.
pub fn max_path_length(path: &Path) -> usize {
    match query_path_max(path) {
        Some(len) => {
            tracing::debug!(max_path_length = len, "Queried max path length");
            len
        }
        None => {
            tracing::warn!(
                "Can't determine max path length, defaulting to {}",
                FALLBACK_MAX_LENGTH
            );
            FALLBACK_MAX_LENGTH
        }
    }
}

/// Maximum length of a single name component under `path`.
pub fn max_name_length(path: &Path) -> usize {
    match query_name_max(path) {
        Some(len) => {
            tracing::debug!(max_name_length = len, "Queried max filename length");
            len
        }
        None => {
            tracing::warn!(
                "Can't determine max filename length, defaulting to {}",
                FALLBACK_MAX_LENGTH
            );
            FALLBACK_MAX_LENGTH
        }
    }
}

#[cfg(unix)]
fn c_path(path: &Path) -> Option<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(unix)]
fn query_path_max(path: &Path) -> Option<usize> {
    let c_path = c_path(path)?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    let value = unsafe { libc::pathconf(c_path.as_ptr(), libc::_PC_PATH_MAX) };
    usize::try_from(value).ok().filter(|v| *v > 0)
}

#[cfg(unix)]
fn query_name_max(path: &Path) -> Option<usize> {
    let c_path = c_path(path)?;
    // SAFETY: statvfs is plain old data; zeroed is a valid initial state and
    // the kernel fills it on success.
    let mut info: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut info) };
    if rc != 0 {
        return None;
    }
    usize::try_from(info.f_namemax).ok().filter(|v| *v > 0)
}

#[cfg(not(unix))]
fn query_path_max(_path: &Path) -> Option<usize> {
    None
}

#[cfg(not(unix))]
fn query_name_max(_path: &Path) -> Option<usize> {
    None
}
