//! Capability probes that create throwaway files under the sync root.
//!
//! Every probe cleans up after itself and never fails: any I/O error
//! degrades to the conservative answer for that capability.

use std::fs;
use std::io;
use std::path::Path;

/// Name of the scratch folder used by the case-sensitivity probe.
const CASE_CHECK_FOLDER: &str = ".gphotos_case_check";

/// Whether symbolic links can be created in `root_folder`.
///
/// Album folders are materialized as symlinks, so a `false` here means
/// albums will not be synced.
pub fn probe_symlink_support(root_folder: &Path) -> bool {
    tracing::debug!("Checking if filesystem supports symbolic links...");
    let src = root_folder.join(format!("test_src_{}", rand::random::<u32>()));
    let dst = root_folder.join(format!("test_dst_{}", rand::random::<u32>()));

    let result = fs::File::create(&src).and_then(|_| make_symlink(&src, &dst));

    // Clean up both artifacts regardless of outcome.
    let _ = fs::remove_file(&dst);
    let _ = fs::remove_file(&src);

    match result {
        Ok(()) => {
            tracing::info!("Filesystem supports symbolic links");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Symbolic links not supported");
            tracing::warn!("Albums are not going to be synced - requires symlinks");
            false
        }
    }
}

#[cfg(unix)]
fn make_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn make_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

#[cfg(not(any(unix, windows)))]
fn make_symlink(_src: &Path, _dst: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks unsupported on this platform",
    ))
}

/// Whether a name containing a non-ASCII code point can be created.
pub fn probe_unicode_name_support(root_folder: &Path) -> bool {
    tracing::debug!("Checking if filesystem supports unicode filenames...");
    let test_file = root_folder.join(".unicode_test.\u{1F604}");
    match fs::File::create(&test_file) {
        Ok(_) => {
            let _ = fs::remove_file(&test_file);
            tracing::info!("Filesystem supports Unicode filenames");
            true
        }
        Err(e) => {
            tracing::info!(error = %e, "Filesystem does not support Unicode filenames");
            false
        }
    }
}

/// Whether two names differing only by case are distinct entries.
pub fn probe_case_sensitivity(root_folder: &Path) -> bool {
    tracing::debug!("Checking if filesystem is case sensitive...");
    let check_folder = root_folder.join(CASE_CHECK_FOLDER);

    let result = count_case_variants(&check_folder);
    let _ = fs::remove_dir_all(&check_folder);

    match result {
        Ok(2) => {
            tracing::info!("Case sensitive filesystem found");
            true
        }
        Ok(seen) => {
            tracing::info!(entries = seen, "Case insensitive filesystem found");
            false
        }
        Err(e) => {
            tracing::info!(error = %e, "Case probe failed, assuming case insensitive");
            false
        }
    }
}

fn count_case_variants(check_folder: &Path) -> io::Result<usize> {
    // A stale folder from an interrupted run would skew the count.
    if check_folder.exists() {
        fs::remove_dir_all(check_folder)?;
    }
    fs::create_dir(check_folder)?;
    fs::File::create(check_folder.join("Temp.Test"))?;
    fs::File::create(check_folder.join("TEMP.TEST"))?;
    let mut count = 0;
    for entry in fs::read_dir(check_folder)? {
        entry?;
        count += 1;
    }
    Ok(count)
}
