//! The probed capability profile of a sync root.

use std::path::Path;
use std::sync::OnceLock;

use serde::Serialize;

use super::limits::{self, FALLBACK_MAX_LENGTH};
use super::probe;

/// Filesystem feature flags and limits that parameterize local filenames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesystemProfile {
    /// Lower-cased filesystem type from the mount table (e.g. `ext4`, `vfat`).
    pub filesystem_kind: String,
    pub max_path_length: usize,
    pub max_name_length: usize,
    /// False for FAT/NTFS style filesystems, which reject a wider character set.
    pub is_posix_like: bool,
    pub supports_unicode_names: bool,
    pub is_case_sensitive: bool,
    pub supports_symlinks: bool,
}

static PROCESS_PROFILE: OnceLock<FilesystemProfile> = OnceLock::new();

/// Profile for the process, probed against `root_folder` on first call.
///
/// Later calls return the cached value whatever root they pass; use
/// [`FilesystemProfile::probe`] to re-probe explicitly.
pub fn process_profile(root_folder: &Path) -> &'static FilesystemProfile {
    PROCESS_PROFILE.get_or_init(|| FilesystemProfile::probe(root_folder))
}

impl FilesystemProfile {
    /// Probe every capability axis under `root_folder`.
    ///
    /// Performs blocking I/O (scratch files, mount table, statvfs). Never
    /// fails: each axis degrades to its conservative value on error.
    pub fn probe(root_folder: &Path) -> Self {
        let filesystem_kind = limits::detect_filesystem_kind(root_folder);
        let is_posix_like = kind_is_posix_like(&filesystem_kind);
        let profile = Self {
            is_posix_like,
            max_path_length: limits::max_path_length(root_folder),
            max_name_length: limits::max_name_length(root_folder),
            supports_unicode_names: probe::probe_unicode_name_support(root_folder),
            is_case_sensitive: probe::probe_case_sensitivity(root_folder),
            supports_symlinks: probe::probe_symlink_support(root_folder),
            filesystem_kind,
        };
        tracing::debug!(?profile, "Filesystem profile");
        profile
    }

    /// The most restrictive profile: Windows character rules, ASCII only,
    /// case insensitive, no symlinks, fallback limits.
    pub fn conservative() -> Self {
        Self {
            filesystem_kind: String::new(),
            max_path_length: FALLBACK_MAX_LENGTH,
            max_name_length: FALLBACK_MAX_LENGTH,
            is_posix_like: false,
            supports_unicode_names: false,
            is_case_sensitive: false,
            supports_symlinks: false,
        }
    }

    /// A typical Linux profile (ext4 limits, everything supported).
    pub fn posix_default() -> Self {
        Self {
            filesystem_kind: "ext4".to_string(),
            max_path_length: 4096,
            max_name_length: 255,
            is_posix_like: true,
            supports_unicode_names: true,
            is_case_sensitive: true,
            supports_symlinks: true,
        }
    }

    pub fn with_unicode(mut self, supported: bool) -> Self {
        self.supports_unicode_names = supported;
        self
    }

    /// Longest name that can be created directly inside `parent`, honoring
    /// both the name limit and the overall path limit.
    pub fn name_budget(&self, parent: &Path) -> usize {
        let used = parent.as_os_str().len() + 1;
        self.max_name_length
            .min(self.max_path_length.saturating_sub(used))
    }
}

/// FAT variants and NTFS use Windows naming rules.
fn kind_is_posix_like(kind: &str) -> bool {
    !(kind.contains("fat") || kind.contains("ntfs"))
}
