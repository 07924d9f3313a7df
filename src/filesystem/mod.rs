//! Filesystem capability profiling.
//!
//! The target filesystem is probed once for the axes that influence local
//! filenames: mount type (which character class is illegal), unicode name
//! support, case sensitivity, symlink support and name/path length limits.
//! The resulting [`FilesystemProfile`] parameterizes [`sanitize`] and is
//! passed explicitly to anything that builds local names.

pub mod limits;
pub mod probe;
pub mod profile;
pub mod sanitize;

pub use limits::{detect_filesystem_kind, max_name_length, max_path_length, FALLBACK_MAX_LENGTH};
pub use probe::{probe_case_sensitivity, probe_symlink_support, probe_unicode_name_support};
pub use profile::{process_profile, FilesystemProfile};
pub use sanitize::{fit_name, sanitize};
