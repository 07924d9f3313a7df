//! Filename sanitization policy driven by a [`FilesystemProfile`].

use super::FilesystemProfile;

/// Make `name` safe to use as a single path component on the profiled
/// filesystem.
///
/// - POSIX-like: `/` and control characters become `_`.
/// - Otherwise: `< > : " / \ | ? *` and control characters become `_`, and a
///   trailing run of spaces/dots is stripped.
/// - Without unicode support every non-ASCII character becomes `_` as well.
///
/// Pure and idempotent for a given profile.
pub fn sanitize(name: &str, profile: &FilesystemProfile) -> String {
    let mut clean: String = if profile.is_posix_like {
        name.chars()
            .map(|c| if c == '/' || c.is_control() { '_' } else { c })
            .collect()
    } else {
        let mapped: String = name
            .chars()
            .map(|c| {
                if c.is_control()
                    || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
                {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        mapped.trim_end_matches([' ', '.']).to_string()
    };

    if !profile.supports_unicode_names {
        clean = clean
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
    }
    clean
}

/// Truncate `name` to at most `max_bytes` bytes, cutting the stem on a char
/// boundary and keeping the extension when it fits.
///
/// On non-POSIX profiles a cut stem never ends in a space or dot.
pub fn fit_name(name: &str, max_bytes: usize, profile: &FilesystemProfile) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot < max_bytes => name.split_at(dot),
        _ => (name, ""),
    };
    let budget = max_bytes - ext.len();
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut stem = &stem[..cut];
    if !profile.is_posix_like {
        stem = stem.trim_end_matches([' ', '.']);
    }
    format!("{}{}", stem, ext)
}
