//! Small path helpers shared by configuration and host-key handling.

use std::ffi::OsStr;

/// Expands a leading `~` or `~/` to the value of `HOME`.
///
/// Paths without a tilde prefix, or any path when `HOME` is unset, are
/// returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    expand_tilde_with(path, std::env::var_os("HOME").as_deref())
}

pub(crate) fn expand_tilde_with(path: &str, home: Option<&OsStr>) -> String {
    let Some(home_dir) = home else {
        return path.to_owned();
    };
    let home_text = home_dir.to_string_lossy();
    let home_trimmed = home_text.trim_end_matches('/');
    if path == "~" {
        return home_trimmed.to_owned();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return format!("{home_trimmed}/{rest}");
    }
    path.to_owned()
}
