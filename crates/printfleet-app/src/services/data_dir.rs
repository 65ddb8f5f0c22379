// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::PathBuf;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "PRINTFLEET_DATA_DIR";

/// Return the application data directory.
///
/// `PRINTFLEET_DATA_DIR` wins; otherwise the XDG data home (or
/// `~/.local/share`) gets a `printfleet` subdirectory.
pub fn data_dir() -> PathBuf {
    resolve(|key| std::env::var(key).ok())
}

pub(crate) fn resolve(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let base = if let Some(xdg) = lookup("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = lookup("HOME") {
        PathBuf::from(home).join(".local").join("share")
    } else {
        // Last resort
        PathBuf::from("/tmp")
    };
    base.join("printfleet")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_override_is_used_verbatim() {
        let dir = resolve(env(&[(DATA_DIR_ENV, "/srv/fleet"), ("HOME", "/home/u")]));
        assert_eq!(dir, PathBuf::from("/srv/fleet"));
    }

    #[test]
    fn xdg_then_home_then_tmp() {
        assert_eq!(
            resolve(env(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/u")])),
            PathBuf::from("/xdg/printfleet")
        );
        assert_eq!(
            resolve(env(&[("HOME", "/home/u")])),
            PathBuf::from("/home/u/.local/share/printfleet")
        );
        assert_eq!(resolve(env(&[])), PathBuf::from("/tmp/printfleet"));
    }
}
