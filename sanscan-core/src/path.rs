use std::path::{Component, Path, PathBuf};

/// Expands a leading `~` and makes `raw` absolute against the current
/// working directory. `.` and `..` components are folded lexically; the
/// filesystem is never consulted, so the result may not exist.
pub fn resolve<P: AsRef<Path>>(raw: P) -> PathBuf {
    let expanded = expand_home(raw.as_ref());
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(e) => {
                log::warn!("Cannot determine working directory: {e}");
                expanded
            }
        }
    };
    normalize(&absolute)
}

fn expand_home(raw: &Path) -> PathBuf {
    let mut components = raw.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => raw.to_path_buf(),
        },
        _ => raw.to_path_buf(),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, as with `/..`.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_only_normalized() {
        assert_eq!(resolve("/usr/bin/../lib/./libc.so"), PathBuf::from("/usr/lib/libc.so"));
        assert_eq!(resolve("/.."), PathBuf::from("/"));
    }

    #[test]
    fn relative_paths_join_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve("build/app"), cwd.join("build").join("app"));
        assert!(resolve("./app").is_absolute());
    }

    #[test]
    fn home_marker_is_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(resolve("~/bin/app"), normalize(&home.join("bin/app")));
        assert_eq!(resolve("~"), normalize(&home));
    }

    #[test]
    fn tilde_inside_a_name_is_literal() {
        let resolved = resolve("/tmp/~backup");
        assert_eq!(resolved, PathBuf::from("/tmp/~backup"));
    }
}
