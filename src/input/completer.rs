use std::collections::BTreeSet;
use std::path::PathBuf;
use std::{env, fs};

use crate::core::commands::BUILTIN_NAMES;
use crate::core::resolver;

/// Gathers command-name completion candidates from the builtin set and
/// the executables on the search path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCompleter;

impl ShellCompleter {
    pub fn new() -> Self {
        Self
    }

    /// All candidates starting with `prefix`, deduplicated and sorted.
    pub fn candidates(&self, prefix: &str) -> Vec<String> {
        let dirs: Vec<PathBuf> = match env::var_os("PATH") {
            Some(path_var) => env::split_paths(&path_var).collect(),
            None => Vec::new(),
        };
        self.candidates_in(prefix, &dirs)
    }

    /// Candidate gathering over an explicit directory list; the
    /// environment-backed `candidates` wraps this.
    pub fn candidates_in(&self, prefix: &str, dirs: &[PathBuf]) -> Vec<String> {
        let mut matches = BTreeSet::new();

        for name in BUILTIN_NAMES {
            if name.starts_with(prefix) {
                matches.insert(name.to_string());
            }
        }

        for dir in dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.filter_map(Result::ok) {
                let Some(name) = entry.file_name().to_str().map(String::from) else {
                    continue;
                };
                if name.starts_with(prefix) && resolver::is_executable(&entry.path()) {
                    matches.insert(name);
                }
            }
        }

        matches.into_iter().collect()
    }
}

/// Longest prefix shared by every candidate.
pub fn common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut prefix = first.as_str();
    for candidate in &candidates[1..] {
        let shared = prefix
            .char_indices()
            .zip(candidate.chars())
            .take_while(|((_, a), b)| a == b)
            .count();
        let end = prefix
            .char_indices()
            .nth(shared)
            .map(|(i, _)| i)
            .unwrap_or(prefix.len());
        prefix = &prefix[..end];
        if prefix.is_empty() {
            break;
        }
    }
    prefix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("vena_completer_{}_{}", tag, std::process::id()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn place_file(dir: &Path, name: &str, mode: u32) {
        let path = dir.join(name);
        let mut file = File::create(&path).expect("create file");
        writeln!(file, "#!/bin/sh").expect("write file");
        let mut perms = file.metadata().expect("metadata").permissions();
        perms.set_mode(mode);
        fs::set_permissions(&path, perms).expect("set mode");
    }

    #[test]
    fn test_candidates_are_sorted_and_deduplicated() {
        let dir = scratch_dir("sorted");
        place_file(&dir, "echo", 0o755);
        place_file(&dir, "ec-tool", 0o755);
        place_file(&dir, "ec-aaa", 0o755);

        let completer = ShellCompleter::new();
        let found = completer.candidates_in("ec", &[dir.clone()]);
        // "echo" appears once despite being both a builtin and a file.
        assert_eq!(found, ["ec-aaa", "ec-tool", "echo"]);

        // Same inputs, same ordered output.
        assert_eq!(found, completer.candidates_in("ec", &[dir.clone()]));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_non_executables_are_not_candidates() {
        let dir = scratch_dir("noexec");
        place_file(&dir, "zz-script", 0o644);

        let completer = ShellCompleter::new();
        assert!(completer.candidates_in("zz", &[dir.clone()]).is_empty());

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_builtins_complete_without_any_path() {
        let completer = ShellCompleter::new();
        assert_eq!(completer.candidates_in("pw", &[]), ["pwd"]);
        assert_eq!(completer.candidates_in("e", &[]), ["echo", "exit"]);
    }

    #[test]
    fn test_common_prefix() {
        let candidates = vec!["xyz_foo".to_string(), "xyz_fob".to_string()];
        assert_eq!(common_prefix(&candidates), "xyz_fo");
        assert_eq!(common_prefix(&["solo".to_string()]), "solo");
        assert_eq!(common_prefix(&[]), "");
        let disjoint = vec!["abc".to_string(), "xbc".to_string()];
        assert_eq!(common_prefix(&disjoint), "");
    }
}
