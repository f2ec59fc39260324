use std::path::Path;

use sha2::{Digest, Sha256};

/// Derives the per-repo tmux socket name. The name is a stable hash of the
/// repository path so a relaunch against the same repo finds its prior
/// sessions, while different repos get disjoint socket namespaces.
pub fn socket_name(repo_path: &Path) -> String {
    let digest = Sha256::digest(repo_path.to_string_lossy().as_bytes());
    format!(
        "atc-{:02x}{:02x}{:02x}{:02x}",
        digest[0], digest[1], digest[2], digest[3]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn stable_across_calls_and_distinct_across_repos() {
        let a = PathBuf::from("/home/user/projects/alpha");
        let b = PathBuf::from("/home/user/projects/beta");
        assert_eq!(socket_name(&a), socket_name(&a));
        assert_ne!(socket_name(&a), socket_name(&b));
        assert!(socket_name(&a).starts_with("atc-"));
        // "atc-" + 4 bytes of hex.
        assert_eq!(socket_name(&a).len(), 4 + 8);
    }
}
