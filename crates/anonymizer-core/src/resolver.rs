use std::collections::HashSet;
use tracing::trace;

/// Return `candidate` if it is free, otherwise the first `stem-N{extension}`
/// (N = 1, 2, ...) that is not in `taken`.
///
/// `extension` is the original file's extension, which `candidate` ends with.
/// The disambiguator always goes right before it so the digest stem stays
/// intact, even when the prefix or separator contains a dot. The caller owns
/// `taken` and must insert the returned name before resolving the next candidate.
pub fn resolve(candidate: &str, extension: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(candidate) {
        return candidate.to_string();
    }

    let (stem, extension) = match candidate.strip_suffix(extension) {
        Some(stem) => (stem, extension),
        None => (candidate, ""),
    };
    // At most taken.len() names can block us, so this loop is bounded.
    let mut n: usize = 1;
    loop {
        let next = format!("{}-{}{}", stem, n, extension);
        if !taken.contains(&next) {
            trace!("Resolved collision on '{}' as '{}'", candidate, next);
            return next;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_candidate_is_unchanged() {
        assert_eq!(resolve("abcd.txt", ".txt", &set(&["other.txt"])), "abcd.txt");
    }

    #[test]
    fn test_disambiguator_before_extension() {
        assert_eq!(resolve("abcd.txt", ".txt", &set(&["abcd.txt"])), "abcd-1.txt");
        assert_eq!(
            resolve(
                "abcd.txt",
                ".txt",
                &set(&["abcd.txt", "abcd-1.txt", "abcd-2.txt"])
            ),
            "abcd-3.txt"
        );
        assert_eq!(resolve("abcd", "", &set(&["abcd"])), "abcd-1");
    }

    #[test]
    fn test_dotted_prefix_without_extension() {
        assert_eq!(
            resolve("anon.3f2a9c1b", "", &set(&["anon.3f2a9c1b"])),
            "anon.3f2a9c1b-1"
        );
        assert_eq!(
            resolve("anon.3f2a9c1b.gz", ".gz", &set(&["anon.3f2a9c1b.gz"])),
            "anon.3f2a9c1b-1.gz"
        );
    }

    #[test]
    fn test_terminates_within_n_plus_one() {
        let mut taken = set(&["f00d.bin"]);
        for i in 1..50 {
            taken.insert(format!("f00d-{}.bin", i));
        }
        let resolved = resolve("f00d.bin", ".bin", &taken);
        assert!(!taken.contains(&resolved));
        assert_eq!(resolved, "f00d-50.bin");
    }

    #[test]
    fn test_shared_candidate_in_one_batch() {
        let mut taken = HashSet::new();
        let mut out = Vec::new();
        for _ in 0..3 {
            let name = resolve("same.txt", ".txt", &taken);
            taken.insert(name.clone());
            out.push(name);
        }
        assert_eq!(out, vec!["same.txt", "same-1.txt", "same-2.txt"]);
    }
}
