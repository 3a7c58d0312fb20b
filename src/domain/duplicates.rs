//! Duplicate resolution for bulk roster imports.
//!
//! Identifiers that collide with an existing entry, or with an earlier identifier
//! in the same batch, get a numeric suffix (`alice`, `alice-1`, `alice-2`, ...).

use std::collections::HashSet;

const SUFFIX_SEPARATOR: char = '-';

/// Returns one unique identifier per candidate, in the same order.
///
/// Candidates not yet taken are kept as-is. A taken candidate becomes the first
/// `{candidate}-{n}` (n = 1, 2, ...) that is free. Every output is added to the
/// taken set, so later candidates never collide with earlier outputs.
pub fn resolve_duplicates<S: AsRef<str>>(candidates: &[S], existing: &HashSet<String>) -> Vec<String> {
    let mut taken: HashSet<String> = existing.clone();
    let mut resolved = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let identifier = if taken.contains(candidate) {
            next_free_suffix(candidate, &taken)
        } else {
            candidate.to_string()
        };
        taken.insert(identifier.clone());
        resolved.push(identifier);
    }

    resolved
}

/// Unbounded: `taken` is finite, so a free suffix always exists.
fn next_free_suffix(base: &str, taken: &HashSet<String>) -> String {
    let mut n: u64 = 1;
    loop {
        let suffixed = format!("{base}{SUFFIX_SEPARATOR}{n}");
        if !taken.contains(&suffixed) {
            return suffixed;
        }
        n += 1;
    }
}
