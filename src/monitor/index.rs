//! Index of filenames currently considered present in the watch directory.

use indexmap::IndexSet;

/// Set of tracked filenames.
///
/// Iteration follows insertion order (seeded names first, then names added
/// by create events) so log output and snapshots are stable.
#[derive(Debug, Default, Clone)]
pub struct TrackedIndex {
    files: IndexSet<String>,
}

impl TrackedIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a filename is tracked.
    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains(filename)
    }

    /// Track a filename. Returns `false` if it was already tracked.
    pub fn add(&mut self, filename: &str) -> bool {
        if self.files.contains(filename) {
            return false;
        }
        self.files.insert(filename.to_string())
    }

    /// Stop tracking a filename. Returns `false` if it was not tracked.
    pub fn remove(&mut self, filename: &str) -> bool {
        self.files.shift_remove(filename)
    }

    /// Replace the contents with the given names.
    pub fn seed(&mut self, filenames: impl IntoIterator<Item = String>) {
        self.files.clear();
        self.files.extend(filenames);
    }

    /// Tracked filenames in iteration order.
    pub fn snapshot(&self) -> Vec<String> {
        self.files.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut index = TrackedIndex::new();

        assert!(index.add("dev1"));
        assert!(!index.add("dev1"));

        assert_eq!(index.len(), 1);
        assert!(index.contains("dev1"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut index = TrackedIndex::new();
        index.add("dev1");

        assert!(index.remove("dev1"));
        assert!(!index.remove("dev1"));
        assert!(!index.remove("never-added"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_seed_replaces_contents() {
        let mut index = TrackedIndex::new();
        index.add("stale");

        index.seed(vec!["dev0".to_string(), "dev1".to_string()]);

        assert!(!index.contains("stale"));
        assert_eq!(index.snapshot(), vec!["dev0", "dev1"]);
    }

    #[test]
    fn test_seed_collapses_duplicates() {
        let mut index = TrackedIndex::new();
        index.seed(vec!["dev0".to_string(), "dev0".to_string()]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_snapshot_order_is_stable_across_removal() {
        let mut index = TrackedIndex::new();
        index.seed(vec!["a".to_string(), "b".to_string(), "c".to_string()]);

        index.remove("b");
        index.add("d");

        assert_eq!(index.snapshot(), vec!["a", "c", "d"]);
        assert_eq!(index.iter().collect::<Vec<_>>(), vec!["a", "c", "d"]);
    }
}
