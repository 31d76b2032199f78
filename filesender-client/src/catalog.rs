//! Catalog of files the host advertises
//!
//! The catalog is an immutable snapshot behind an `Arc`. Every update swaps in
//! a new snapshot, so anyone still holding the old one keeps a complete and
//! consistent view.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use filesender_common::protocol::FileDescriptor;

/// Files keyed by their server-assigned id
pub type FileList = BTreeMap<i32, FileDescriptor>;

/// Last-known list of remotely available files
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    files: Arc<FileList>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog with a new snapshot
    ///
    /// Returns the snapshot now visible.
    pub fn apply_update(&mut self, files: FileList) -> Arc<FileList> {
        info!(count = files.len(), "file list updated");
        self.files = Arc::new(files);
        Arc::clone(&self.files)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<FileList> {
        Arc::clone(&self.files)
    }

    /// Look up a file by id
    pub fn get(&self, file_id: i32) -> Option<&FileDescriptor> {
        self.files.get(&file_id)
    }

    pub fn contains(&self, file_id: i32) -> bool {
        self.files.contains_key(&file_id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over files in id order
    pub fn iter(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.files.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: i32, name: &str) -> FileDescriptor {
        FileDescriptor {
            id,
            file_name: name.to_string(),
            file_size: 10,
            chunk_size: 10,
            chunk_count: 1,
        }
    }

    fn file_list(entries: &[(i32, &str)]) -> FileList {
        entries
            .iter()
            .map(|(id, name)| (*id, descriptor(*id, name)))
            .collect()
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.get(1).is_none());
    }

    #[test]
    fn test_update_replaces_everything() {
        let mut catalog = Catalog::new();
        catalog.apply_update(file_list(&[(1, "a.txt"), (2, "b.txt")]));
        catalog.apply_update(file_list(&[(2, "b2.txt"), (3, "c.txt")]));

        // Exactly the second snapshot, nothing left over from the first
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.contains(1));
        assert_eq!(catalog.get(2).unwrap().file_name, "b2.txt");
        assert_eq!(catalog.get(3).unwrap().file_name, "c.txt");
    }

    #[test]
    fn test_update_to_empty() {
        let mut catalog = Catalog::new();
        catalog.apply_update(file_list(&[(1, "a.txt")]));
        catalog.apply_update(FileList::new());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_old_snapshot_unchanged() {
        let mut catalog = Catalog::new();
        catalog.apply_update(file_list(&[(1, "a.txt")]));
        let old = catalog.snapshot();

        catalog.apply_update(file_list(&[(9, "z.txt")]));

        // A reader holding the old snapshot never sees a mix
        assert_eq!(old.len(), 1);
        assert!(old.contains_key(&1));
        assert_eq!(catalog.snapshot().keys().copied().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut catalog = Catalog::new();
        catalog.apply_update(file_list(&[(5, "e"), (1, "a"), (3, "c")]));
        let ids: Vec<i32> = catalog.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
