//! # File Registry
//!
//! Lista ordinata e senza duplicati dei file selezionati nella sessione.
//!
//! ## Responsabilità:
//! - Duplicati riconosciuti per uguaglianza esatta del path (niente case
//!   folding né canonicalizzazione)
//! - Rimozione per indice, contatore per l'interfaccia
//! - Notifica sincrona degli observer dopo ogni modifica effettiva

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One selected file
pub type FileEntry = PathBuf;

type Observer = Box<dyn Fn(&[FileEntry]) + Send + Sync>;

#[derive(Default)]
pub struct FileRegistry {
    entries: Vec<FileEntry>,
    observers: Vec<Observer>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback fired after every change, with the current contents
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&[FileEntry]) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Append paths not already present, keeping their order.
    ///
    /// Returns how many entries were actually added.
    pub fn add<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen: HashSet<PathBuf> = self.entries.iter().cloned().collect();
        let before = self.entries.len();

        for path in paths {
            let path = path.into();
            if seen.insert(path.clone()) {
                self.entries.push(path);
            }
        }

        let added = self.entries.len() - before;
        if added > 0 {
            self.notify();
        }
        added
    }

    /// Remove the entries at `indices`. Out-of-range indices are ignored.
    pub fn remove(&mut self, indices: &[usize]) {
        let mut ordered = indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();
        let before = self.entries.len();

        for index in ordered {
            if index < self.entries.len() {
                self.entries.remove(index);
            }
        }

        if self.entries.len() != before {
            self.notify();
        }
    }

    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.notify();
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current contents, handed to a batch at start
    pub fn snapshot(&self) -> Vec<FileEntry> {
        self.entries.clone()
    }

    /// File names for display, in registry order
    pub fn basenames(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| crate::batch::PathResolver::display_name(entry))
            .collect()
    }

    /// Status text, e.g. "3 files selected"
    pub fn count_label(&self) -> String {
        count_label(self.entries.len())
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer(&self.entries);
        }
    }
}

pub fn count_label(count: usize) -> String {
    format!("{} file{} selected", count, if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_add_skips_duplicates_and_keeps_order() {
        let mut registry = FileRegistry::new();
        assert_eq!(registry.add(["/b.jpg", "/a.jpg"]), 2);
        assert_eq!(registry.add(["/a.jpg", "/c.jpg", "/b.jpg"]), 1);

        let expected: Vec<PathBuf> = ["/b.jpg", "/a.jpg", "/c.jpg"].iter().map(PathBuf::from).collect();
        assert_eq!(registry.entries(), expected.as_slice());
    }

    #[test]
    fn test_add_is_idempotent_within_one_call() {
        let mut registry = FileRegistry::new();
        assert_eq!(registry.add(["/x.png", "/x.png"]), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicates_are_case_sensitive() {
        let mut registry = FileRegistry::new();
        registry.add(["/Photo.JPG", "/photo.jpg"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_multiple_indices() {
        let mut registry = FileRegistry::new();
        registry.add(["/0.jpg", "/1.jpg", "/2.jpg"]);
        registry.remove(&[0, 2]);
        assert_eq!(registry.entries(), &[PathBuf::from("/1.jpg")]);
    }

    #[test]
    fn test_remove_ignores_out_of_range_and_repeats() {
        let mut registry = FileRegistry::new();
        registry.add(["/0.jpg", "/1.jpg"]);
        registry.remove(&[1, 1, 7]);
        assert_eq!(registry.entries(), &[PathBuf::from("/0.jpg")]);
    }

    #[test]
    fn test_clear_and_labels() {
        let mut registry = FileRegistry::new();
        registry.add(["/dir/one.jpg"]);
        assert_eq!(registry.count_label(), "1 file selected");
        assert_eq!(registry.basenames(), vec!["one.jpg".to_string()]);
        assert!(registry.contains(Path::new("/dir/one.jpg")));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.count_label(), "0 files selected");
    }

    #[test]
    fn test_observers_fire_after_each_mutation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_len = Arc::new(AtomicUsize::new(usize::MAX));

        let mut registry = FileRegistry::new();
        {
            let calls = calls.clone();
            let last_len = last_len.clone();
            registry.subscribe(move |entries| {
                calls.fetch_add(1, Ordering::SeqCst);
                last_len.store(entries.len(), Ordering::SeqCst);
            });
        }

        registry.add(["/a.jpg", "/b.jpg"]);
        assert_eq!(last_len.load(Ordering::SeqCst), 2);
        registry.add(["/a.jpg"]);
        registry.remove(&[0]);
        assert_eq!(last_len.load(Ordering::SeqCst), 1);
        registry.clear();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_len.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_change_means_no_notification() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = FileRegistry::new();
        {
            let calls = calls.clone();
            registry.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        registry.add(["/a.jpg"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(registry.add(["/a.jpg", "/a.jpg"]), 0);
        registry.remove(&[5]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        registry.clear();
        registry.clear();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
