use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File extensions the assistant can ingest
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt", "pdf"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier: the file name inside the documents directory.
    /// It disappears with the file, which is how links go dangling.
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

/// Snapshot of the documents directory. Rebuilt by rescanning, never
/// mutated in place.
#[derive(Debug, Clone, Default)]
pub struct DocumentLibrary {
    documents: Vec<Document>,
}

impl DocumentLibrary {
    /// Scan a directory for linkable documents. A missing or unreadable
    /// directory yields an empty library so the chat list keeps working.
    pub fn scan(dir: &Path) -> Self {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Documents directory {} not readable: {}", dir.display(), e);
                return Self::default();
            }
        };

        let mut documents = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            // Skip hidden files
            if name.starts_with('.') {
                continue;
            }
            if !path.is_file() {
                continue;
            }

            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase());
            match extension {
                Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => {}
                _ => continue,
            }

            documents.push(Document {
                id: name.clone(),
                name,
                path,
            });
        }

        documents.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Self { documents }
    }

    /// Build a library from an in-memory list, no directory involved
    #[allow(dead_code)]
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Look up a document by id; None means the link is dangling
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"content").unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "zebra.txt");
        touch(tmp.path(), "Alpha.md");
        touch(tmp.path(), "notes.rs");
        touch(tmp.path(), ".hidden.md");
        fs::create_dir(tmp.path().join("sub.md")).unwrap();

        let library = DocumentLibrary::scan(tmp.path());

        let names: Vec<&str> = library.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha.md", "zebra.txt"]);
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let library = DocumentLibrary::scan(Path::new("/definitely/not/a/real/dir"));
        assert!(library.is_empty());
    }

    #[test]
    fn test_get_detects_dangling_ids() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "report.pdf");

        let library = DocumentLibrary::scan(tmp.path());
        assert!(library.get("report.pdf").is_some());
        assert!(library.get("deleted.pdf").is_none());
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "README.MD");

        let library = DocumentLibrary::scan(tmp.path());
        assert_eq!(library.len(), 1);
    }
}
