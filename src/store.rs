use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::FetchError;
use crate::page::{Page, PageSource};

const EXTENSION: &str = "html";

/// Flat directory of raw pages named by zero-padded index: `0001.html`, ...
pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PageStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{:04}.{}", index, EXTENSION))
    }

    pub fn contains(&self, index: u32) -> bool {
        self.path(index).is_file()
    }

    pub fn save(&self, index: u32, markup: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(index), markup)
    }

    /// Indices of every page file present, ascending. Other files are ignored;
    /// a missing directory holds no pages.
    pub fn indices(&self) -> io::Result<Vec<u32>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(index) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| s.len() >= 4 && s.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|s| s.parse::<u32>().ok())
            {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }
}

impl PageSource for PageStore {
    fn load(&self, index: u32) -> Result<Page, FetchError> {
        let path = self.path(index);
        match fs::read_to_string(&path) {
            Ok(markup) => Ok(Page::parse(index, &markup)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FetchError::Missing { page: index, path })
            }
            Err(source) => Err(FetchError::Io {
                page: index,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_zero_padded() {
        let store = PageStore::new("data/pages");
        assert_eq!(store.path(7), PathBuf::from("data/pages/0007.html"));
        assert_eq!(store.path(1234), PathBuf::from("data/pages/1234.html"));
    }

    #[test]
    fn indices_are_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PageStore::new(tmp.path());
        for i in [12, 3, 7] {
            store.save(i, "<html></html>").unwrap();
        }
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        fs::write(tmp.path().join("draft.html"), "x").unwrap();
        assert_eq!(store.indices().unwrap(), vec![3, 7, 12]);
    }

    #[test]
    fn missing_dir_has_no_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PageStore::new(tmp.path().join("nope"));
        assert!(store.indices().unwrap().is_empty());
    }

    #[test]
    fn load_reports_missing_page() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PageStore::new(tmp.path());
        store.save(1, "<p>hi</p>").unwrap();
        assert!(store.contains(1));
        assert_eq!(store.load(1).unwrap().index, 1);
        let err = store.load(2).err().unwrap();
        assert!(matches!(err, FetchError::Missing { page: 2, .. }));
    }
}
