//! Temporary directory with helpers for file-level tests.

use std::path::PathBuf;
use tempfile::TempDir;
use texkit::services::{read_png, write_png, RgbaImage};

pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `image` as PNG and return its path
    pub fn png(&self, name: &str, image: &RgbaImage) -> PathBuf {
        let path = self.path(name);
        write_png(&path, image).expect("Failed to write test PNG");
        path
    }

    pub fn read_png(&self, name: &str) -> RgbaImage {
        read_png(&self.path(name)).expect("Failed to read PNG")
    }

    pub fn read(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path(name)).expect("Failed to read file")
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("Failed to write file");
        path
    }
}
