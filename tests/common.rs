//! Common utilities for tests
#![allow(unused)]

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An anonymous region: zeroed bytes, nothing backing them.
pub fn region(size: usize) -> Vec<u8> {
    vec![0u8; size]
}

/// A file-backed region. The bytes are loaded from (or created at) the
/// backing path; `flush` writes them back, which is what unmounting means
/// for this filesystem.
pub struct FileRegion {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FileRegion {
    pub fn open(path: &Path, size: usize) -> std::io::Result<Self> {
        let bytes = match fs::read(path) {
            Ok(existing) if existing.len() == size => existing,
            _ => vec![0u8; size],
        };
        Ok(FileRegion {
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn flush(&self) -> std::io::Result<()> {
        let mut f = fs::File::create(&self.path)?;
        f.write_all(&self.bytes)?;
        f.flush()
    }
}
