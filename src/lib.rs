//! Tauon is a tiny hierarchical file system that lives entirely inside one
//! contiguous byte region. The region is the on-disk format: flush its bytes
//! to a file, read them back later, mount again, and the same tree with the
//! same contents and timestamps reappears, even though the region now sits
//! at a different address. Nothing inside the region is ever referenced by
//! pointer, only by offsets from the region base.
//!
//! Tauon's layers (from bottom to top):
//! 1. Superblock: fixed-offset root record, first-mount detection.   | superblock
//! 2. Allocator: offset-based free list with coalescing.             | alloc
//! 3. Inode/directory store: path resolution, inline child arrays.   | inode, path, directory
//! 4. File data: chains of variable-size payload blocks.             | file
//! 5. Operation surface: the POSIX-ish calls a dispatch layer needs. | fs
//!
//! The caller supplies the region (a `&mut [u8]`, anonymous or read from a
//! backing file) and serializes operations; the core is single-threaded by
//! contract.

mod alloc;
mod config;
mod directory;
mod error;
mod file;
mod fs;
mod inode;
mod path;
mod region;
mod structs;
mod superblock;

pub use config::{MAGIC, MAX_NAME_LEN, STATFS_BLOCK_SIZE};
pub use error::FsError as Error;
pub use error::Result;
pub use fs::FileSystem;
pub use structs::{FileStat, FileType, StatVfs, TimeSpec};
