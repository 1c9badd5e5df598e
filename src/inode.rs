//! Copy-in/copy-out access to inodes stored in the region.
//!
//! An inode is always read as a copy, mutated locally, and written back at
//! its offset. Nothing holds references into the region across an operation,
//! which keeps the relocation done by the allocator (children arrays move on
//! growth) from invalidating anything.

use crate::config::*;
use crate::region;
use crate::structs::{Inode, TimeSpec};
use crate::superblock::{read_superblock, write_superblock};
use crate::{alloc, Error, Result};

pub(crate) fn get_inode(region: &[u8], off: u64) -> Inode {
    region::read_record(region, off)
}

pub(crate) fn put_inode(region: &mut [u8], off: u64, node: &Inode) {
    region::write_record(region, off, node);
}

/// Returns the root inode offset, creating the root lazily on first
/// resolution: a directory named "/", no children, stamped with the current
/// realtime.
pub(crate) fn ensure_root(region: &mut [u8]) -> Result<u64> {
    let sb = read_superblock(region);
    if sb.root_dir != NULL_OFFSET {
        return Ok(sb.root_dir);
    }

    let off = alloc::allocate(region, INODE_SIZE);
    if off == NULL_OFFSET {
        return Err(Error::OutOfMemory);
    }
    let root = Inode::new_dir("/", TimeSpec::now())?;
    put_inode(region, off, &root);

    // Re-read: the allocation above moved the free-list head.
    let mut sb = read_superblock(region);
    sb.root_dir = off;
    write_superblock(region, &sb);
    Ok(off)
}
