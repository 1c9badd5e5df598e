use core::mem::size_of;

use crate::structs::{BlockHeader, FileBlock, Inode, SuperBlock};

/// Magic sentinel written at region offset 0. Anything else means the
/// region is fresh and gets initialized on mount.
pub const MAGIC: u32 = 1;

/// Null offset. The superblock occupies offset 0, so no allocation can
/// ever legitimately start there.
pub const NULL_OFFSET: u64 = 0;

pub const MAX_NAME_LEN: usize = 255;
pub const NAME_BUF_LEN: usize = MAX_NAME_LEN + 1;

/// Block size reported by statfs. A reporting convention only, not an
/// allocation granularity.
pub const STATFS_BLOCK_SIZE: u64 = 1024;

pub const SUPER_BLOCK_SIZE: u64 = size_of::<SuperBlock>() as u64;
pub const BLOCK_HEADER_SIZE: u64 = size_of::<BlockHeader>() as u64;
pub const INODE_SIZE: u64 = size_of::<Inode>() as u64;
pub const FILE_BLOCK_SIZE: u64 = size_of::<FileBlock>() as u64;
