use crate::config::*;
use crate::Error;
use crate::Result;

/// Lives at region offset 0. Everything else is reached from here through
/// offsets, never through stored pointers, so the region survives being
/// remapped at a different base address.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SuperBlock {
    pub magic: u32,     // MAGIC once initialized, anything else when fresh
    pub size: u64,      // usable bytes after the superblock
    pub free_list: u64, // offset of the first free block, or 0
    pub root_dir: u64,  // offset of the root inode, 0 until first resolution
}

/// Header preceding every allocator block, free or allocated.
///
/// `size` counts the header itself. For free blocks `next` chains the free
/// list in ascending offset order; for allocated blocks it is 0.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub size: u64,
    pub next: u64,
}

/// Nanosecond-precision timestamp, laid out like a C timespec.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpec {
    pub sec: i64,
    pub nsec: i64,
}

impl TimeSpec {
    pub const ZERO: Self = TimeSpec { sec: 0, nsec: 0 };

    pub fn now() -> Self {
        match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(d) => TimeSpec {
                sec: d.as_secs() as i64,
                nsec: d.subsec_nanos() as i64,
            },
            Err(_) => TimeSpec::ZERO,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Directory = 1,
    RegularFile = 2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FileMeta {
    pub size: u64,        // byte length, authoritative
    pub first_block: u64, // offset of the first file block, 0 when empty
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DirMeta {
    pub num_children: u64,
    pub children: u64, // offset of the inline child inode array, 0 when empty
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union InodeMeta {
    pub file: FileMeta,
    pub dir: DirMeta,
}

impl core::fmt::Debug for InodeMeta {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Both variants are a pair of u64s; show the raw pair.
        let raw = unsafe { self.file };
        write!(f, "InodeMeta {{ {}, {} }}", raw.size, raw.first_block)
    }
}

/// Metadata record for a file or directory.
///
/// Inodes are stored inline in their parent directory's children array,
/// except for the root, which owns its own allocation.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Inode {
    /// NUL-terminated, at most MAX_NAME_LEN bytes before the terminator.
    pub name: [u8; NAME_BUF_LEN],
    pub mod_time: TimeSpec,
    pub acc_time: TimeSpec,
    pub ftype: FileType,
    pub meta: InodeMeta,
}

impl Inode {
    fn with_name(name: &str, ftype: FileType, meta: InodeMeta, ts: TimeSpec) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong);
        }
        let mut node = Inode {
            name: [0; NAME_BUF_LEN],
            mod_time: ts,
            acc_time: ts,
            ftype,
            meta,
        };
        node.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(node)
    }

    pub fn new_file(name: &str, ts: TimeSpec) -> Result<Self> {
        Self::with_name(
            name,
            FileType::RegularFile,
            InodeMeta {
                file: FileMeta {
                    size: 0,
                    first_block: NULL_OFFSET,
                },
            },
            ts,
        )
    }

    pub fn new_dir(name: &str, ts: TimeSpec) -> Result<Self> {
        Self::with_name(
            name,
            FileType::Directory,
            InodeMeta {
                dir: DirMeta {
                    num_children: 0,
                    children: NULL_OFFSET,
                },
            },
            ts,
        )
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_BUF_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong);
        }
        self.name = [0; NAME_BUF_LEN];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.name() == name
    }

    pub fn is_dir(&self) -> bool {
        self.ftype == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.ftype == FileType::RegularFile
    }

    pub fn file(&self) -> Result<&FileMeta> {
        if self.ftype != FileType::RegularFile {
            return Err(Error::IsADirectory);
        }
        unsafe { Ok(&self.meta.file) }
    }

    pub fn file_mut(&mut self) -> Result<&mut FileMeta> {
        if self.ftype != FileType::RegularFile {
            return Err(Error::IsADirectory);
        }
        unsafe { Ok(&mut self.meta.file) }
    }

    pub fn dir(&self) -> Result<&DirMeta> {
        if self.ftype != FileType::Directory {
            return Err(Error::NotADirectory);
        }
        unsafe { Ok(&self.meta.dir) }
    }

    pub fn dir_mut(&mut self) -> Result<&mut DirMeta> {
        if self.ftype != FileType::Directory {
            return Err(Error::NotADirectory);
        }
        unsafe { Ok(&mut self.meta.dir) }
    }
}

impl core::fmt::Debug for Inode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut d = f.debug_struct("Inode");
        d.field("name", &self.name())
            .field("ftype", &self.ftype)
            .field("mod_time", &self.mod_time)
            .field("acc_time", &self.acc_time);
        match self.ftype {
            FileType::Directory => {
                let dir = unsafe { self.meta.dir };
                d.field("num_children", &dir.num_children)
                    .field("children", &dir.children);
            }
            FileType::RegularFile => {
                let file = unsafe { self.meta.file };
                d.field("size", &file.size)
                    .field("first_block", &file.first_block);
            }
        }
        d.finish()
    }
}

/// One link in a regular file's content chain. The payload buffer is a
/// separate allocation referenced through `data`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FileBlock {
    pub block_size: u64, // payload bytes behind `data`
    pub next: u64,       // offset of the next file block, or 0
    pub data: u64,       // offset of the payload buffer, or 0
}

/// What getattr reports. uid/gid are echoed from the caller, never stored.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub acc_time: TimeSpec,
    pub mod_time: TimeSpec,
}

/// What statfs reports, in STATFS_BLOCK_SIZE units.
#[derive(Debug, Clone, Copy)]
pub struct StatVfs {
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_avail: u64,
    pub name_max: u64,
}
