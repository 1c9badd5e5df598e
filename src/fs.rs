//! The operation surface: thirteen POSIX-ish operations over a mounted
//! region, plus diagnostics.

use std::fmt::Write as _;

use log::{debug, trace};

use crate::config::*;
use crate::directory::{self, child_slot};
use crate::file;
use crate::inode::{get_inode, put_inode};
use crate::path;
use crate::structs::{FileBlock, FileStat, FileType, Inode, StatVfs, TimeSpec};
use crate::superblock::{get_handle, read_superblock};
use crate::{alloc, Error, Result};

/// A filesystem view over a byte region.
///
/// Mounting derives the superblock handle, initializing a fresh region in
/// place; all further state lives in the region itself, so dropping the
/// view and re-mounting the same bytes (possibly at a different address)
/// yields the identical filesystem.
pub struct FileSystem<'r> {
    region: &'r mut [u8],
}

impl<'r> FileSystem<'r> {
    pub fn mount(region: &'r mut [u8]) -> Result<Self> {
        get_handle(region)?;
        debug!("mounted region of {} bytes", region.len());
        Ok(FileSystem { region })
    }

    /// Emulates stat. uid and gid are echoed back, not stored; mode bits
    /// are fixed at 0755 plus the type bit.
    pub fn getattr(&mut self, path: &str, uid: u32, gid: u32) -> Result<FileStat> {
        trace!("getattr {}", path);
        let off = path::resolve(self.region, path)?;
        let node = get_inode(self.region, off);

        let (mode, nlink, size) = match node.dir() {
            Ok(meta) => (libc::S_IFDIR as u32 | 0o755, meta.num_children + 2, 0),
            Err(_) => {
                let meta = node.file()?;
                (libc::S_IFREG as u32 | 0o755, 1, meta.size)
            }
        };
        Ok(FileStat {
            mode,
            nlink,
            uid,
            gid,
            size,
            acc_time: node.acc_time,
            mod_time: node.mod_time,
        })
    }

    /// Lists a directory. `.` and `..` are never stored, so the listing is
    /// exactly the children array.
    pub fn readdir(&mut self, path: &str) -> Result<Vec<String>> {
        trace!("readdir {}", path);
        let off = path::resolve(self.region, path)?;
        let mut node = get_inode(self.region, off);
        let names = directory::list_names(self.region, &node)?;
        node.acc_time = TimeSpec::now();
        put_inode(self.region, off, &node);
        Ok(names)
    }

    /// Creates an empty regular file.
    pub fn mknod(&mut self, path: &str) -> Result<()> {
        trace!("mknod {}", path);
        self.create(path, Inode::new_file)
    }

    /// Creates an empty directory.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        trace!("mkdir {}", path);
        self.create(path, Inode::new_dir)
    }

    fn create(&mut self, path: &str, build: fn(&str, TimeSpec) -> Result<Inode>) -> Result<()> {
        let (parent_path, name) = path::split(path)?;
        if name.is_empty() {
            return Err(Error::Exists); // the root always exists
        }

        let parent_off = path::resolve(self.region, &parent_path)?;
        let parent = get_inode(self.region, parent_off);
        let meta = parent.dir()?;

        // Pre-flight the array growth so failure happens before mutation.
        if alloc::max_free_payload(self.region) < (meta.num_children + 1) * INODE_SIZE {
            return Err(Error::OutOfMemory);
        }

        let child = build(&name, TimeSpec::now())?;
        directory::append_child(self.region, parent_off, &child)
    }

    /// Removes a regular file, releasing its content chain.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        trace!("unlink {}", path);
        let (parent_path, name) = path::split(path)?;
        if name.is_empty() {
            return Err(Error::IsADirectory);
        }

        let parent_off = path::resolve(self.region, &parent_path)?;
        let parent = get_inode(self.region, parent_off);
        let child_off = directory::lookup_child(self.region, &parent, &name)?;
        let child = get_inode(self.region, child_off);
        let meta = *child.file()?;

        file::free_chain(self.region, meta.first_block);
        directory::remove_child(self.region, parent_off, &name)
    }

    /// Removes an empty directory. The root cannot be removed.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        trace!("rmdir {}", path);
        let (parent_path, name) = path::split(path)?;
        if name.is_empty() {
            return Err(Error::Busy);
        }

        let parent_off = path::resolve(self.region, &parent_path)?;
        let parent = get_inode(self.region, parent_off);
        let child_off = directory::lookup_child(self.region, &parent, &name)?;
        let child = get_inode(self.region, child_off);
        let meta = child.dir()?;
        if meta.num_children != 0 {
            return Err(Error::NotEmpty);
        }

        directory::remove_child(self.region, parent_off, &name)
    }

    /// Moves or renames a file or directory.
    ///
    /// Same-parent renames rewrite the name in place. A cross-parent move
    /// grows the destination array first (pre-flighted), re-resolves the
    /// source afterwards (the growth may have relocated the array the
    /// source inode lives in), copies the inode verbatim, and swap-removes
    /// the source slot. An existing destination is replaced POSIX-style.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        trace!("rename {} -> {}", from, to);
        let from_comps = path::components(from)?;
        let to_comps = path::components(to)?;
        if from_comps == to_comps {
            return Ok(());
        }
        if from_comps.is_empty() || to_comps.is_empty() {
            return Err(Error::Busy); // renaming the root, or onto it
        }
        // Moving a directory into its own subtree would detach a cycle.
        if to_comps.len() > from_comps.len() && to_comps[..from_comps.len()] == from_comps[..] {
            return Err(Error::InvalidPath);
        }

        let (from_parent_path, from_name) = path::split(from)?;
        let (to_parent_path, to_name) = path::split(to)?;

        // Source must exist before anything else is examined.
        let from_parent_off = path::resolve(self.region, &from_parent_path)?;
        let from_parent = get_inode(self.region, from_parent_off);
        let src_off = directory::lookup_child(self.region, &from_parent, &from_name)?;
        let src_type = get_inode(self.region, src_off).ftype;

        let to_parent_off = path::resolve(self.region, &to_parent_path)?;
        let to_parent = get_inode(self.region, to_parent_off);
        to_parent.dir()?;

        // Replace an existing destination.
        if let Ok(dest_off) = directory::lookup_child(self.region, &to_parent, &to_name) {
            let dest = get_inode(self.region, dest_off);
            match dest.dir() {
                Ok(meta) => {
                    if src_type != FileType::Directory {
                        return Err(Error::IsADirectory);
                    }
                    if meta.num_children != 0 {
                        return Err(Error::NotEmpty);
                    }
                }
                Err(_) => {
                    if src_type == FileType::Directory {
                        return Err(Error::NotADirectory);
                    }
                    file::free_chain(self.region, dest.file()?.first_block);
                }
            }
            directory::remove_child(self.region, to_parent_off, &to_name)?;
        }

        // Re-resolve: removing the destination may have swap-moved the
        // source inside a shared parent array.
        let from_parent_off = path::resolve(self.region, &from_parent_path)?;
        let to_parent_off = path::resolve(self.region, &to_parent_path)?;

        if from_parent_off == to_parent_off {
            let from_parent = get_inode(self.region, from_parent_off);
            let src_off = directory::lookup_child(self.region, &from_parent, &from_name)?;
            let mut src = get_inode(self.region, src_off);
            src.set_name(&to_name)?;
            put_inode(self.region, src_off, &src);
            return Ok(());
        }

        // Pre-flight the destination growth before mutating the source.
        let to_parent = get_inode(self.region, to_parent_off);
        let tn = to_parent.dir()?.num_children;
        if alloc::max_free_payload(self.region) < (tn + 1) * INODE_SIZE {
            return Err(Error::OutOfMemory);
        }

        let from_parent = get_inode(self.region, from_parent_off);
        let src_off = directory::lookup_child(self.region, &from_parent, &from_name)?;
        let mut moved = get_inode(self.region, src_off);
        moved.set_name(&to_name)?;
        directory::append_child(self.region, to_parent_off, &moved)?;

        // The growth may have moved the array holding the source's parent;
        // resolve fresh offsets before removing the source slot.
        let from_parent_off = path::resolve(self.region, &from_parent_path)?;
        directory::remove_child(self.region, from_parent_off, &from_name)
    }

    /// Sets the file length; growth reads back as zeros.
    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        trace!("truncate {} to {}", path, size);
        let off = path::resolve(self.region, path)?;
        file::truncate(self.region, off, size)?;

        let mut node = get_inode(self.region, off);
        node.mod_time = TimeSpec::now();
        put_inode(self.region, off, &node);
        Ok(())
    }

    /// Checks that the path can be followed to an existing object. No file
    /// handle state exists; open is an existence probe.
    pub fn open(&mut self, path: &str) -> Result<()> {
        trace!("open {}", path);
        path::resolve(self.region, path).map(|_| ())
    }

    /// Reads up to `buf.len()` bytes starting at `offset`; returns the
    /// number of bytes read, 0 at or past end of file.
    pub fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize> {
        trace!("read {} offset {} len {}", path, offset, buf.len());
        let off = path::resolve(self.region, path)?;
        let mut node = get_inode(self.region, off);
        let n = file::read_at(self.region, &node, offset, buf)?;
        node.acc_time = TimeSpec::now();
        put_inode(self.region, off, &node);
        Ok(n)
    }

    /// Writes `data` at `offset`; returns the number of bytes written, 0
    /// when `offset` lies beyond the end of the file.
    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        trace!("write {} offset {} len {}", path, offset, data.len());
        let off = path::resolve(self.region, path)?;
        let n = file::write_at(self.region, off, offset, data)?;
        if n > 0 {
            let mut node = get_inode(self.region, off);
            node.mod_time = TimeSpec::now();
            put_inode(self.region, off, &node);
        }
        Ok(n)
    }

    /// Sets access and modification times.
    pub fn utimens(&mut self, path: &str, acc_time: TimeSpec, mod_time: TimeSpec) -> Result<()> {
        trace!("utimens {}", path);
        let off = path::resolve(self.region, path)?;
        let mut node = get_inode(self.region, off);
        node.acc_time = acc_time;
        node.mod_time = mod_time;
        put_inode(self.region, off, &node);
        Ok(())
    }

    /// Filesystem usage in STATFS_BLOCK_SIZE units.
    pub fn statfs(&self) -> StatVfs {
        let sb = read_superblock(self.region);
        let free = alloc::free_size(self.region) / STATFS_BLOCK_SIZE;
        StatVfs {
            block_size: STATFS_BLOCK_SIZE,
            blocks: sb.size / STATFS_BLOCK_SIZE,
            blocks_free: free,
            blocks_avail: free,
            name_max: MAX_NAME_LEN as u64,
        }
    }

    /// Aggregate free bytes, headers included. Diagnostic; the create/remove
    /// pairs restore this exactly.
    pub fn free_bytes(&self) -> u64 {
        alloc::free_size(self.region)
    }

    /// Renders the tree and the free list, for tests and debugging.
    pub fn dump(&self) -> String {
        let sb = read_superblock(self.region);
        let mut out = String::new();
        writeln!(
            out,
            "region: {} usable bytes, {} free",
            sb.size,
            alloc::free_size(self.region)
        )
        .ok();

        let mut cur = sb.free_list;
        while cur != NULL_OFFSET {
            let hdr: crate::structs::BlockHeader = crate::region::read_record(self.region, cur);
            writeln!(out, "  free block at {} ({} bytes)", cur, hdr.size).ok();
            cur = hdr.next;
        }

        if sb.root_dir != NULL_OFFSET {
            self.dump_node(&mut out, sb.root_dir, 0);
        } else {
            writeln!(out, "  (no root yet)").ok();
        }
        out
    }

    fn dump_node(&self, out: &mut String, off: u64, depth: usize) {
        let node = get_inode(self.region, off);
        let pad = "  ".repeat(depth + 1);
        match node.dir() {
            Ok(meta) => {
                writeln!(out, "{}{}/ ({} children)", pad, node.name(), meta.num_children).ok();
                for i in 0..meta.num_children {
                    self.dump_node(out, child_slot(meta.children, i), depth + 1);
                }
            }
            Err(_) => {
                let (size, blocks) = match node.file() {
                    Ok(meta) => (meta.size, self.chain_len(meta.first_block)),
                    Err(_) => (0, 0),
                };
                writeln!(out, "{}{} ({} bytes, {} blocks)", pad, node.name(), size, blocks).ok();
            }
        }
    }

    fn chain_len(&self, first_block: u64) -> usize {
        let mut count = 0;
        let mut cur = first_block;
        while cur != NULL_OFFSET {
            let fb: FileBlock = crate::region::read_record(self.region, cur);
            count += 1;
            cur = fb.next;
        }
        count
    }
}
