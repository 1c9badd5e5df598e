//! Children array maintenance.
//!
//! A directory's children are a contiguous array of inline inodes, resized
//! through the allocator on every append and remove. Removal swap-removes:
//! the last slot is copied over the victim and the array shrinks by one.
//! Order within a directory carries no meaning, and a moved inode stays
//! valid verbatim because its internal offsets point into the allocator,
//! never into the array.

use crate::config::*;
use crate::inode::{get_inode, put_inode};
use crate::structs::Inode;
use crate::{alloc, Error, Result};

pub(crate) fn child_slot(children: u64, index: u64) -> u64 {
    children + index * INODE_SIZE
}

/// Finds a child by name, returning the offset of its inline inode.
pub(crate) fn lookup_child(region: &[u8], dir: &Inode, name: &str) -> Result<u64> {
    let meta = dir.dir()?;
    for i in 0..meta.num_children {
        let off = child_slot(meta.children, i);
        let child: Inode = get_inode(region, off);
        if child.name_matches(name) {
            return Ok(off);
        }
    }
    Err(Error::NotFound)
}

/// Appends a child inode to the directory at `dir_off`, growing the array
/// by one slot. Fails with `Exists` on a duplicate name and `OutOfMemory`
/// when the grown array cannot be placed; the directory is untouched in
/// both cases.
pub(crate) fn append_child(region: &mut [u8], dir_off: u64, child: &Inode) -> Result<()> {
    let mut dir: Inode = get_inode(region, dir_off);
    if lookup_child(region, &dir, child.name()).is_ok() {
        return Err(Error::Exists);
    }

    let meta = *dir.dir()?;
    let grown = if meta.num_children == 0 {
        alloc::allocate(region, INODE_SIZE)
    } else {
        alloc::reallocate(region, meta.children, (meta.num_children + 1) * INODE_SIZE)
    };
    if grown == NULL_OFFSET {
        return Err(Error::OutOfMemory);
    }

    put_inode(region, child_slot(grown, meta.num_children), child);

    let m = dir.dir_mut()?;
    m.children = grown;
    m.num_children = meta.num_children + 1;
    put_inode(region, dir_off, &dir);
    Ok(())
}

/// Removes the named child from the directory at `dir_off` by swap-remove.
///
/// Only the slot is reclaimed; any file-block chain the victim owned must
/// have been freed by the caller beforehand. The shrink happens in place,
/// so after the name check this cannot fail.
pub(crate) fn remove_child(region: &mut [u8], dir_off: u64, name: &str) -> Result<()> {
    let mut dir: Inode = get_inode(region, dir_off);
    let meta = *dir.dir()?;

    let mut victim = None;
    for i in 0..meta.num_children {
        let child: Inode = get_inode(region, child_slot(meta.children, i));
        if child.name_matches(name) {
            victim = Some(i);
            break;
        }
    }
    let victim = victim.ok_or(Error::NotFound)?;

    let last = meta.num_children - 1;
    if victim != last {
        let src = child_slot(meta.children, last);
        let dst = child_slot(meta.children, victim);
        region.copy_within(src as usize..(src + INODE_SIZE) as usize, dst as usize);
    }

    let shrunk = alloc::reallocate(region, meta.children, last * INODE_SIZE);
    let m = dir.dir_mut()?;
    m.children = shrunk;
    m.num_children = last;
    put_inode(region, dir_off, &dir);
    Ok(())
}

/// Collects the child names of a directory, `.` and `..` excluded (they are
/// never stored).
pub(crate) fn list_names(region: &[u8], dir: &Inode) -> Result<Vec<String>> {
    let meta = dir.dir()?;
    let mut names = Vec::with_capacity(meta.num_children as usize);
    for i in 0..meta.num_children {
        let child: Inode = get_inode(region, child_slot(meta.children, i));
        names.push(child.name().to_string());
    }
    Ok(names)
}
