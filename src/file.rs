//! File-block chain management: positional read, write, truncate.
//!
//! A regular file's contents are a singly linked chain of file blocks, each
//! owning one separately allocated payload buffer. The inode's `size` is
//! authoritative; the chain's payload lengths always sum to it.

use crate::config::*;
use crate::inode::{get_inode, put_inode};
use crate::region;
use crate::structs::{FileBlock, Inode};
use crate::{alloc, Error, Result};

/// Copies up to `buf.len()` bytes starting at `offset` into `buf`, returning
/// the number of bytes copied. Reads at or past EOF return 0.
pub(crate) fn read_at(region: &[u8], node: &Inode, offset: u64, buf: &mut [u8]) -> Result<usize> {
    let meta = node.file()?;
    if offset >= meta.size {
        return Ok(0);
    }
    let want = (buf.len() as u64).min(meta.size - offset) as usize;

    // Skip whole blocks in front of the requested offset.
    let mut cur = meta.first_block;
    let mut skip = offset;
    while cur != NULL_OFFSET {
        let fb: FileBlock = region::read_record(region, cur);
        if skip < fb.block_size {
            break;
        }
        skip -= fb.block_size;
        cur = fb.next;
    }

    let mut copied = 0;
    while copied < want && cur != NULL_OFFSET {
        let fb: FileBlock = region::read_record(region, cur);
        let avail = (fb.block_size - skip) as usize;
        let take = avail.min(want - copied);
        if take > 0 {
            buf[copied..copied + take]
                .copy_from_slice(region::bytes(region, fb.data + skip, take as u64));
        }
        copied += take;
        skip = 0;
        cur = fb.next;
    }
    Ok(copied)
}

/// Writes `data` at `offset`, returning the number of bytes written.
///
/// Bytes that land inside the current contents overwrite the chain in
/// place; bytes past the current end are appended as one new tail block.
/// Writes starting beyond the end return 0 (no hole creation on write).
/// The tail block and its payload are allocated before anything is
/// mutated, so an out-of-memory failure leaves the file unchanged.
pub(crate) fn write_at(region: &mut [u8], node_off: u64, offset: u64, data: &[u8]) -> Result<usize> {
    let mut node: Inode = get_inode(region, node_off);
    let meta = *node.file()?;

    if offset > meta.size {
        return Ok(0);
    }
    let n = data.len() as u64;
    if n == 0 {
        return Ok(0);
    }
    let end = offset.checked_add(n).ok_or(Error::OutOfMemory)?;
    let append_len = end.saturating_sub(meta.size);
    let overwrite_len = (n - append_len) as usize;

    let mut tail_block = NULL_OFFSET;
    let mut tail_data = NULL_OFFSET;
    if append_len > 0 {
        tail_block = alloc::allocate(region, FILE_BLOCK_SIZE);
        if tail_block == NULL_OFFSET {
            return Err(Error::OutOfMemory);
        }
        tail_data = alloc::allocate(region, append_len);
        if tail_data == NULL_OFFSET {
            alloc::free(region, tail_block);
            return Err(Error::OutOfMemory);
        }
    }

    if overwrite_len > 0 {
        let mut cur = meta.first_block;
        let mut skip = offset;
        while cur != NULL_OFFSET {
            let fb: FileBlock = region::read_record(region, cur);
            if skip < fb.block_size {
                break;
            }
            skip -= fb.block_size;
            cur = fb.next;
        }
        let mut written = 0;
        while written < overwrite_len && cur != NULL_OFFSET {
            let fb: FileBlock = region::read_record(region, cur);
            let avail = (fb.block_size - skip) as usize;
            let take = avail.min(overwrite_len - written);
            if take > 0 {
                region::bytes_mut(region, fb.data + skip, take as u64)
                    .copy_from_slice(&data[written..written + take]);
            }
            written += take;
            skip = 0;
            cur = fb.next;
        }
    }

    if append_len > 0 {
        region::bytes_mut(region, tail_data, append_len).copy_from_slice(&data[overwrite_len..]);
        region::write_record(
            region,
            tail_block,
            &FileBlock {
                block_size: append_len,
                next: NULL_OFFSET,
                data: tail_data,
            },
        );
        chain_tail_link(region, &mut node, tail_block)?;
        node.file_mut()?.size = end;
        put_inode(region, node_off, &node);
    }

    Ok(n as usize)
}

/// Links `new_block` as the new tail of the chain, or as the first block of
/// an empty file.
fn chain_tail_link(region: &mut [u8], node: &mut Inode, new_block: u64) -> Result<()> {
    let meta = node.file_mut()?;
    if meta.first_block == NULL_OFFSET {
        meta.first_block = new_block;
        return Ok(());
    }
    let mut cur = meta.first_block;
    loop {
        let mut fb: FileBlock = region::read_record(region, cur);
        if fb.next == NULL_OFFSET {
            fb.next = new_block;
            region::write_record(region, cur, &fb);
            return Ok(());
        }
        cur = fb.next;
    }
}

/// Sets the file length to `new_size`.
///
/// Growth appends one zero-filled tail block; new bytes always read as
/// zero. Shrinking reallocates the payload of the block containing the new
/// end in place, then frees every block after it.
pub(crate) fn truncate(region: &mut [u8], node_off: u64, new_size: u64) -> Result<()> {
    let mut node: Inode = get_inode(region, node_off);
    let meta = *node.file()?;

    if new_size == meta.size {
        return Ok(());
    }

    if new_size == 0 {
        free_chain(region, meta.first_block);
        let m = node.file_mut()?;
        m.first_block = NULL_OFFSET;
        m.size = 0;
        put_inode(region, node_off, &node);
        return Ok(());
    }

    if new_size > meta.size {
        let extra = new_size - meta.size;
        let tail_block = alloc::allocate(region, FILE_BLOCK_SIZE);
        if tail_block == NULL_OFFSET {
            return Err(Error::OutOfMemory);
        }
        let tail_data = alloc::allocate(region, extra);
        if tail_data == NULL_OFFSET {
            alloc::free(region, tail_block);
            return Err(Error::OutOfMemory);
        }
        alloc::clear_payload(region, tail_data, extra);
        region::write_record(
            region,
            tail_block,
            &FileBlock {
                block_size: extra,
                next: NULL_OFFSET,
                data: tail_data,
            },
        );
        chain_tail_link(region, &mut node, tail_block)?;
        node.file_mut()?.size = new_size;
        put_inode(region, node_off, &node);
        return Ok(());
    }

    // Shrink: walk to the block containing the new end.
    let mut cur = meta.first_block;
    let mut remaining = new_size;
    loop {
        let fb: FileBlock = region::read_record(region, cur);
        if remaining <= fb.block_size {
            break;
        }
        remaining -= fb.block_size;
        cur = fb.next;
    }

    let mut fb: FileBlock = region::read_record(region, cur);
    if remaining < fb.block_size {
        // In-place payload shrink cannot fail or move.
        fb.data = alloc::reallocate(region, fb.data, remaining);
        fb.block_size = remaining;
    }
    let rest = fb.next;
    fb.next = NULL_OFFSET;
    region::write_record(region, cur, &fb);
    free_chain(region, rest);

    node.file_mut()?.size = new_size;
    put_inode(region, node_off, &node);
    Ok(())
}

/// Releases an entire chain: every payload buffer, then every header.
pub(crate) fn free_chain(region: &mut [u8], first_block: u64) {
    let mut cur = first_block;
    while cur != NULL_OFFSET {
        let fb: FileBlock = region::read_record(region, cur);
        if fb.data != NULL_OFFSET {
            alloc::free(region, fb.data);
        }
        alloc::free(region, cur);
        cur = fb.next;
    }
}
