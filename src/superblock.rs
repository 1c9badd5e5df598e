//! First-mount detection and idempotent region initialization.

use log::debug;

use crate::config::*;
use crate::region;
use crate::structs::{BlockHeader, SuperBlock};
use crate::{Error, Result};

pub(crate) fn read_superblock(region: &[u8]) -> SuperBlock {
    region::read_record(region, 0)
}

pub(crate) fn write_superblock(region: &mut [u8], sb: &SuperBlock) {
    region::write_record(region, 0, sb);
}

/// Derives the superblock handle, initializing the region on first touch.
///
/// A populated region is recognized by its magic and left intact, so
/// mounting is idempotent and remount-safe. A fresh region is zeroed past
/// the header and seeded with a single free block spanning the usable space.
pub(crate) fn get_handle(region: &mut [u8]) -> Result<SuperBlock> {
    if (region.len() as u64) < SUPER_BLOCK_SIZE {
        return Err(Error::BadRegion);
    }

    let sb = read_superblock(region);
    if sb.magic == MAGIC {
        return Ok(sb);
    }

    let usable = region.len() as u64 - SUPER_BLOCK_SIZE;
    region::fill_zero(region, SUPER_BLOCK_SIZE, usable);

    // A usable area too small to hold even a block header stays off the
    // free list; allocation then always fails with out-of-memory.
    let free_list = if usable >= BLOCK_HEADER_SIZE {
        region::write_record(
            region,
            SUPER_BLOCK_SIZE,
            &BlockHeader {
                size: usable,
                next: NULL_OFFSET,
            },
        );
        SUPER_BLOCK_SIZE
    } else {
        NULL_OFFSET
    };

    let sb = SuperBlock {
        magic: MAGIC,
        size: usable,
        free_list,
        root_dir: NULL_OFFSET,
    };
    write_superblock(region, &sb);
    debug!("initialized fresh region, {} usable bytes", usable);

    Ok(sb)
}
