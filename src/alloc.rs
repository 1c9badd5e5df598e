//! Free-list allocator over the region.
//!
//! Blocks are byte ranges prefixed by a `BlockHeader`; the free list is kept
//! sorted by ascending offset and adjacent free blocks are always merged, so
//! no two free blocks are ever contiguous. All functions hand out payload
//! offsets, never pointers.

use crate::config::*;
use crate::region::{bytes_mut, read_record, write_record};
use crate::structs::BlockHeader;
use crate::superblock::{read_superblock, write_superblock};

/// Allocates `n` payload bytes. Returns the payload offset, or 0 if no free
/// block is large enough (or `n` is 0).
///
/// First-fit along the offset-sorted free list. The tail of the chosen block
/// is split off as a new free block in place, unless the remainder is too
/// small to hold a header, in which case the whole block is handed out.
pub(crate) fn allocate(region: &mut [u8], n: u64) -> u64 {
    if n == 0 {
        return NULL_OFFSET;
    }
    let need = match n.checked_add(BLOCK_HEADER_SIZE) {
        Some(need) => need,
        None => return NULL_OFFSET,
    };

    let mut sb = read_superblock(region);
    let mut prev = NULL_OFFSET;
    let mut cur = sb.free_list;

    while cur != NULL_OFFSET {
        let hdr: BlockHeader = read_record(region, cur);
        if hdr.size >= need {
            let (taken, replacement) = if hdr.size - need >= BLOCK_HEADER_SIZE {
                let tail = cur + need;
                write_record(
                    region,
                    tail,
                    &BlockHeader {
                        size: hdr.size - need,
                        next: hdr.next,
                    },
                );
                (need, tail)
            } else {
                (hdr.size, hdr.next)
            };

            if prev == NULL_OFFSET {
                sb.free_list = replacement;
                write_superblock(region, &sb);
            } else {
                let mut p: BlockHeader = read_record(region, prev);
                p.next = replacement;
                write_record(region, prev, &p);
            }

            write_record(
                region,
                cur,
                &BlockHeader {
                    size: taken,
                    next: NULL_OFFSET,
                },
            );
            return cur + BLOCK_HEADER_SIZE;
        }
        prev = cur;
        cur = hdr.next;
    }

    NULL_OFFSET
}

/// Releases the block whose header precedes `payload_off`.
pub(crate) fn free(region: &mut [u8], payload_off: u64) {
    if payload_off == NULL_OFFSET {
        return;
    }
    insert_free(region, payload_off - BLOCK_HEADER_SIZE);
}

/// Links a block back into the free list at its address-ordered position,
/// then merges with the right and left neighbors when physically contiguous.
/// Two merge checks suffice because the list was fully coalesced before.
fn insert_free(region: &mut [u8], block_off: u64) {
    let mut blk: BlockHeader = read_record(region, block_off);
    let mut sb = read_superblock(region);

    let mut prev = NULL_OFFSET;
    let mut cur = sb.free_list;
    while cur != NULL_OFFSET && cur < block_off {
        let hdr: BlockHeader = read_record(region, cur);
        prev = cur;
        cur = hdr.next;
    }

    blk.next = cur;
    write_record(region, block_off, &blk);
    if prev == NULL_OFFSET {
        sb.free_list = block_off;
        write_superblock(region, &sb);
    } else {
        let mut p: BlockHeader = read_record(region, prev);
        p.next = block_off;
        write_record(region, prev, &p);
    }

    // merge right
    if cur != NULL_OFFSET && block_off + blk.size == cur {
        let right: BlockHeader = read_record(region, cur);
        blk.size += right.size;
        blk.next = right.next;
        write_record(region, block_off, &blk);
    }

    // merge left
    if prev != NULL_OFFSET {
        let mut left: BlockHeader = read_record(region, prev);
        if prev + left.size == block_off {
            left.size += blk.size;
            left.next = blk.next;
            write_record(region, prev, &left);
        }
    }
}

/// Resizes the block behind `payload_off` to `n` payload bytes.
///
/// `payload_off == 0` returns 0 without allocating; `n == 0` frees and
/// returns 0. Shrinking happens in place by splitting the tail back to the
/// free list, so it never fails and never moves the payload. Growth
/// allocates, copies, then frees; when allocation fails the old block is
/// left untouched and 0 is returned.
pub(crate) fn reallocate(region: &mut [u8], payload_off: u64, n: u64) -> u64 {
    if payload_off == NULL_OFFSET {
        return NULL_OFFSET;
    }
    if n == 0 {
        free(region, payload_off);
        return NULL_OFFSET;
    }

    let block_off = payload_off - BLOCK_HEADER_SIZE;
    let hdr: BlockHeader = read_record(region, block_off);
    let need = match n.checked_add(BLOCK_HEADER_SIZE) {
        Some(need) => need,
        None => return NULL_OFFSET,
    };

    if need <= hdr.size {
        if hdr.size - need >= BLOCK_HEADER_SIZE {
            write_record(
                region,
                block_off,
                &BlockHeader {
                    size: need,
                    next: NULL_OFFSET,
                },
            );
            let tail = block_off + need;
            write_record(
                region,
                tail,
                &BlockHeader {
                    size: hdr.size - need,
                    next: NULL_OFFSET,
                },
            );
            insert_free(region, tail);
        }
        return payload_off;
    }

    let new_off = allocate(region, n);
    if new_off == NULL_OFFSET {
        return NULL_OFFSET;
    }
    let old_payload = hdr.size - BLOCK_HEADER_SIZE;
    let copy = old_payload.min(n);
    region.copy_within(
        payload_off as usize..(payload_off + copy) as usize,
        new_off as usize,
    );
    free(region, payload_off);
    new_off
}

/// Total free bytes, headers included. Feeds statfs.
pub(crate) fn free_size(region: &[u8]) -> u64 {
    let sb = read_superblock(region);
    let mut total = 0;
    let mut cur = sb.free_list;
    while cur != NULL_OFFSET {
        let hdr: BlockHeader = read_record(region, cur);
        total += hdr.size;
        cur = hdr.next;
    }
    total
}

/// Largest payload a single allocation could currently return. Used to
/// pre-flight mutating operations so they fail before touching anything.
pub(crate) fn max_free_payload(region: &[u8]) -> u64 {
    let sb = read_superblock(region);
    let mut max = 0;
    let mut cur = sb.free_list;
    while cur != NULL_OFFSET {
        let hdr: BlockHeader = read_record(region, cur);
        if hdr.size > max {
            max = hdr.size;
        }
        cur = hdr.next;
    }
    max.saturating_sub(BLOCK_HEADER_SIZE)
}

/// Zeroes a payload range.
pub(crate) fn clear_payload(region: &mut [u8], payload_off: u64, len: u64) {
    bytes_mut(region, payload_off, len).fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::superblock::get_handle;

    fn fresh(size: usize) -> Vec<u8> {
        let mut region = vec![0u8; size];
        get_handle(&mut region).unwrap();
        region
    }

    #[test]
    fn allocate_and_free_restores_free_size() {
        let mut region = fresh(4096);
        let initial = free_size(&region);

        let a = allocate(&mut region, 100);
        assert_ne!(a, 0);
        assert_eq!(free_size(&region), initial - 100 - BLOCK_HEADER_SIZE);

        free(&mut region, a);
        assert_eq!(free_size(&region), initial);
        assert_eq!(max_free_payload(&region), initial - BLOCK_HEADER_SIZE);
    }

    #[test]
    fn coalescing_merges_neighbors() {
        let mut region = fresh(4096);
        let initial = free_size(&region);

        let a = allocate(&mut region, 64);
        let b = allocate(&mut region, 64);
        let c = allocate(&mut region, 64);
        assert!(a != 0 && b != 0 && c != 0);

        // Free out of order; the list must still end up as one block.
        free(&mut region, a);
        free(&mut region, c);
        free(&mut region, b);
        assert_eq!(free_size(&region), initial);
        assert_eq!(max_free_payload(&region), initial - BLOCK_HEADER_SIZE);
    }

    #[test]
    fn free_list_stays_sorted_and_non_contiguous() {
        let mut region = fresh(8192);
        let offs: Vec<u64> = (0..8).map(|_| allocate(&mut region, 128)).collect();
        assert!(offs.iter().all(|&o| o != 0));

        // Free every other block: four holes, none adjacent.
        for &o in offs.iter().step_by(2) {
            free(&mut region, o);
        }
        let sb = read_superblock(&region);
        let mut cur = sb.free_list;
        let mut last_end = 0;
        while cur != NULL_OFFSET {
            let hdr: BlockHeader = read_record(&region, cur);
            assert!(cur > last_end, "free list out of order or contiguous");
            last_end = cur + hdr.size;
            cur = hdr.next;
        }
    }

    #[test]
    fn exact_fit_reuses_hole() {
        let mut region = fresh(4096);
        let a = allocate(&mut region, 200);
        let _b = allocate(&mut region, 50);
        free(&mut region, a);

        let c = allocate(&mut region, 200);
        assert_eq!(c, a, "exact-size hole should be reused in place");
    }

    #[test]
    fn exhaustion_returns_null() {
        let mut region = fresh(1024);
        let huge = allocate(&mut region, 4096);
        assert_eq!(huge, 0);

        // Drain with small allocations, then expect failure.
        let mut count = 0;
        while allocate(&mut region, 64) != 0 {
            count += 1;
        }
        assert!(count > 0);
        assert_eq!(allocate(&mut region, 64), 0);
    }

    #[test]
    fn reallocate_preserves_payload() {
        let mut region = fresh(4096);
        let a = allocate(&mut region, 32);
        bytes_mut(&mut region, a, 32).copy_from_slice(&[7u8; 32]);

        let b = reallocate(&mut region, a, 256);
        assert_ne!(b, 0);
        assert_eq!(&region[b as usize..b as usize + 32], &[7u8; 32]);
    }

    #[test]
    fn reallocate_shrink_is_in_place() {
        let mut region = fresh(4096);
        let initial = free_size(&region);
        let a = allocate(&mut region, 512);
        let b = reallocate(&mut region, a, 64);
        assert_eq!(b, a);
        assert_eq!(free_size(&region), initial - 64 - BLOCK_HEADER_SIZE);
    }

    #[test]
    fn reallocate_null_and_zero() {
        let mut region = fresh(4096);
        assert_eq!(reallocate(&mut region, 0, 128), 0);

        let initial = free_size(&region);
        let a = allocate(&mut region, 128);
        assert_eq!(reallocate(&mut region, a, 0), 0);
        assert_eq!(free_size(&region), initial);
    }

    #[test]
    fn failed_growth_leaves_old_block() {
        let mut region = fresh(1024);
        let a = allocate(&mut region, 64);
        bytes_mut(&mut region, a, 64).copy_from_slice(&[9u8; 64]);

        let b = reallocate(&mut region, a, 1 << 20);
        assert_eq!(b, 0);
        assert_eq!(&region[a as usize..a as usize + 64], &[9u8; 64]);
    }
}
