//! First-fit allocation of variable-sized regions in one virtual address
//! range.

use alloc::vec::Vec;

use log::{debug, trace};
use memtypes::{VirtAddr, VirtAddrRange};

use super::mapper::PageMapper;
use super::{Region, RegionError};
use crate::PAGE_SIZE;

/// Allocates variable-sized, non-overlapping regions out of one contiguous
/// virtual address range.
///
/// Only allocated regions are stored; absence from the list means free.
/// Allocation walks the gaps between live regions in ascending address order
/// and takes the first that fits, so freed extents are reused before the
/// address space grows towards the end of the range. Backing pages are
/// created lazily by the page-mapping collaborator on first touch; releasing
/// a region unmaps every page it covered.
///
/// The region list grows on demand. For a bounded-memory mode, a cap on the
/// number of live regions can be set at construction.
pub struct RegionAllocator {
    base: VirtAddr,
    size: usize,
    /// Live regions, sorted by start address, pairwise disjoint, all inside
    /// `[base, base + size)`.
    regions: Vec<Region>,
    /// Optional bound on the number of live regions.
    capacity: Option<usize>,
}

impl RegionAllocator {
    /// Create an allocator over `[base, base + size)` and register that range
    /// with the page mapper, so faults inside it are routed here.
    pub fn new(base: VirtAddr, size: usize, mapper: &mut dyn PageMapper) -> RegionAllocator {
        assert!(
            base.checked_add(size).is_some(),
            "virtual range wraps around the address space"
        );
        mapper.register_range(VirtAddrRange {
            start: base,
            length: size,
        });
        debug!("[vmpool] managing [{:p}, {:p})", base, base + size);
        RegionAllocator {
            base,
            size,
            regions: Vec::new(),
            capacity: None,
        }
    }

    /// Like [`new`](RegionAllocator::new), but refuse to hold more than
    /// `max_regions` live regions at a time.
    pub fn with_capacity_limit(
        base: VirtAddr,
        size: usize,
        max_regions: usize,
        mapper: &mut dyn PageMapper,
    ) -> RegionAllocator {
        let mut pool = RegionAllocator::new(base, size, mapper);
        pool.capacity = Some(max_regions);
        pool
    }

    /// The virtual address range managed by this allocator.
    pub fn addr_range(&self) -> VirtAddrRange {
        VirtAddrRange {
            start: self.base,
            length: self.size,
        }
    }

    /// Number of live regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Allocate a region of `size` bytes.
    ///
    /// Placement is first-fit over the gaps in ascending address order: the
    /// gap between the range base and the first region, each gap between
    /// consecutive regions, and finally the tail after the last region.
    ///
    /// Returns `None` for a zero size, when the live-region cap is reached,
    /// or when no gap is large enough; the region set is unchanged on
    /// failure. Callers must never interpret a `None` as an address.
    pub fn allocate(&mut self, size: usize) -> Option<VirtAddr> {
        if size == 0 {
            return None;
        }
        if let Some(cap) = self.capacity {
            if self.regions.len() >= cap {
                trace!("[vmpool] allocate({}) hit the region cap of {}", size, cap);
                return None;
            }
        }
        // Candidate gaps begin at the range base and behind each live region.
        // The loop invariant `gap_start <= region.start` holds because the
        // list is sorted and disjoint.
        let mut gap_start = self.base;
        let mut insert_at = self.regions.len();
        for (i, region) in self.regions.iter().enumerate() {
            if region.start - gap_start >= size {
                insert_at = i;
                break;
            }
            gap_start = region.end();
        }
        if insert_at == self.regions.len() {
            // tail gap: the space behind the last region (or the whole range)
            let used = gap_start - self.base;
            if size > self.size - used {
                trace!("[vmpool] allocate({}) failed, address space exhausted", size);
                return None;
            }
        }
        self.regions.insert(
            insert_at,
            Region {
                start: gap_start,
                length: size,
            },
        );
        trace!("[vmpool] allocate({}) -> {:p}", size, gap_start);
        Some(gap_start)
    }

    /// Release the region starting exactly at `addr` and unmap every page it
    /// covered (its length rounded up to whole pages), one call per page.
    ///
    /// Releasing an address at which no region starts is a caller error and
    /// surfaced as `NoSuchRegion`, never silently ignored.
    pub fn release(
        &mut self,
        addr: VirtAddr,
        mapper: &mut dyn PageMapper,
    ) -> Result<(), RegionError> {
        let idx = self
            .regions
            .iter()
            .position(|r| r.start == addr)
            .ok_or(RegionError::NoSuchRegion)?;
        let region = self.regions.remove(idx);
        let pages = (region.length + PAGE_SIZE - 1) / PAGE_SIZE;
        for page in 0..pages {
            mapper.unmap(region.start + page * PAGE_SIZE);
        }
        trace!(
            "[vmpool] released region at {:p}, {} page(s) unmapped",
            region.start,
            pages
        );
        Ok(())
    }

    /// Whether `addr` lies inside some live region. Pure query with no side
    /// effects, used to validate that a pointer belongs to a managed region
    /// before trusting it.
    pub fn is_legitimate(&self, addr: VirtAddr) -> bool {
        for region in self.regions.iter() {
            if region.start > addr {
                // sorted by start, no later region can contain the address
                break;
            }
            if region.contains(addr) {
                return true;
            }
        }
        false
    }
}
