//! Management of virtual address space in variable-sized regions.

use memtypes::VirtAddr;

pub mod mapper;
pub mod pool;

pub use self::mapper::{NullMapper, PageMapper};
pub use self::pool::RegionAllocator;

/// A contiguous extent of virtual addresses currently granted to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: VirtAddr,
    pub length: usize,
}

impl Region {
    pub fn end(&self) -> VirtAddr {
        self.start + self.length
    }

    /// Whether the address lies inside the half-open extent.
    pub fn contains(&self, addr: VirtAddr) -> bool {
        addr >= self.start && addr < self.end()
    }
}

/// Failure mode of releasing a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// No live region starts at the given address. Indicates a double release
    /// or a pointer that never came from this allocator.
    NoSuchRegion,
}
