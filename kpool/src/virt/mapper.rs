//! The page-mapping collaborator, expressed as a narrow capability.

use memtypes::{VirtAddr, VirtAddrRange};

/// Capability interface a [`RegionAllocator`](super::RegionAllocator) needs
/// from the page-mapping layer.
///
/// The mapper owns everything below the translation: it creates mappings
/// lazily when an address inside a registered range is first touched, pulls
/// the backing frames from a frame pool, and on `unmap` returns them there
/// via the pool registry. None of that machinery is visible here.
pub trait PageMapper {
    /// Declare `range` as backed by a region allocator, so that faults and
    /// lookups inside it are routed to that allocator.
    fn register_range(&mut self, range: VirtAddrRange);

    /// Remove the translation for the single page at `page`. Unmapping a page
    /// that was never faulted in is a no-op.
    fn unmap(&mut self, page: VirtAddr);
}

/// A mapper that ignores every call. Useful for address spaces that never
/// have live translations, and as a stand-in in tests.
pub struct NullMapper;

impl PageMapper for NullMapper {
    fn register_range(&mut self, _range: VirtAddrRange) {}

    fn unmap(&mut self, _page: VirtAddr) {}
}
