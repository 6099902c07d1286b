//! Newtype wrappers that make it harder to accidentally confuse physical and
//! virtual addresses.

use core::fmt;
use core::ops;

use super::align::Alignable;

/// A virtual address. Its validity depends on the current page mapping.
#[repr(transparent)]
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Debug)]
pub struct VirtAddr(pub usize);

/// A physical address. Whether it is accessible depends on the current page mapping.
#[repr(transparent)]
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Debug)]
pub struct PhysAddr(pub usize);

impl VirtAddr {
    pub unsafe fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub unsafe fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Offset the address, returning `None` on address-space wrap-around.
    pub fn checked_add(self, offset: usize) -> Option<VirtAddr> {
        self.0.checked_add(offset).map(VirtAddr)
    }
}

impl PhysAddr {
    /// Reinterpret the physical address as a pointer.
    ///
    /// # Safety
    ///
    /// Only meaningful in environments where physical memory is identity
    /// mapped (or not mapped at all, e.g. with paging disabled).
    pub unsafe fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Offset the address, returning `None` on address-space wrap-around.
    pub fn checked_add(self, offset: usize) -> Option<PhysAddr> {
        self.0.checked_add(offset).map(PhysAddr)
    }
}

/// An address range of either physical or virtual memory locations,
/// covering `[start, start + length)`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AddrRange<Addr> {
    pub start: Addr,
    pub length: usize,
}

impl<Addr> AddrRange<Addr>
where
    Addr: ops::Add<usize, Output = Addr> + ops::Sub<Addr, Output = usize> + Copy + PartialOrd,
{
    pub fn from_bounds(start: Addr, end: Addr) -> AddrRange<Addr> {
        AddrRange {
            start,
            length: if end < start { 0 } else { end - start },
        }
    }

    pub fn end(&self) -> Addr {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether the address lies inside the half-open range.
    pub fn contains(&self, addr: Addr) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Whether the two ranges share at least one address.
    pub fn overlaps(&self, other: &AddrRange<Addr>) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end()
            && other.start < self.end()
    }
}

pub type PhysAddrRange = AddrRange<PhysAddr>;
pub type VirtAddrRange = AddrRange<VirtAddr>;

macro_rules! impl_addr_arith {
    ($addr:tt) => {
        impl Alignable for $addr {
            type Alignment = usize;

            fn align_up(self, alignment: usize) -> Self {
                $addr(self.0.align_up(alignment))
            }

            fn align_down(self, alignment: usize) -> Self {
                $addr(self.0.align_down(alignment))
            }

            fn is_aligned(self, alignment: usize) -> bool {
                self.align_down(alignment) == self
            }
        }

        impl ops::Add<usize> for $addr {
            type Output = $addr;

            fn add(self, other: usize) -> Self::Output {
                $addr(self.0 + other)
            }
        }

        impl ops::AddAssign<usize> for $addr {
            fn add_assign(&mut self, other: usize) {
                self.0 += other;
            }
        }

        impl ops::Sub<usize> for $addr {
            type Output = $addr;

            fn sub(self, other: usize) -> Self::Output {
                $addr(self.0 - other)
            }
        }

        impl ops::Sub<$addr> for $addr {
            type Output = usize;

            fn sub(self, other: $addr) -> Self::Output {
                self.0 - other.0
            }
        }
    };
}

impl_addr_arith!(VirtAddr);
impl_addr_arith!(PhysAddr);

impl fmt::Pointer for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:016x}_P", self.0)
    }
}

impl fmt::Pointer for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:016x}_V", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds() {
        let r = VirtAddrRange {
            start: VirtAddr(0x1000),
            length: 0x2000,
        };
        assert_eq!(r.end(), VirtAddr(0x3000));
        assert!(!r.contains(VirtAddr(0xFFF)));
        assert!(r.contains(VirtAddr(0x1000)));
        assert!(r.contains(VirtAddr(0x2FFF)));
        assert!(!r.contains(VirtAddr(0x3000)));
    }

    #[test]
    fn range_from_bounds() {
        let r = PhysAddrRange::from_bounds(PhysAddr(0x4000), PhysAddr(0x6000));
        assert_eq!(r.length, 0x2000);
        // inverted bounds collapse to an empty range
        let e = PhysAddrRange::from_bounds(PhysAddr(0x6000), PhysAddr(0x4000));
        assert!(e.is_empty());
        assert!(!e.contains(PhysAddr(0x6000)));
    }

    #[test]
    fn range_overlap() {
        let a = VirtAddrRange {
            start: VirtAddr(0x1000),
            length: 0x1000,
        };
        let b = VirtAddrRange {
            start: VirtAddr(0x1800),
            length: 0x1000,
        };
        let c = VirtAddrRange {
            start: VirtAddr(0x2000),
            length: 0x1000,
        };
        let empty = VirtAddrRange {
            start: VirtAddr(0x1000),
            length: 0,
        };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&empty));
        assert!(!empty.overlaps(&a));
    }

    #[test]
    fn checked_add_detects_wraparound() {
        assert_eq!(VirtAddr(4).checked_add(4), Some(VirtAddr(8)));
        assert_eq!(VirtAddr(usize::max_value()).checked_add(1), None);
        assert_eq!(PhysAddr(usize::max_value() - 1).checked_add(2), None);
    }

    #[test]
    fn virt_addr_as_ptr() {
        let value: u32 = 0xC0FFEE;
        let addr = VirtAddr(&value as *const u32 as usize);
        assert_eq!(unsafe { *addr.as_ptr::<u32>() }, 0xC0FFEE);
    }
}
