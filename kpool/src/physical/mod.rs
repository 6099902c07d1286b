//! Management of physical memory in units of frames.

use core::ops;

use memtypes::{Alignable, PhysAddr};

use crate::{PAGE_ALIGN_BITS, PAGE_SIZE};

pub mod pool;
pub mod registry;
pub mod state;

pub use self::pool::{FramePool, PoolStats};
pub use self::registry::{release_frames, FramePoolRegistry, SharedFramePool, FRAME_POOLS, MAX_POOLS};
pub use self::state::{ByteStateTable, FrameState, FrameStateTable, PackedStateTable};

/// Number of a physical frame, counted from the start of physical memory.
/// The frame at physical address 0x0 has number zero.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone)]
pub struct Frame(pub usize);

impl Frame {
    /// Return the first frame starting at or above the given physical address.
    pub fn next_above(addr: PhysAddr) -> Frame {
        Frame(addr.align_up(PAGE_SIZE).0 >> PAGE_ALIGN_BITS)
    }

    /// Return the frame containing the given physical address.
    pub fn containing(addr: PhysAddr) -> Frame {
        Frame(addr.align_down(PAGE_SIZE).0 >> PAGE_ALIGN_BITS)
    }

    pub fn start_address(&self) -> PhysAddr {
        PhysAddr(self.0 * PAGE_SIZE)
    }

    pub fn end_address(&self) -> PhysAddr {
        PhysAddr(self.0 * PAGE_SIZE + PAGE_SIZE)
    }
}

impl ops::Add<usize> for Frame {
    type Output = Frame;

    fn add(self, rhs: usize) -> Frame {
        Frame(self.0 + rhs)
    }
}

impl ops::Sub<usize> for Frame {
    type Output = Frame;

    fn sub(self, rhs: usize) -> Frame {
        Frame(self.0 - rhs)
    }
}

impl ops::Sub<Frame> for Frame {
    type Output = usize;

    fn sub(self, rhs: Frame) -> usize {
        self.0 - rhs.0
    }
}

/// A half-open range of physical frames, `[start, end)`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    pub fn new(start: Frame, count: usize) -> FrameRange {
        FrameRange {
            start,
            end: start + count,
        }
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.start && frame < self.end
    }

    pub fn overlaps(&self, other: &FrameRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end
            && other.start < self.end
    }
}

/// Failure modes of releasing a run of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseError {
    /// The frame is not the head of an allocated sequence. Indicates a double
    /// free or a corrupted allocation handle.
    NotSequenceHead,
    /// The frame lies outside every registered pool (or outside the pool the
    /// release was issued on). The caller claimed a frame it never held.
    UnknownFrame,
}

/// Failure mode of operations taking an explicit frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsError {
    /// The requested frames extend beyond the pool's range.
    OutOfPool,
}

/// Failure modes of registering a pool with the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// The pool's frame range overlaps an already registered pool.
    Overlapping,
    /// The registry cannot hold another pool.
    CapacityExhausted,
    /// The pool's frame range is empty.
    EmptyRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_addresses() {
        assert_eq!(Frame(2).start_address(), PhysAddr(0x2000));
        assert_eq!(Frame(2).end_address(), PhysAddr(0x3000));
        assert_eq!(Frame::containing(PhysAddr(0x2FFF)), Frame(2));
        assert_eq!(Frame::next_above(PhysAddr(0x2001)), Frame(3));
        assert_eq!(Frame::next_above(PhysAddr(0x2000)), Frame(2));
    }

    #[test]
    fn frame_range_queries() {
        let r = FrameRange::new(Frame(1024), 512);
        assert_eq!(r.len(), 512);
        assert!(r.contains(Frame(1024)));
        assert!(r.contains(Frame(1535)));
        assert!(!r.contains(Frame(1536)));
        assert!(!r.contains(Frame(1023)));

        let before = FrameRange::new(Frame(512), 512);
        let inside = FrameRange::new(Frame(1100), 4);
        let empty = FrameRange::new(Frame(1100), 0);
        assert!(!r.overlaps(&before));
        assert!(r.overlaps(&inside));
        assert!(!r.overlaps(&empty));
    }
}
