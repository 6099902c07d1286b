//! Per-frame state storage for frame pools.
//!
//! Two encodings exist behind the same interface: one byte per frame, which
//! needs no bit fiddling, and a packed encoding with two bits per frame,
//! which cuts the info-frame overhead by four. The pool logic is written
//! against the [`FrameStateTable`] trait and never against a concrete layout,
//! so the encoding is selected purely by instantiation.

use crate::PAGE_SIZE;

/// State of a single physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameState {
    /// Available for allocation.
    Free = 0,
    /// Part of an allocated sequence, but not its first frame.
    Allocated = 1,
    /// First frame of an allocated sequence. The length of the sequence is
    /// not stored; it is recovered by walking until the next non-`Allocated`
    /// frame.
    HeadOfSequence = 2,
    /// Permanently unavailable: a physical memory hole, or storage of the
    /// pool's own state table. Terminal for the lifetime of the pool.
    Inaccessible = 3,
}

/// Width of a packed state entry in bits.
pub const FRAME_STATE_BITS: u32 = 2;

const STATE_MASK: u8 = (1 << FRAME_STATE_BITS) - 1;

impl FrameState {
    fn from_bits(bits: u8) -> FrameState {
        match bits & STATE_MASK {
            0 => FrameState::Free,
            1 => FrameState::Allocated,
            2 => FrameState::HeadOfSequence,
            _ => FrameState::Inaccessible,
        }
    }
}

/// Storage of one `FrameState` per frame, indexed from the start of the pool.
///
/// The table is the exclusive owner of its raw storage; all reads go through
/// `get` and all writes through `set`, so decoding is total by construction.
pub trait FrameStateTable {
    /// Number of frame states stored per byte of table storage. This constant
    /// is the single source of truth for the info-frame accounting in
    /// `FramePool::needed_info_frames`; the encoding and the formula cannot
    /// drift apart.
    const FRAMES_PER_BYTE: usize;

    /// Create a table tracking `n_frames` frames in the given storage and
    /// initialize every entry to `Free`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `bytes_needed(n_frames)` writable bytes
    /// that remain exclusively owned by the table for its whole lifetime.
    unsafe fn from_raw(ptr: *mut u8, n_frames: usize) -> Self;

    /// Number of frames tracked by this table.
    fn len(&self) -> usize;

    /// State of the frame at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    fn get(&self, idx: usize) -> FrameState;

    /// Set the state of the frame at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    fn set(&mut self, idx: usize, state: FrameState);

    /// Number of storage bytes needed to track `n_frames` frames.
    fn bytes_needed(n_frames: usize) -> usize {
        (n_frames + Self::FRAMES_PER_BYTE - 1) / Self::FRAMES_PER_BYTE
    }
}

/// One byte of storage per frame.
pub struct ByteStateTable {
    ptr: *mut u8,
    length: usize,
}

// The table exclusively owns its storage (see `FrameStateTable::from_raw`),
// so it can move between threads together with its pool.
unsafe impl Send for ByteStateTable {}

impl FrameStateTable for ByteStateTable {
    const FRAMES_PER_BYTE: usize = 1;

    unsafe fn from_raw(ptr: *mut u8, n_frames: usize) -> ByteStateTable {
        for i in 0..n_frames {
            ptr.add(i).write(FrameState::Free as u8);
        }
        ByteStateTable {
            ptr,
            length: n_frames,
        }
    }

    fn len(&self) -> usize {
        self.length
    }

    fn get(&self, idx: usize) -> FrameState {
        assert!(idx < self.length);
        FrameState::from_bits(unsafe { self.ptr.add(idx).read() })
    }

    fn set(&mut self, idx: usize, state: FrameState) {
        assert!(idx < self.length);
        unsafe { self.ptr.add(idx).write(state as u8) }
    }
}

/// Two bits of storage per frame, four frames per byte.
pub struct PackedStateTable {
    ptr: *mut u8,
    length: usize,
}

unsafe impl Send for PackedStateTable {}

impl FrameStateTable for PackedStateTable {
    const FRAMES_PER_BYTE: usize = (8 / FRAME_STATE_BITS) as usize;

    unsafe fn from_raw(ptr: *mut u8, n_frames: usize) -> PackedStateTable {
        // FrameState::Free is the all-zero bit pattern
        for i in 0..Self::bytes_needed(n_frames) {
            ptr.add(i).write(0);
        }
        PackedStateTable {
            ptr,
            length: n_frames,
        }
    }

    fn len(&self) -> usize {
        self.length
    }

    fn get(&self, idx: usize) -> FrameState {
        assert!(idx < self.length);
        let byte = unsafe { self.ptr.add(idx / Self::FRAMES_PER_BYTE).read() };
        let shift = (idx % Self::FRAMES_PER_BYTE) as u32 * FRAME_STATE_BITS;
        FrameState::from_bits(byte >> shift)
    }

    fn set(&mut self, idx: usize, state: FrameState) {
        assert!(idx < self.length);
        let slot = idx / Self::FRAMES_PER_BYTE;
        let shift = (idx % Self::FRAMES_PER_BYTE) as u32 * FRAME_STATE_BITS;
        unsafe {
            let byte = self.ptr.add(slot).read();
            let cleared = byte & !(STATE_MASK << shift);
            self.ptr.add(slot).write(cleared | ((state as u8) << shift));
        }
    }
}

assert_eq_size!(frame_state_size; FrameState, u8);
const_assert!(packed_fills_byte; PackedStateTable::FRAMES_PER_BYTE * FRAME_STATE_BITS as usize == 8);
const_assert!(page_size_pow2; PAGE_SIZE & (PAGE_SIZE - 1) == 0);
