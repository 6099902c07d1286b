//! Pools of physically contiguous frames.

use log::{debug, trace};

use super::state::{FrameState, FrameStateTable};
use super::{BoundsError, Frame, FrameRange, ReleaseError};
use crate::PAGE_SIZE;

/// A pool over one contiguous range of physical frames, supporting allocation
/// and release of contiguous runs.
///
/// Per-frame state lives in a [`FrameStateTable`]. A multi-frame run is
/// recorded by marking its first frame `HeadOfSequence` and the remaining
/// frames `Allocated`; a release therefore only needs the head frame number
/// and recovers the run length by walking the table.
///
/// The pool performs no locking; wrap shared instances in `spinlock::Mutex`
/// (which also makes them usable with the pool registry, see
/// `super::registry::SharedFramePool`).
pub struct FramePool<T> {
    base: Frame,
    n_frames: usize,
    info_frames: usize,
    states: T,
}

impl<T: FrameStateTable> FramePool<T> {
    /// Number of info frames needed to hold the state table of a pool of
    /// `n_frames` frames. Derived from the state encoding of `T`, so a pool
    /// reserving this many frames can never under- or over-allocate its own
    /// bookkeeping storage.
    pub fn needed_info_frames(n_frames: usize) -> usize {
        let bytes = T::bytes_needed(n_frames);
        (bytes + PAGE_SIZE - 1) / PAGE_SIZE
    }

    /// Create a pool whose state table lives in caller-provided storage.
    /// All frames start out `Free`.
    ///
    /// This is the primitive the other constructors lower to, and the entry
    /// point for tests that back the table with an ordinary buffer.
    ///
    /// # Safety
    ///
    /// `storage` must point to at least `T::bytes_needed(n_frames)` writable
    /// bytes that stay exclusively owned by this pool for its whole lifetime.
    pub unsafe fn from_raw_parts(base: Frame, n_frames: usize, storage: *mut u8) -> FramePool<T> {
        assert!(n_frames > 0, "a frame pool cannot be empty");
        FramePool {
            base,
            n_frames,
            info_frames: 0,
            states: T::from_raw(storage, n_frames),
        }
    }

    /// Create a self-describing pool: the state table lives in the leading
    /// frames of the pool's own range. Those info frames are marked
    /// `Inaccessible`, so they can never be handed out and a release on them
    /// always fails.
    ///
    /// # Safety
    ///
    /// The pool's frame range must be usable memory that is identity mapped
    /// (or accessed with paging disabled) and not in use by anything else.
    pub unsafe fn embed(base: Frame, n_frames: usize) -> FramePool<T> {
        let info_frames = Self::needed_info_frames(n_frames);
        assert!(
            info_frames < n_frames,
            "pool too small to hold its own state table"
        );
        let mut pool = Self::from_raw_parts(base, n_frames, base.start_address().as_mut_ptr());
        pool.info_frames = info_frames;
        for idx in 0..info_frames {
            pool.states.set(idx, FrameState::Inaccessible);
        }
        debug!(
            "[pfa] pool over frames [{}, {}), {} info frame(s) embedded",
            base.0,
            base.0 + n_frames,
            info_frames
        );
        pool
    }

    /// Create a pool whose state table lives in `info_frame_count` frames
    /// starting at `info_frame`, previously obtained from another, already
    /// initialized pool. The count is trusted as-is. All own frames start
    /// `Free`.
    ///
    /// # Safety
    ///
    /// The info frames must be identity mapped, large enough for
    /// `T::bytes_needed(n_frames)` bytes, and owned by this pool from now on.
    pub unsafe fn with_info_at(
        base: Frame,
        n_frames: usize,
        info_frame: Frame,
        info_frame_count: usize,
    ) -> FramePool<T> {
        let mut pool = Self::from_raw_parts(base, n_frames, info_frame.start_address().as_mut_ptr());
        pool.info_frames = info_frame_count;
        debug!(
            "[pfa] pool over frames [{}, {}), info at frame {}",
            base.0,
            base.0 + n_frames,
            info_frame.0
        );
        pool
    }

    /// The frame-number range covered by this pool.
    pub fn frame_range(&self) -> FrameRange {
        FrameRange::new(self.base, self.n_frames)
    }

    /// Number of frames consumed by the pool's own state table.
    pub fn info_frames(&self) -> usize {
        self.info_frames
    }

    /// State of the given frame, or `None` if it is outside the pool.
    pub fn frame_state(&self, frame: Frame) -> Option<FrameState> {
        if self.frame_range().contains(frame) {
            Some(self.states.get(frame - self.base))
        } else {
            None
        }
    }

    /// Allocate `n` contiguous frames.
    ///
    /// Scans left to right and takes the first run of `n` free frames, without
    /// wraparound. The first frame of the run becomes `HeadOfSequence`, the
    /// remaining `n - 1` become `Allocated`. Returns `None` when `n` is zero,
    /// exceeds the pool, or no sufficient run exists; no frame state changes
    /// on failure.
    pub fn get_frames(&mut self, n: usize) -> Option<Frame> {
        if n == 0 || n > self.n_frames {
            return None;
        }
        let mut run = 0;
        for idx in 0..self.n_frames {
            if self.states.get(idx) == FrameState::Free {
                run += 1;
            } else {
                run = 0;
            }
            if run == n {
                let head = idx + 1 - n;
                self.states.set(head, FrameState::HeadOfSequence);
                for i in head + 1..=idx {
                    self.states.set(i, FrameState::Allocated);
                }
                trace!("[pfa] get_frames({}) -> frame {}", n, self.base.0 + head);
                return Some(self.base + head);
            }
        }
        trace!("[pfa] get_frames({}) found no free run", n);
        None
    }

    /// Permanently remove `n` frames starting at `start` from circulation,
    /// regardless of their prior state. Used to carve out physical memory
    /// holes so `get_frames` never selects them. `Inaccessible` is terminal;
    /// nothing ever transitions such a frame back.
    ///
    /// Fails without side effect if the range is not fully inside the pool.
    pub fn mark_inaccessible(&mut self, start: Frame, n: usize) -> Result<(), BoundsError> {
        if !self.frame_range().contains(start) {
            return Err(BoundsError::OutOfPool);
        }
        let first = start - self.base;
        let end = first.checked_add(n).ok_or(BoundsError::OutOfPool)?;
        if end > self.n_frames {
            return Err(BoundsError::OutOfPool);
        }
        for idx in first..end {
            self.states.set(idx, FrameState::Inaccessible);
        }
        debug!(
            "[pfa] frames [{}, {}) marked inaccessible",
            start.0,
            start.0 + n
        );
        Ok(())
    }

    /// Release the contiguous run whose first frame is `head`.
    ///
    /// The head is freed, then the walk continues freeing `Allocated` frames
    /// until it reaches a frame in any other state or the pool boundary.
    /// Returns the number of frames freed.
    ///
    /// Fails without side effect if `head` lies outside the pool
    /// (`UnknownFrame`) or is not in `HeadOfSequence` state
    /// (`NotSequenceHead`, the signature of a double free).
    pub fn release_frames(&mut self, head: Frame) -> Result<usize, ReleaseError> {
        if !self.frame_range().contains(head) {
            return Err(ReleaseError::UnknownFrame);
        }
        let first = head - self.base;
        if self.states.get(first) != FrameState::HeadOfSequence {
            return Err(ReleaseError::NotSequenceHead);
        }
        self.states.set(first, FrameState::Free);
        let mut freed = 1;
        let mut idx = first + 1;
        while idx < self.n_frames && self.states.get(idx) == FrameState::Allocated {
            self.states.set(idx, FrameState::Free);
            freed += 1;
            idx += 1;
        }
        trace!("[pfa] released {} frame(s) at {}", freed, head.0);
        Ok(freed)
    }

    /// Per-state frame counts. Linear scan, meant for diagnostics.
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            total_count: self.n_frames,
            free_count: 0,
            allocated_count: 0,
            inaccessible_count: 0,
        };
        for idx in 0..self.n_frames {
            match self.states.get(idx) {
                FrameState::Free => stats.free_count += 1,
                FrameState::Allocated | FrameState::HeadOfSequence => {
                    stats.allocated_count += 1
                }
                FrameState::Inaccessible => stats.inaccessible_count += 1,
            }
        }
        stats
    }
}

/// Frame counts per state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total_count: usize,
    pub free_count: usize,
    pub allocated_count: usize,
    pub inaccessible_count: usize,
}
