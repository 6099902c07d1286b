//! The process-wide mapping from frame numbers to the pool owning them.
//!
//! A release call carries only a bare frame number and no pool identity, so
//! releases are dispatched through an interval table from frame ranges to
//! pool handles. Entries are added when a pool is registered and never
//! removed; pools live for the whole uptime.

use log::debug;
use spinlock::Mutex;

use super::pool::FramePool;
use super::state::FrameStateTable;
use super::{Frame, FrameRange, RegisterError, ReleaseError};

/// Maximum number of pools the registry can hold.
pub const MAX_POOLS: usize = 8;

/// Object-safe view of a shared (lock-guarded) frame pool, as stored in the
/// registry.
pub trait SharedFramePool: Sync {
    /// The frame-number range owned by the pool.
    fn frame_range(&self) -> FrameRange;

    /// Release the contiguous run whose first frame is `head`.
    fn release_frames(&self, head: Frame) -> Result<usize, ReleaseError>;
}

impl<T: FrameStateTable + Send> SharedFramePool for Mutex<FramePool<T>> {
    fn frame_range(&self) -> FrameRange {
        self.lock().frame_range()
    }

    fn release_frames(&self, head: Frame) -> Result<usize, ReleaseError> {
        self.lock().release_frames(head)
    }
}

#[derive(Clone, Copy)]
struct Entry<'a> {
    range: FrameRange,
    pool: &'a dyn SharedFramePool,
}

/// Fixed-capacity interval table from frame ranges to pool handles, kept
/// sorted by range start. All scans are bounded by the live entry count.
pub struct FramePoolRegistry<'a> {
    entries: [Option<Entry<'a>>; MAX_POOLS],
    len: usize,
}

impl<'a> FramePoolRegistry<'a> {
    pub const fn new() -> FramePoolRegistry<'a> {
        FramePoolRegistry {
            entries: [None; MAX_POOLS],
            len: 0,
        }
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register a pool. Its frame range must be non-empty and disjoint from
    /// the range of every pool already registered. Pools are never
    /// unregistered.
    pub fn register(&mut self, pool: &'a dyn SharedFramePool) -> Result<(), RegisterError> {
        let range = pool.frame_range();
        if range.is_empty() {
            return Err(RegisterError::EmptyRange);
        }
        if self.len == MAX_POOLS {
            return Err(RegisterError::CapacityExhausted);
        }
        let mut insert_at = self.len;
        for (i, slot) in self.entries[..self.len].iter().enumerate() {
            if let Some(entry) = slot {
                if entry.range.overlaps(&range) {
                    return Err(RegisterError::Overlapping);
                }
                if range.start < entry.range.start && insert_at == self.len {
                    insert_at = i;
                }
            }
        }
        // shift the tail up to keep the table sorted by range start
        let mut i = self.len;
        while i > insert_at {
            self.entries[i] = self.entries[i - 1];
            i -= 1;
        }
        self.entries[insert_at] = Some(Entry { range, pool });
        self.len += 1;
        debug!(
            "[pfa] registered pool over frames [{}, {})",
            range.start.0, range.end.0
        );
        Ok(())
    }

    /// The pool owning `frame`, if any.
    pub fn owner_of(&self, frame: Frame) -> Option<&'a dyn SharedFramePool> {
        for slot in self.entries[..self.len].iter() {
            if let Some(entry) = slot {
                if entry.range.start > frame {
                    // sorted by start, no later entry can contain the frame
                    break;
                }
                if entry.range.contains(frame) {
                    return Some(entry.pool);
                }
            }
        }
        None
    }

    /// Release a contiguous run through the pool owning its head frame.
    ///
    /// A frame owned by no registered pool means the caller claimed a frame
    /// it never legitimately held; this is reported as `UnknownFrame` and
    /// must be treated as fatal at the call site.
    pub fn release_frames(&self, frame: Frame) -> Result<usize, ReleaseError> {
        match self.owner_of(frame) {
            Some(pool) => pool.release_frames(frame),
            None => Err(ReleaseError::UnknownFrame),
        }
    }
}

/// The global pool registry.
pub static FRAME_POOLS: Mutex<FramePoolRegistry<'static>> = Mutex::new(FramePoolRegistry::new());

/// Release a contiguous run of frames through the global registry, given only
/// the head frame number.
pub fn release_frames(frame: Frame) -> Result<usize, ReleaseError> {
    FRAME_POOLS.lock().release_frames(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::state::ByteStateTable;

    struct FakePool {
        range: FrameRange,
        released: Mutex<Vec<usize>>,
    }

    impl FakePool {
        fn new(start: usize, count: usize) -> FakePool {
            FakePool {
                range: FrameRange::new(Frame(start), count),
                released: Mutex::new(Vec::new()),
            }
        }
    }

    impl SharedFramePool for FakePool {
        fn frame_range(&self) -> FrameRange {
            self.range
        }

        fn release_frames(&self, head: Frame) -> Result<usize, ReleaseError> {
            self.released.lock().push(head.0);
            Ok(1)
        }
    }

    #[test]
    fn dispatch_picks_owning_pool() {
        let low = FakePool::new(0, 512);
        let high = FakePool::new(1024, 512);
        let mut registry = FramePoolRegistry::new();
        registry.register(&high).unwrap();
        registry.register(&low).unwrap();

        assert_eq!(registry.release_frames(Frame(17)), Ok(1));
        assert_eq!(registry.release_frames(Frame(1024)), Ok(1));
        assert_eq!(registry.release_frames(Frame(1535)), Ok(1));
        assert_eq!(*low.released.lock(), vec![17]);
        assert_eq!(*high.released.lock(), vec![1024, 1535]);
    }

    #[test]
    fn unknown_frame_is_an_error() {
        let pool = FakePool::new(100, 50);
        let mut registry = FramePoolRegistry::new();
        registry.register(&pool).unwrap();

        assert_eq!(
            registry.release_frames(Frame(99)),
            Err(ReleaseError::UnknownFrame)
        );
        assert_eq!(
            registry.release_frames(Frame(150)),
            Err(ReleaseError::UnknownFrame)
        );
        assert!(pool.released.lock().is_empty());
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let a = FakePool::new(0, 100);
        let tail_overlap = FakePool::new(99, 10);
        let contained = FakePool::new(40, 10);
        let adjacent = FakePool::new(100, 10);
        let mut registry = FramePoolRegistry::new();

        registry.register(&a).unwrap();
        assert_eq!(
            registry.register(&tail_overlap),
            Err(RegisterError::Overlapping)
        );
        assert_eq!(registry.register(&contained), Err(RegisterError::Overlapping));
        assert_eq!(registry.register(&adjacent), Ok(()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn empty_range_is_rejected() {
        let empty = FakePool::new(10, 0);
        let mut registry = FramePoolRegistry::new();
        assert_eq!(registry.register(&empty), Err(RegisterError::EmptyRange));
        assert!(registry.is_empty());
    }

    #[test]
    fn capacity_is_bounded() {
        let pools: Vec<FakePool> = (0..MAX_POOLS + 1)
            .map(|i| FakePool::new(i * 1000, 100))
            .collect();
        let mut registry = FramePoolRegistry::new();
        for pool in pools.iter().take(MAX_POOLS) {
            registry.register(pool).unwrap();
        }
        assert_eq!(
            registry.register(&pools[MAX_POOLS]),
            Err(RegisterError::CapacityExhausted)
        );
    }

    #[test]
    fn lookup_after_out_of_order_registration() {
        let c = FakePool::new(2000, 10);
        let a = FakePool::new(0, 10);
        let b = FakePool::new(1000, 10);
        let mut registry = FramePoolRegistry::new();
        registry.register(&c).unwrap();
        registry.register(&a).unwrap();
        registry.register(&b).unwrap();

        assert!(registry.owner_of(Frame(5)).is_some());
        assert!(registry.owner_of(Frame(1005)).is_some());
        assert!(registry.owner_of(Frame(2005)).is_some());
        assert!(registry.owner_of(Frame(500)).is_none());
    }

    #[test]
    fn global_registry_round_trip() {
        // frame numbers here are unique to this test, as the global registry
        // is shared between all tests of the process
        let buf = Box::leak(vec![0_u8; 64].into_boxed_slice());
        let pool: &'static Mutex<FramePool<ByteStateTable>> = Box::leak(Box::new(Mutex::new(
            unsafe { FramePool::from_raw_parts(Frame(900_000), 64, buf.as_mut_ptr()) },
        )));
        FRAME_POOLS.lock().register(pool).unwrap();

        let head = pool.lock().get_frames(3).unwrap();
        assert_eq!(release_frames(head), Ok(3));
        assert_eq!(
            release_frames(Frame(999_999_999)),
            Err(ReleaseError::UnknownFrame)
        );
    }
}
