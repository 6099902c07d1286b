//! Kernel memory pools.
//!
//! The [`physical`] module manages pools of physically contiguous frames:
//! allocation and release of contiguous runs, carving out of memory holes,
//! and a process-wide registry that routes a bare frame number back to the
//! pool owning it.
//!
//! The [`virt`] module layers variable-sized address-space regions on top:
//! a region allocator hands out non-overlapping extents of one virtual
//! address range and drives the page-mapping collaborator when regions are
//! released.
//!
//! All state lives in the pool instances themselves; nothing here blocks,
//! retries or suspends. Pools shared between contexts are expected to be
//! wrapped in a `spinlock::Mutex` (see `physical::SharedFramePool`).

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate static_assertions;

extern crate alloc;

pub mod physical;
pub mod virt;

/// Number of trailing zeros in a page aligned address.
pub const PAGE_ALIGN_BITS: u32 = 12;

/// Size of a page and of a physical frame, 4096 bytes.
pub const PAGE_SIZE: usize = 1 << PAGE_ALIGN_BITS;
