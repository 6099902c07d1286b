//! Typed addresses, address ranges and alignment helpers shared by the pool
//! allocators. Keeping physical and virtual addresses as distinct newtypes
//! makes it harder to accidentally hand one to code expecting the other.

#![cfg_attr(not(test), no_std)]

mod addr;
mod align;

pub use self::addr::*;
pub use self::align::*;
