// SPDX-License-Identifier: GPL-2.0

//! Lock-free virtual page allocator.
//!
//! Every allocation gets its own virtual page out of a large reserved
//! window, and every free makes that page inaccessible before its index
//! re-enters the free ring. A read or write through a stale pointer
//! faults synchronously instead of silently corrupting recycled memory.
//! The surrounding heap decides which requests deserve a dedicated page;
//! this crate only hands pages out and takes them back.

pub mod error;
pub mod memory;
pub mod types;

pub use error::{Error, Result};
pub use memory::page_alloc::PageAllocator;
pub use types::{PageIndex, VirtAddr, DEFAULT_ORDER, PAGE_SHIFT, PAGE_SIZE};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "pageguard";
