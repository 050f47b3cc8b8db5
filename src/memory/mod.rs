// SPDX-License-Identifier: GPL-2.0

//! Memory management subsystem

pub mod os;
pub mod page_alloc;
pub mod slot_ring;

pub use page_alloc::{alloc_page, free_page, PageAllocator};

use crate::error::Result;

/// Initialize the memory subsystem.
pub fn init() -> Result<()> {
	page_alloc::init()
}
