// SPDX-License-Identifier: GPL-2.0

//! Page allocator facade
//!
//! Composes the OS facade and the slot ring: every allocation takes the
//! oldest free page of a fixed virtual window and makes it accessible;
//! every free makes its page inaccessible again before the index re-enters
//! the ring. A stale pointer therefore faults instead of reading recycled
//! memory, and it keeps faulting until the ring wraps all the way around.

use once_cell::sync::OnceCell;

use crate::error::{die, Error, Result};
use crate::memory::os;
use crate::memory::slot_ring::SlotRing;
use crate::types::{PageIndex, VirtAddr, DEFAULT_ORDER, PAGE_SHIFT, PAGE_SIZE};

/// Virtual page allocator over a fixed window.
pub struct PageAllocator {
	/// Base of the reserved window; every address the allocator hands out
	/// lies inside `[window, window + pages * PAGE_SIZE)`.
	window: VirtAddr,
	/// Number of pages in the window.
	pages: u32,
	ring: SlotRing,
}

impl PageAllocator {
	/// Reserve a window of `1 << order` pages, all of them free and
	/// inaccessible. The page index must stay clear of the slot flag bit,
	/// so `order` is capped at 30.
	pub fn new(order: u32) -> Result<Self> {
		if order > 30 {
			return Err(Error::InvalidArgument);
		}
		// Protection granularity must match the configured page size.
		if os::page_size() != PAGE_SIZE {
			return Err(Error::InvalidArgument);
		}
		let pages = 1u32 << order;
		let window = os::reserve_window((pages as usize) << PAGE_SHIFT)?;
		let ring = SlotRing::new(pages)?;
		Ok(Self { window, pages, ring })
	}

	/// Allocate one page and return its accessible, page-aligned address.
	/// Contents are unspecified; callers needing zeroed memory zero it
	/// themselves.
	///
	/// Aborts the process if the window is exhausted or the kernel refuses
	/// the protection change.
	pub fn alloc_page(&self) -> VirtAddr {
		let page = match self.ring.pop() {
			Some(page) => page,
			None => die("page window exhausted", Error::OutOfMemory),
		};
		let addr = self.page_addr(PageIndex(page));
		if let Err(err) = os::set_accessible(addr, PAGE_SIZE, true) {
			die("cannot map allocated page", err);
		}
		addr
	}

	/// Free a page previously returned by [`Self::alloc_page`]. The page
	/// traps on access from this call onward, until the ring wraps far
	/// enough to reissue it.
	pub fn free_page(&self, addr: VirtAddr) {
		debug_assert!(self.contains(addr));
		debug_assert!(addr.is_page_aligned());
		if let Err(err) = os::set_accessible(addr, PAGE_SIZE, false) {
			die("cannot unmap freed page", err);
		}
		self.ring.push(self.page_index(addr).0);
	}

	/// Number of pages currently free.
	pub fn free_pages(&self) -> u32 {
		self.ring.free_count()
	}

	/// Total number of pages in the window.
	pub fn total_pages(&self) -> u32 {
		self.pages
	}

	/// Whether `addr` lies inside the window.
	pub fn contains(&self, addr: VirtAddr) -> bool {
		addr >= self.window && addr - self.window < (self.pages as usize) << PAGE_SHIFT
	}

	fn page_addr(&self, index: PageIndex) -> VirtAddr {
		self.window + index.to_offset()
	}

	fn page_index(&self, addr: VirtAddr) -> PageIndex {
		PageIndex::from_offset(addr - self.window)
	}
}

impl Drop for PageAllocator {
	fn drop(&mut self) {
		let _ = os::release(self.window, (self.pages as usize) << PAGE_SHIFT);
	}
}

/// Global page allocator
static PAGE_ALLOCATOR: OnceCell<PageAllocator> = OnceCell::new();

/// Initialize the global page allocator with the default window size.
pub fn init() -> Result<()> {
	let allocator = PageAllocator::new(DEFAULT_ORDER)?;
	let pages = allocator.total_pages();
	let window = allocator.window;
	PAGE_ALLOCATOR
		.set(allocator)
		.map_err(|_| Error::AlreadyExists)?;
	log::info!(
		"page allocator ready: {} pages of {} bytes at {}",
		pages,
		PAGE_SIZE,
		window
	);
	Ok(())
}

fn global() -> &'static PageAllocator {
	match PAGE_ALLOCATOR.get() {
		Some(allocator) => allocator,
		None => die("page allocator used before init", Error::InvalidArgument),
	}
}

/// Allocate a page from the global allocator.
pub fn alloc_page() -> VirtAddr {
	global().alloc_page()
}

/// Free a page back to the global allocator.
pub fn free_page(addr: VirtAddr) {
	global().free_page(addr)
}
