// SPDX-License-Identifier: GPL-2.0

//! Lock-free slot ring
//!
//! A fixed-capacity multi-producer multi-consumer FIFO of page indices.
//! Producers (freeing threads) and consumers (allocating threads)
//! synchronize through a single packed 64-bit head/free-count word; the slot
//! array itself is touched by at most one logical owner at a time, so no
//! per-slot lock is needed.
//!
//! Slot encoding: a free slot holds a page index in its low bits with
//! [`ALLOCATED_FLAG`] clear. While a slot is mid-handshake, either poisoned
//! by the consumer that emptied it or claimed by a producer that has not
//! published its index yet, the flag is set. Only a producer's publish
//! store clears it.

use core::mem::size_of;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::Result;
use crate::memory::os;
use crate::types::VirtAddr;

/// High bit of a slot: set while the slot does not hold a valid free index.
pub const ALLOCATED_FLAG: u32 = 1 << 31;

/// One producer increment of the free-count half of the packed word.
const COUNT_UNIT: u64 = 1 << 32;

/// Pack the ring head (bits 0..32) and the free count (bits 32..64).
fn pack(head: u32, free_count: u32) -> u64 {
	((free_count as u64) << 32) | head as u64
}

fn unpack(word: u64) -> (u32, u32) {
	(word as u32, (word >> 32) as u32)
}

/// Fixed-capacity ring of free page indices.
pub struct SlotRing {
	/// Base of the slot array, one `AtomicU32` per page.
	slots: VirtAddr,
	/// Number of slots; always a power of two.
	capacity: u32,
	mask: u32,
	/// Packed head/free-count word; the linearization point of every
	/// allocate and free.
	head_count: AtomicU64,
}

unsafe impl Send for SlotRing {}
unsafe impl Sync for SlotRing {}

impl SlotRing {
	/// Create a ring of `capacity` slots (a power of two), with every page
	/// index `0..capacity` free exactly once.
	pub fn new(capacity: u32) -> Result<Self> {
		debug_assert!(capacity.is_power_of_two());

		let bytes = capacity as usize * size_of::<AtomicU32>();
		let slots = os::reserve_rw(bytes)?;

		let ring = Self {
			slots,
			capacity,
			mask: capacity - 1,
			head_count: AtomicU64::new(pack(0, capacity)),
		};
		// Single-threaded here, nothing to synchronize with yet.
		for i in 0..capacity {
			ring.slot(i).store(i, Ordering::Relaxed);
		}
		Ok(ring)
	}

	fn slot(&self, index: u32) -> &AtomicU32 {
		debug_assert!(index < self.capacity);
		unsafe { &*self.slots.as_ptr::<AtomicU32>().add(index as usize) }
	}

	/// Number of page indices currently in the ring.
	pub fn free_count(&self) -> u32 {
		unpack(self.head_count.load(Ordering::Relaxed)).1
	}

	pub fn capacity(&self) -> u32 {
		self.capacity
	}

	/// Take the oldest free page index, or `None` if every page is live.
	pub fn pop(&self) -> Option<u32> {
		let mut cur = self.head_count.load(Ordering::Relaxed);
		let head = loop {
			let (head, free_count) = unpack(cur);
			if free_count == 0 {
				return None;
			}
			let next = pack((head + 1) & self.mask, free_count - 1);
			match self.head_count.compare_exchange_weak(
				cur,
				next,
				Ordering::AcqRel,
				Ordering::Relaxed,
			) {
				Ok(_) => break head,
				Err(observed) => cur = observed,
			}
		};

		// The CAS transferred ownership of this slot to us. A producer that
		// has grown the count but not yet stored its index leaves the flag
		// set; wait out its publish store.
		let slot = self.slot(head);
		let mut value = slot.load(Ordering::Acquire);
		while value & ALLOCATED_FLAG != 0 {
			core::hint::spin_loop();
			value = slot.load(Ordering::Acquire);
		}

		// Poison the slot: the consumer that claims it next must wait for
		// the producer that refills it, not read this index again.
		slot.store(value | ALLOCATED_FLAG, Ordering::Release);
		Some(value)
	}

	/// Return a page index to the ring.
	pub fn push(&self, page: u32) {
		debug_assert_eq!(page & ALLOCATED_FLAG, 0);
		let tail = self.grow();
		self.publish(tail, page);
	}

	/// Claim the tail slot by growing the free count; returns the slot
	/// index. The fetch-add advertises the slot to consumers and reserves it
	/// against other producers in one step; the slot stays flagged until
	/// [`Self::publish`] stores into it.
	fn grow(&self) -> u32 {
		let prev = self.head_count.fetch_add(COUNT_UNIT, Ordering::AcqRel);
		let (head, free_count) = unpack(prev);
		debug_assert!(free_count < self.capacity);
		head.wrapping_add(free_count) & self.mask
	}

	/// Store `page` into a slot claimed by [`Self::grow`], clearing the
	/// flag.
	fn publish(&self, tail: u32, page: u32) {
		self.slot(tail).store(page, Ordering::Release);
	}
}

impl Drop for SlotRing {
	fn drop(&mut self) {
		let bytes = self.capacity as usize * size_of::<AtomicU32>();
		let _ = os::release(self.slots, bytes);
	}
}
