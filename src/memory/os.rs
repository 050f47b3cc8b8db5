// SPDX-License-Identifier: GPL-2.0

//! OS memory facade
//!
//! Thin wrappers around the kernel's virtual memory calls. This is the only
//! module that talks to the kernel; everything above it deals in
//! [`VirtAddr`] ranges.

use core::ptr;

use bitflags::bitflags;
use errno::errno;

use crate::error::{Error, Result};
use crate::types::VirtAddr;

bitflags! {
	/// Page protection bits
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct Prot: libc::c_int {
		const READ = libc::PROT_READ;
		const WRITE = libc::PROT_WRITE;
	}
}

/// Page size the kernel actually uses.
pub fn page_size() -> usize {
	unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// Reserve a contiguous virtual range with no access and no backing commit.
pub fn reserve_window(len: usize) -> Result<VirtAddr> {
	mmap(len, Prot::empty(), libc::MAP_NORESERVE)
}

/// Reserve a contiguous readable and writable range.
pub fn reserve_rw(len: usize) -> Result<VirtAddr> {
	mmap(len, Prot::READ | Prot::WRITE, 0)
}

fn mmap(len: usize, prot: Prot, extra_flags: libc::c_int) -> Result<VirtAddr> {
	let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | extra_flags;
	let base = unsafe { libc::mmap(ptr::null_mut(), len, prot.bits(), flags, -1, 0) };
	if base == libc::MAP_FAILED {
		log::error!("mmap of {} bytes failed: {}", len, errno());
		return Err(Error::MapFailed);
	}
	Ok(VirtAddr::new(base as usize))
}

/// Flip the protection of exactly `len` bytes at `addr` to read+write or to
/// no access. Revoking access also lets the kernel drop the backing frames,
/// so content does not survive an inaccessible interval.
pub fn set_accessible(addr: VirtAddr, len: usize, accessible: bool) -> Result<()> {
	let prot = if accessible {
		Prot::READ | Prot::WRITE
	} else {
		Prot::empty()
	};
	let ret = unsafe { libc::mprotect(addr.as_mut_ptr(), len, prot.bits()) };
	if ret != 0 {
		log::error!("mprotect({}, {}) failed: {}", addr, len, errno());
		return Err(Error::ProtectFailed);
	}
	#[cfg(target_os = "linux")]
	if !accessible {
		unsafe { libc::madvise(addr.as_mut_ptr(), len, libc::MADV_DONTNEED) };
	}
	Ok(())
}

/// Return a reserved range to the OS.
pub fn release(addr: VirtAddr, len: usize) -> Result<()> {
	let ret = unsafe { libc::munmap(addr.as_mut_ptr(), len) };
	if ret != 0 {
		log::error!("munmap({}, {}) failed: {}", addr, len, errno());
		return Err(Error::UnmapFailed);
	}
	Ok(())
}
