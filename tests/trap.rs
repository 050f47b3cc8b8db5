// SPDX-License-Identifier: GPL-2.0

//! Fault-injection tests
//!
//! Each scenario runs its dangerous half in a forked child and asserts on
//! the wait status, so the trap under test cannot take the harness down
//! with it. The allocator performs no heap allocation on its hot paths,
//! which keeps the child safe after a fork from a threaded parent.

use pageguard::PageAllocator;

/// Run `child` in a fork; return the raw wait status.
fn wait_for_child(child: impl FnOnce()) -> libc::c_int {
	unsafe {
		let pid = libc::fork();
		assert!(pid >= 0, "fork failed");
		if pid == 0 {
			child();
			libc::_exit(0);
		}
		let mut status: libc::c_int = 0;
		let ret = libc::waitpid(pid, &mut status, 0);
		assert_eq!(ret, pid);
		status
	}
}

#[test]
fn use_after_free_read_faults() {
	let status = wait_for_child(|| {
		let allocator = PageAllocator::new(4).unwrap();
		let addr = allocator.alloc_page();
		unsafe { std::ptr::write(addr.as_mut_ptr::<u8>(), 0x5a) };
		allocator.free_page(addr);
		// This read must die with SIGSEGV; the exit codes below tell the
		// parent the trap never fired.
		let value = unsafe { std::ptr::read_volatile(addr.as_ptr::<u8>()) };
		if value == 0x5a {
			unsafe { libc::_exit(3) };
		}
		unsafe { libc::_exit(4) };
	});
	assert!(
		libc::WIFSIGNALED(status),
		"child exited instead of trapping: status {:#x}",
		status
	);
	assert_eq!(libc::WTERMSIG(status), libc::SIGSEGV);
}

#[test]
fn use_after_free_write_faults() {
	let status = wait_for_child(|| {
		let allocator = PageAllocator::new(4).unwrap();
		let addr = allocator.alloc_page();
		allocator.free_page(addr);
		unsafe { std::ptr::write_volatile(addr.as_mut_ptr::<u8>(), 1) };
		unsafe { libc::_exit(3) };
	});
	assert!(libc::WIFSIGNALED(status));
	assert_eq!(libc::WTERMSIG(status), libc::SIGSEGV);
}

#[test]
fn unallocated_window_page_faults() {
	let status = wait_for_child(|| {
		let allocator = PageAllocator::new(4).unwrap();
		let addr = allocator.alloc_page();
		// One page past the allocated one: reserved but never made
		// accessible.
		let stray = addr + pageguard::PAGE_SIZE;
		if allocator.contains(stray) {
			unsafe { std::ptr::read_volatile(stray.as_ptr::<u8>()) };
		}
		unsafe { libc::_exit(3) };
	});
	assert!(libc::WIFSIGNALED(status));
	assert_eq!(libc::WTERMSIG(status), libc::SIGSEGV);
}

#[test]
fn exhaustion_aborts() {
	let status = wait_for_child(|| {
		let allocator = PageAllocator::new(4).unwrap();
		for _ in 0..16 {
			let addr = allocator.alloc_page();
			unsafe { std::ptr::write(addr.as_mut_ptr::<u8>(), 1) };
		}
		// The 17th allocation on a 16-page window never returns.
		let _ = allocator.alloc_page();
		unsafe { libc::_exit(3) };
	});
	assert!(
		libc::WIFSIGNALED(status),
		"child exited instead of aborting: status {:#x}",
		status
	);
	assert_eq!(libc::WTERMSIG(status), libc::SIGABRT);
}
