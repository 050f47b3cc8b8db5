// SPDX-License-Identifier: GPL-2.0

//! Error handling types and utilities

use core::fmt;

/// Allocator error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	/// Every page in the window is live
	OutOfMemory,
	/// Invalid argument
	InvalidArgument,
	/// Already initialized
	AlreadyExists,
	/// Reserving a mapping failed
	MapFailed,
	/// Changing page protection failed
	ProtectFailed,
	/// Releasing a mapping failed
	UnmapFailed,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::OutOfMemory => write!(f, "Out of memory"),
			Error::InvalidArgument => write!(f, "Invalid argument"),
			Error::AlreadyExists => write!(f, "Already initialized"),
			Error::MapFailed => write!(f, "Memory mapping failed"),
			Error::ProtectFailed => write!(f, "Page protection change failed"),
			Error::UnmapFailed => write!(f, "Memory unmapping failed"),
		}
	}
}

/// Allocator result type
pub type Result<T> = core::result::Result<T, Error>;

/// Terminate the process. The public allocate/free surface has no error
/// channel; exhaustion and kernel failures end here.
pub(crate) fn die(context: &str, err: Error) -> ! {
	log::error!("{}: {}", context, err);
	std::process::abort();
}
