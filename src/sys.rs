// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Thin libc wrappers used by the engine and the portable backends

use std::io;
use std::os::unix::io::{IntoRawFd, OwnedFd, RawFd};

fn cvt(ret: libc::ssize_t) -> io::Result<usize> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// Current byte position of `fd` (`lseek(fd, 0, SEEK_CUR)`)
pub fn current_position(fd: RawFd) -> io::Result<i64> {
    let pos = unsafe { libc::lseek(fd, 0, libc::SEEK_CUR) };
    if pos < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(pos as i64)
    }
}

fn to_off_t(offset: i64) -> io::Result<libc::off_t> {
    libc::off_t::try_from(offset).map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))
}

/// Positioned read into `len` bytes at `ptr`
///
/// # Safety
///
/// `ptr` must be valid for writes of `len` bytes.
pub unsafe fn pread(fd: RawFd, ptr: *mut u8, len: usize, offset: i64) -> io::Result<usize> {
    let off = to_off_t(offset)?;
    cvt(unsafe { libc::pread(fd, ptr as *mut libc::c_void, len, off) })
}

/// Positioned write of `len` bytes at `ptr`
///
/// # Safety
///
/// `ptr` must be valid for reads of `len` bytes.
pub unsafe fn pwrite(fd: RawFd, ptr: *const u8, len: usize, offset: i64) -> io::Result<usize> {
    let off = to_off_t(offset)?;
    cvt(unsafe { libc::pwrite(fd, ptr as *const libc::c_void, len, off) })
}

/// Close a descriptor, reporting the close status
///
/// Dropping an `OwnedFd` discards close errors; the shutdown step hands
/// the status to its callback instead.
pub fn close(fd: OwnedFd) -> io::Result<()> {
    let raw = fd.into_raw_fd();
    if unsafe { libc::close(raw) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
