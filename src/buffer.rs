// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Buffer management for aura-file

use crate::error::{Error, Result};
use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

/// Default buffer alignment (one page; suitable for O_DIRECT)
pub const DEFAULT_ALIGNMENT: usize = 4096;

/// Owned, zero-initialized, aligned heap buffer
///
/// Freed when dropped. The engine never allocates or frees buffers on the
/// caller's behalf; `Buffer` is a convenience for callers that want
/// page-aligned memory.
///
/// # Example
///
/// ```
/// use aura_file::Buffer;
///
/// let mut buf = Buffer::new(4096).unwrap();
/// buf.as_mut_slice()[..5].copy_from_slice(b"hello");
/// assert_eq!(&buf.as_slice()[..5], b"hello");
/// ```
pub struct Buffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

// Safety: Buffer exclusively owns its allocation
unsafe impl Send for Buffer {}

impl Buffer {
    /// Allocate a page-aligned buffer of `size` bytes
    pub fn new(size: usize) -> Result<Self> {
        Self::with_alignment(size, DEFAULT_ALIGNMENT)
    }

    /// Allocate a buffer of `size` bytes aligned to `alignment`
    ///
    /// `alignment` must be a power of two; `size` must be non-zero.
    pub fn with_alignment(size: usize, alignment: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArgument("buffer size must be non-zero"));
        }
        let layout = Layout::from_size_align(size, alignment)
            .map_err(|_| Error::InvalidArgument("invalid buffer alignment"))?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr, layout })
            .ok_or(Error::Io(std::io::Error::from_raw_os_error(libc::ENOMEM)))
    }

    /// Get the buffer as a byte slice
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Get the buffer as a mutable byte slice
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Get the raw pointer to the buffer
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Get the buffer size
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always false; zero-sized buffers cannot be allocated
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Alignment the buffer was allocated with
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Create a BufferRef covering the whole buffer
    pub fn to_ref(&self) -> BufferRef {
        BufferRef::from_raw_parts(self.ptr.as_ptr(), self.layout.size())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("ptr", &self.ptr)
            .field("len", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for Buffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

/// Pointer/length pair naming the memory of one I/O request
///
/// A small `Copy` value with no lifetime: the compiler cannot check that
/// the memory outlives the request. Submitting a `BufferRef` is therefore
/// `unsafe`; the memory must stay valid (and, for reads, unaliased) until
/// the request's completion callback has run.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BufferRef {
    ptr: *mut u8,
    len: usize,
}

impl fmt::Debug for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferRef")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl BufferRef {
    /// Create a buffer reference from a raw pointer and length
    pub fn from_raw_parts(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Create a buffer reference from a byte slice (write source)
    pub fn from_slice(slice: &[u8]) -> Self {
        Self::from_raw_parts(slice.as_ptr() as *mut u8, slice.len())
    }

    /// Create a buffer reference from a mutable byte slice (read target)
    pub fn from_mut_slice(slice: &mut [u8]) -> Self {
        Self::from_raw_parts(slice.as_mut_ptr(), slice.len())
    }

    /// Start of the referenced memory
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Start of the referenced memory, mutably
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the reference covers zero bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the referenced memory as a slice
    ///
    /// # Safety
    ///
    /// The memory must still be valid and not mutably aliased for `'a`.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl From<&Buffer> for BufferRef {
    fn from(buf: &Buffer) -> Self {
        buf.to_ref()
    }
}

impl From<&mut Buffer> for BufferRef {
    fn from(buf: &mut Buffer) -> Self {
        buf.to_ref()
    }
}

impl<'a> From<&'a [u8]> for BufferRef {
    fn from(slice: &'a [u8]) -> Self {
        Self::from_slice(slice)
    }
}

impl<'a> From<&'a mut [u8]> for BufferRef {
    fn from(slice: &'a mut [u8]) -> Self {
        Self::from_mut_slice(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_allocate() {
        let buf = Buffer::new(4096).unwrap();
        assert_eq!(buf.len(), 4096);
        assert!(!buf.is_empty());
        assert_eq!(buf.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_buffer_custom_alignment() {
        let buf = Buffer::with_alignment(100, 512).unwrap();
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.alignment(), 512);
        assert_eq!(buf.as_ptr() as usize % 512, 0);
    }

    #[test]
    fn test_buffer_rejects_bad_arguments() {
        assert!(matches!(Buffer::new(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            Buffer::with_alignment(64, 3),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_buffer_as_mut_slice() {
        let mut buf = Buffer::new(16).unwrap();
        buf.as_mut_slice().copy_from_slice(b"0123456789abcdef");
        assert_eq!(buf.as_ref(), b"0123456789abcdef");
    }

    #[test]
    fn test_bufferref_from_buffer() {
        let buf = Buffer::new(8192).unwrap();
        let r: BufferRef = (&buf).into();
        assert_eq!(r.len(), 8192);
        assert_eq!(r.as_ptr(), buf.as_ptr());
    }

    #[test]
    fn test_bufferref_from_slices() {
        let data = [1u8, 2, 3];
        let r = BufferRef::from(&data[..]);
        assert_eq!(r.len(), 3);
        assert_eq!(unsafe { r.as_slice() }, &[1, 2, 3]);

        let mut out = [0u8; 5];
        let r = BufferRef::from(&mut out[..]);
        assert_eq!(r.len(), 5);
        assert_eq!(r.as_mut_ptr(), out.as_mut_ptr());
    }

    #[test]
    fn test_bufferref_empty() {
        let r = BufferRef::from_raw_parts(std::ptr::null_mut(), 0);
        assert!(r.is_empty());
        assert!(unsafe { r.as_slice() }.is_empty());
    }

    #[test]
    fn test_bufferref_copy_eq() {
        let buf = Buffer::new(64).unwrap();
        let a = buf.to_ref();
        let b = a;
        assert_eq!(a, b);
        assert!(format!("{:?}", a).contains("len: 64"));
    }
}
