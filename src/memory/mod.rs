// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Physical memory providers.
//!
//! A [`MemoryProvider`] owns the actual memory behind descriptors. The
//! manager only ever sees a [`Mapping`]: a local address plus an opaque handle
//! that another process can use to map the same memory.

use crate::{
    error::Result,
    format::{Cache, Usage},
};
use std::ptr::NonNull;

#[cfg(target_os = "linux")]
mod dma;
mod heap;

#[cfg(target_os = "linux")]
pub use dma::{DmaHeapProvider, HeapSource};
pub use heap::HeapProvider;

/// A local mapping of provider memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub data: NonNull<u8>,
    /// Cross-process identity of the memory, never zero
    pub handle: u64,
}

unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

/// Backing store for buffers.
///
/// Implementations must be callable from any thread. Sizes passed to `free`
/// and `unimport` are the sizes used to create the mapping.
pub trait MemoryProvider: Send + Sync {
    /// Allocates and maps `size` bytes.
    fn allocate(&self, size: usize, cache: Cache, usage: Usage) -> Result<Mapping>;

    /// Unmaps and releases memory returned by [`MemoryProvider::allocate`].
    fn free(&self, mapping: Mapping, size: usize) -> Result<()>;

    /// Maps memory that process `owner_pid` exported as `handle`.
    ///
    /// An `owner_pid` of zero means the handle is already valid in this
    /// process.
    fn import(
        &self,
        owner_pid: u32,
        handle: u64,
        size: usize,
        cache: Cache,
        usage: Usage,
    ) -> Result<Mapping>;

    /// Releases a mapping returned by [`MemoryProvider::import`].
    fn unimport(&self, mapping: Mapping, size: usize) -> Result<()>;
}
