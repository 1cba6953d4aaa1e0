// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use super::{Mapping, MemoryProvider};
use crate::{
    error::{Error, Result},
    format::{Cache, Usage},
};
use dma_heap::{Heap, HeapKind};
use libc::{c_void, mmap, munmap, MAP_FAILED, MAP_SHARED, PROT_READ, PROT_WRITE};
use std::{
    io,
    os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd},
    ptr::{null_mut, NonNull},
};
use tracing::{debug, error, warn};

/// Which DMA heap to allocate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapSource {
    /// Physically contiguous memory (`/dev/dma_heap/linux,cma`)
    Cma,
    /// Page-backed system memory (`/dev/dma_heap/system`)
    System,
}

impl HeapSource {
    fn open(self) -> Result<Heap> {
        let kind = match self {
            HeapSource::Cma => HeapKind::Cma,
            HeapSource::System => HeapKind::System,
        };
        Heap::new(kind).map_err(|e| {
            error!("cannot open {:?} dma heap: {}", self, e);
            Error::Unsupported(format!("{self:?} dma heap unavailable: {e}"))
        })
    }
}

/// DMA-BUF memory from a Linux DMA heap.
///
/// Handles are DMA-BUF file descriptor numbers in the allocating process.
/// Another process imports them by duplicating the descriptor through
/// `pidfd_getfd(2)`, which requires ptrace access to the owner.
#[derive(Debug)]
pub struct DmaHeapProvider {
    source: HeapSource,
}

impl DmaHeapProvider {
    /// Creates a provider, checking that the heap can be opened.
    pub fn new(source: HeapSource) -> Result<Self> {
        source.open()?;
        Ok(DmaHeapProvider { source })
    }

    pub fn source(&self) -> HeapSource {
        self.source
    }
}

fn map_fd(fd: OwnedFd, size: usize) -> Result<Mapping> {
    let ptr = unsafe {
        mmap(
            null_mut(),
            size,
            PROT_READ | PROT_WRITE,
            MAP_SHARED,
            fd.as_raw_fd(),
            0,
        )
    };
    if ptr == MAP_FAILED {
        let err = io::Error::last_os_error();
        error!("mmap of fd {} failed: {}", fd.as_raw_fd(), err);
        return Err(Error::Fail(format!("mmap of {size} bytes failed: {err}")));
    }
    let data = NonNull::new(ptr.cast::<u8>())
        .ok_or_else(|| Error::Fail("mmap returned a null mapping".to_owned()))?;
    let handle = fd.into_raw_fd() as u64;
    Ok(Mapping { data, handle })
}

fn unmap(mapping: Mapping, size: usize) -> Result<()> {
    let fd = RawFd::try_from(mapping.handle)
        .map_err(|_| Error::Fail(format!("handle {} is not a file descriptor", mapping.handle)))?;
    if unsafe { munmap(mapping.data.as_ptr().cast::<c_void>(), size) } != 0 {
        warn!("unmap failed!");
    }
    // Dropping the owned descriptor closes it.
    drop(unsafe { OwnedFd::from_raw_fd(fd) });
    Ok(())
}

fn pidfd_open(pid: u32) -> io::Result<OwnedFd> {
    let fd = unsafe { libc::syscall(libc::SYS_pidfd_open, pid as libc::pid_t, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd as RawFd) })
}

fn pidfd_getfd(pidfd: &OwnedFd, target: RawFd) -> io::Result<OwnedFd> {
    let fd = unsafe { libc::syscall(libc::SYS_pidfd_getfd, pidfd.as_raw_fd(), target, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd as RawFd) })
}

fn duplicate_local(fd: RawFd) -> io::Result<OwnedFd> {
    let dup = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if dup < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(dup) })
}

impl MemoryProvider for DmaHeapProvider {
    fn allocate(&self, size: usize, cache: Cache, usage: Usage) -> Result<Mapping> {
        let heap = self.source.open()?;
        let fd = heap.allocate(size).map_err(|e| {
            error!("dma heap allocation of {} bytes failed: {}", size, e);
            Error::OutOfMemory(format!("{size} bytes from {:?} heap: {e}", self.source))
        })?;
        let mapping = map_fd(fd, size)?;
        debug!(
            "dma buffer fd:{} {} bytes {:?} {:?}",
            mapping.handle, size, cache, usage
        );
        Ok(mapping)
    }

    fn free(&self, mapping: Mapping, size: usize) -> Result<()> {
        debug!("dma buffer fd:{} freed", mapping.handle);
        unmap(mapping, size)
    }

    fn import(
        &self,
        owner_pid: u32,
        handle: u64,
        size: usize,
        _cache: Cache,
        _usage: Usage,
    ) -> Result<Mapping> {
        let target = RawFd::try_from(handle)
            .map_err(|_| Error::Fail(format!("handle {handle} is not a file descriptor")))?;

        let fd = if owner_pid == 0 {
            duplicate_local(target)
        } else {
            pidfd_open(owner_pid).and_then(|pidfd| pidfd_getfd(&pidfd, target))
        }
        .map_err(|e| {
            error!("cannot import fd {} from pid {}: {}", handle, owner_pid, e);
            Error::Fail(format!("import of fd {handle} from pid {owner_pid}: {e}"))
        })?;

        let mapping = map_fd(fd, size)?;
        debug!(
            "dma buffer fd:{} of pid {} imported as fd:{}",
            handle, owner_pid, mapping.handle
        );
        Ok(mapping)
    }

    fn unimport(&self, mapping: Mapping, size: usize) -> Result<()> {
        debug!("dma buffer fd:{} unimported", mapping.handle);
        unmap(mapping, size)
    }
}
