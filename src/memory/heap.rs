// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use super::{Mapping, MemoryProvider};
use crate::{
    error::{Error, Result},
    format::{Cache, Usage},
};
use parking_lot::Mutex;
use std::{
    alloc::{alloc_zeroed, dealloc, Layout},
    collections::HashMap,
    ptr::NonNull,
};
use tracing::{debug, warn};

const PAGE: usize = 4096;

struct Block {
    data: NonNull<u8>,
    layout: Layout,
    maps: usize,
}

unsafe impl Send for Block {}

struct Blocks {
    next_handle: u64,
    map: HashMap<u64, Block>,
}

/// Memory from the process heap, page aligned and zeroed.
///
/// Handles are tokens valid only inside this provider, so imports resolve to
/// the same memory as the allocation. This lets several managers in one
/// process (or one test) exercise the full allocate/import/free cycle without
/// a DMA heap.
pub struct HeapProvider {
    blocks: Mutex<Blocks>,
}

impl Default for HeapProvider {
    fn default() -> Self {
        HeapProvider {
            blocks: Mutex::new(Blocks {
                next_handle: 1,
                map: HashMap::new(),
            }),
        }
    }
}

impl HeapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, mapping: Mapping, size: usize) -> Result<()> {
        let mut blocks = self.blocks.lock();
        let block = blocks
            .map
            .get_mut(&mapping.handle)
            .ok_or_else(|| Error::Fail(format!("unknown heap handle {}", mapping.handle)))?;
        if block.data != mapping.data || block.layout.size() < size {
            return Err(Error::Fail(format!(
                "mapping does not match heap handle {}",
                mapping.handle
            )));
        }

        block.maps -= 1;
        if block.maps == 0 {
            if let Some(block) = blocks.map.remove(&mapping.handle) {
                unsafe { dealloc(block.data.as_ptr(), block.layout) };
                debug!("heap block {} released", mapping.handle);
            }
        }
        Ok(())
    }
}

impl MemoryProvider for HeapProvider {
    fn allocate(&self, size: usize, _cache: Cache, _usage: Usage) -> Result<Mapping> {
        let layout = Layout::from_size_align(size.max(1), PAGE)
            .map_err(|e| Error::OutOfMemory(format!("{size} bytes: {e}")))?;
        let data = NonNull::new(unsafe { alloc_zeroed(layout) })
            .ok_or_else(|| Error::OutOfMemory(format!("{size} bytes")))?;

        let mut blocks = self.blocks.lock();
        let handle = blocks.next_handle;
        blocks.next_handle += 1;
        blocks.map.insert(
            handle,
            Block {
                data,
                layout,
                maps: 1,
            },
        );
        debug!("heap block {} allocated {} bytes", handle, size);
        Ok(Mapping { data, handle })
    }

    fn free(&self, mapping: Mapping, size: usize) -> Result<()> {
        self.release(mapping, size)
    }

    fn import(
        &self,
        owner_pid: u32,
        handle: u64,
        size: usize,
        _cache: Cache,
        _usage: Usage,
    ) -> Result<Mapping> {
        let mut blocks = self.blocks.lock();
        match blocks.map.get_mut(&handle) {
            Some(block) if block.layout.size() >= size => {
                block.maps += 1;
                debug!("heap block {} imported from pid {}", handle, owner_pid);
                Ok(Mapping {
                    data: block.data,
                    handle,
                })
            }
            Some(block) => Err(Error::Fail(format!(
                "heap handle {handle} holds {} bytes, {size} requested",
                block.layout.size()
            ))),
            None => {
                warn!("import of unknown heap handle {} from pid {}", handle, owner_pid);
                Err(Error::Fail(format!("unknown heap handle {handle}")))
            }
        }
    }

    fn unimport(&self, mapping: Mapping, size: usize) -> Result<()> {
        self.release(mapping, size)
    }
}

impl Drop for HeapProvider {
    fn drop(&mut self) {
        for (handle, block) in self.blocks.get_mut().map.drain() {
            warn!("heap block {} leaked with {} mappings", handle, block.maps);
            unsafe { dealloc(block.data.as_ptr(), block.layout) };
        }
    }
}
