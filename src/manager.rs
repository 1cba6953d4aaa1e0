// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    descriptor::{BufferDescriptor, Origin},
    error::{bad_args, Error, Result},
    format::{Cache, Usage},
    layout::{self, LinearPlanes, PlaneOracle},
    memory::{HeapProvider, Mapping, MemoryProvider},
    props::Properties,
    registry::Registry,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Allocates, frees, imports and unimports buffers for one process.
///
/// The manager combines a [`MemoryProvider`], a [`PlaneOracle`] and a shared
/// [`Registry`]. The process id used for ownership checks is fixed at
/// construction, so several managers with different ids can stand in for
/// several processes.
///
/// # Example
///
/// ```
/// use edgefirst_buffer::{BufferDescriptor, BufferManager, ImageBasicProps, ImageFormat};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mgr = BufferManager::new();
/// let mut desc = BufferDescriptor::new();
/// let props = ImageBasicProps {
///     format: ImageFormat::Nv12,
///     batch_size: 1,
///     width: 1920,
///     height: 1080,
/// };
/// mgr.allocate(&mut desc, &props.into())?;
/// println!("{}", desc);
/// mgr.free(&mut desc)?;
/// # Ok(())
/// # }
/// ```
pub struct BufferManager {
    provider: Arc<dyn MemoryProvider>,
    oracle: Arc<dyn PlaneOracle>,
    registry: Arc<Registry>,
    pid: u32,
}

/// Builder for [`BufferManager`].
pub struct BufferManagerBuilder {
    provider: Option<Arc<dyn MemoryProvider>>,
    oracle: Option<Arc<dyn PlaneOracle>>,
    registry: Option<Arc<Registry>>,
    pid: Option<u32>,
}

impl BufferManagerBuilder {
    pub fn provider(mut self, provider: Arc<dyn MemoryProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn PlaneOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Process id used as the owner of allocations and for ownership checks.
    pub fn process_id(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn build(self) -> BufferManager {
        BufferManager {
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(HeapProvider::new())),
            oracle: self
                .oracle
                .unwrap_or_else(|| Arc::new(LinearPlanes::default())),
            registry: self.registry.unwrap_or_default(),
            pid: self.pid.unwrap_or_else(std::process::id),
        }
    }
}

impl Default for BufferManager {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BufferManager {
    /// Manager backed by the process heap with the default linear oracle.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> BufferManagerBuilder {
        BufferManagerBuilder {
            provider: None,
            oracle: None,
            registry: None,
            pid: None,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn process_id(&self) -> u32 {
        self.pid
    }

    /// Allocates memory for `props` into `desc` with the default usage for
    /// the kind of buffer and write-back caching.
    pub fn allocate(&self, desc: &mut BufferDescriptor, props: &Properties) -> Result<()> {
        self.allocate_with(desc, props, props.default_usage(), Cache::default())
    }

    /// Allocates memory for `props` into `desc`.
    ///
    /// On failure `desc` is left unchanged and any memory obtained along the
    /// way is returned to the provider.
    ///
    /// # Errors
    ///
    /// - [`Error::BadArguments`] if the properties fail validation
    /// - [`Error::AlreadyAllocated`] if `desc` already holds memory
    /// - provider errors such as [`Error::OutOfMemory`]
    pub fn allocate_with(
        &self,
        desc: &mut BufferDescriptor,
        props: &Properties,
        usage: Usage,
        cache: Cache,
    ) -> Result<()> {
        let (view, size) = layout::compute(self.oracle.as_ref(), props)?;
        if desc.is_allocated() {
            error!("buffer {} is already allocated", desc.id());
            return Err(Error::AlreadyAllocated);
        }

        let mapping = self.provider.allocate(size, cache, usage)?;
        let new = BufferDescriptor {
            data: Some(mapping.data),
            handle: mapping.handle,
            total_size: size,
            valid_size: size,
            offset: 0,
            id: self.registry.next_id(),
            pid: self.pid,
            cache,
            usage,
            origin: Origin::Allocated,
            view,
        };
        if let Err(e) = self.registry.register(&new) {
            self.release(mapping, size, Origin::Allocated);
            return Err(e);
        }

        debug!("allocated {}", new);
        *desc = new;
        Ok(())
    }

    /// Releases memory allocated by this process.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBuffer`] if `desc` is unallocated or a sub-view
    /// - [`Error::OutOfBounds`] if `desc` is owned by another process
    /// - provider errors, in which case `desc` stays allocated and registered
    pub fn free(&self, desc: &mut BufferDescriptor) -> Result<()> {
        let mapping = match (desc.origin, desc.data) {
            (Origin::SubView, _) => {
                return Err(Error::InvalidBuffer(
                    "sub-views do not own memory".to_owned(),
                ))
            }
            (Origin::Unallocated, _) | (_, None) => {
                return Err(Error::InvalidBuffer("buffer is not allocated".to_owned()))
            }
            (_, Some(data)) => Mapping {
                data,
                handle: desc.handle,
            },
        };
        if desc.pid != self.pid || desc.origin == Origin::Imported {
            error!(
                "pid {} cannot free buffer {} owned by pid {}",
                self.pid, desc.id, desc.pid
            );
            return Err(Error::OutOfBounds(format!(
                "buffer {} is owned by pid {}",
                desc.id, desc.pid
            )));
        }

        self.registry.deregister(desc.id);
        if let Err(e) = self.provider.free(mapping, desc.total_size) {
            error!("freeing buffer {} failed: {}", desc.id, e);
            self.registry.register(desc)?;
            return Err(e);
        }
        desc.reset();
        Ok(())
    }

    /// Maps a buffer exported by another process into this one.
    ///
    /// The result keeps the layout and owner pid of `source` with a local
    /// mapping and a fresh id.
    ///
    /// # Errors
    ///
    /// - [`Error::BadArguments`] if `source` has no handle or size
    /// - [`Error::OutOfBounds`] if `source` belongs to this process
    /// - [`Error::Fail`] if the provider cannot map the handle
    pub fn import(&self, source: &BufferDescriptor) -> Result<BufferDescriptor> {
        if source.handle == 0 || source.total_size == 0 {
            return Err(bad_args(format!(
                "buffer {} has no handle or size to import",
                source.id
            )));
        }
        if source.pid == self.pid {
            error!("pid {} cannot import its own buffer {}", self.pid, source.id);
            return Err(Error::OutOfBounds(format!(
                "buffer {} already belongs to pid {}",
                source.id, self.pid
            )));
        }

        let mapping = self.provider.import(
            source.pid,
            source.handle,
            source.total_size,
            source.cache,
            source.usage,
        )?;
        let imported = BufferDescriptor {
            data: Some(mapping.data),
            handle: mapping.handle,
            id: self.registry.next_id(),
            origin: Origin::Imported,
            ..source.clone()
        };
        if let Err(e) = self.registry.register(&imported) {
            self.release(mapping, source.total_size, Origin::Imported);
            return Err(e);
        }

        debug!("imported {} as {}", source.id, imported);
        Ok(imported)
    }

    /// Releases a mapping created by [`BufferManager::import`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBuffer`] if `desc` was not imported
    /// - [`Error::OutOfBounds`] if `desc` is owned by this process
    pub fn unimport(&self, desc: &mut BufferDescriptor) -> Result<()> {
        let data = match (desc.origin, desc.data) {
            (Origin::Imported, Some(data)) => data,
            _ => {
                return Err(Error::InvalidBuffer(format!(
                    "buffer {} is not an imported mapping",
                    desc.id
                )))
            }
        };
        if desc.pid == self.pid {
            return Err(Error::OutOfBounds(format!(
                "buffer {} is owned by this process",
                desc.id
            )));
        }

        self.registry.deregister(desc.id);
        self.provider.unimport(
            Mapping {
                data,
                handle: desc.handle,
            },
            desc.total_size,
        )?;
        desc.reset();
        Ok(())
    }

    fn release(&self, mapping: Mapping, size: usize, origin: Origin) {
        let res = match origin {
            Origin::Imported => self.provider.unimport(mapping, size),
            _ => self.provider.free(mapping, size),
        };
        if let Err(e) = res {
            error!("releasing handle {} failed: {}", mapping.handle, e);
        }
    }
}
