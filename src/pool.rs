// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Fixed set of pre-allocated buffers handed out and returned at runtime.

use crate::{
    descriptor::BufferDescriptor,
    error::{bad_args, Error, Result},
    manager::BufferManager,
    props::Properties,
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tracing::{debug, error, info, warn};

struct Slots {
    free: VecDeque<BufferDescriptor>,
    in_use: HashMap<u64, BufferDescriptor>,
}

/// Pool of identically laid out buffers allocated up front.
///
/// [`BufferPool::get`] hands out a copy of a free descriptor and
/// [`BufferPool::put`] returns it. All buffers are freed through the manager
/// when the pool is dropped, including ones still handed out.
///
/// # Example
///
/// ```
/// use edgefirst_buffer::{BufferManager, BufferPool, RawProps};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mgr = Arc::new(BufferManager::new());
/// let pool = BufferPool::new(mgr, "frames", &RawProps { size: 4096 }.into(), 2)?;
/// let buf = pool.get()?;
/// assert_eq!(pool.available(), 1);
/// pool.put(&buf)?;
/// # Ok(())
/// # }
/// ```
pub struct BufferPool {
    name: String,
    manager: Arc<BufferManager>,
    capacity: usize,
    slots: Mutex<Slots>,
}

impl BufferPool {
    /// Allocates `capacity` buffers for `props` from `manager`.
    ///
    /// # Errors
    ///
    /// - [`Error::BadArguments`] if `capacity` is zero or `props` is invalid
    /// - any allocation error, after the buffers allocated so far are freed
    pub fn new(
        manager: Arc<BufferManager>,
        name: impl Into<String>,
        props: &Properties,
        capacity: usize,
    ) -> Result<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(bad_args(format!("pool {name} needs at least one buffer")));
        }

        let mut free = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            let mut desc = BufferDescriptor::new();
            if let Err(e) = manager.allocate(&mut desc, props) {
                error!("pool {} allocation {} failed: {}", name, free.len(), e);
                for mut desc in free {
                    if let Err(e) = manager.free(&mut desc) {
                        warn!("pool {} cleanup failed: {}", name, e);
                    }
                }
                return Err(e);
            }
            free.push_back(desc);
        }

        info!("pool {} ready with {} buffers", name, capacity);
        Ok(BufferPool {
            name,
            manager,
            capacity,
            slots: Mutex::new(Slots {
                free,
                in_use: HashMap::with_capacity(capacity),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers currently free.
    pub fn available(&self) -> usize {
        self.slots.lock().free.len()
    }

    /// Takes a free buffer out of the pool.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if every buffer is handed out.
    pub fn get(&self) -> Result<BufferDescriptor> {
        let desc = {
            let mut slots = self.slots.lock();
            let desc = slots.free.pop_front();
            if let Some(desc) = &desc {
                slots.in_use.insert(desc.id(), desc.clone());
            }
            desc
        };
        match desc {
            Some(desc) => {
                debug!("pool {} handed out buffer {}", self.name, desc.id());
                Ok(desc)
            }
            None => {
                error!("pool {} has no free buffers", self.name);
                Err(Error::OutOfMemory(format!(
                    "pool {} exhausted at {} buffers",
                    self.name, self.capacity
                )))
            }
        }
    }

    /// Returns a buffer obtained from [`BufferPool::get`].
    ///
    /// # Errors
    ///
    /// [`Error::BadArguments`] if `desc` is not a buffer of this pool that is
    /// currently handed out.
    pub fn put(&self, desc: &BufferDescriptor) -> Result<()> {
        let returned = {
            let mut slots = self.slots.lock();
            match slots.in_use.remove(&desc.id()) {
                Some(owned) => {
                    slots.free.push_back(owned);
                    true
                }
                None => false,
            }
        };
        if !returned {
            return Err(bad_args(format!(
                "buffer {} is not handed out by pool {}",
                desc.id(),
                self.name
            )));
        }
        debug!("pool {} got back buffer {}", self.name, desc.id());
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let slots = self.slots.get_mut();
        if !slots.in_use.is_empty() {
            warn!(
                "pool {} dropped with {} buffers in use",
                self.name,
                slots.in_use.len()
            );
        }
        let all = slots.free.drain(..).chain(slots.in_use.drain().map(|(_, d)| d));
        for mut desc in all {
            if let Err(e) = self.manager.free(&mut desc) {
                error!("pool {} failed to free buffer {}: {}", self.name, desc.id(), e);
            }
        }
    }
}
