// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Process-wide table of live buffers.
//!
//! The registry maps buffer ids to descriptor copies so that any thread can
//! resolve an id received from elsewhere. It never owns or frees memory.

use crate::{
    descriptor::BufferDescriptor,
    error::{bad_args, Result},
};
use parking_lot::Mutex;
use std::collections::{hash_map::Entry, HashMap};
use tracing::{debug, info};

struct Table {
    next_id: u64,
    buffers: HashMap<u64, BufferDescriptor>,
}

/// Id to descriptor table shared by the managers of one process.
///
/// Every operation takes the single table lock for the duration of one map
/// operation only.
pub struct Registry {
    table: Mutex<Table>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            table: Mutex::new(Table {
                next_id: 1,
                buffers: HashMap::new(),
            }),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh buffer id. Ids increase monotonically and are never
    /// zero.
    pub fn next_id(&self) -> u64 {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        id
    }

    /// Records `desc` under its id. Registering an id twice keeps the first
    /// entry.
    pub fn register(&self, desc: &BufferDescriptor) -> Result<()> {
        if !desc.is_allocated() || desc.id() == 0 {
            return Err(bad_args(format!(
                "cannot register unallocated buffer id {}",
                desc.id()
            )));
        }
        let inserted = {
            let mut table = self.table.lock();
            match table.buffers.entry(desc.id()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(desc.clone());
                    true
                }
            }
        };
        if inserted {
            info!("registered {}", desc);
        } else {
            debug!("buffer {} already registered", desc.id());
        }
        Ok(())
    }

    /// Returns a copy of the descriptor registered under `id`.
    pub fn lookup(&self, id: u64) -> Result<BufferDescriptor> {
        let found = self.table.lock().buffers.get(&id).cloned();
        match found {
            Some(desc) => {
                debug!("lookup {}", desc);
                Ok(desc)
            }
            None => Err(bad_args(format!("no buffer registered with id {id}"))),
        }
    }

    /// Removes `id` from the table. Unknown ids are ignored.
    pub fn deregister(&self, id: u64) {
        let removed = self.table.lock().buffers.remove(&id);
        match removed {
            Some(desc) => info!("deregistered {}", desc),
            None => debug!("deregister of unknown buffer id {}", id),
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all registered buffers, sorted.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<_> = self.table.lock().buffers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{descriptor::Origin, error::ErrorKind};
    use std::{
        ptr::NonNull,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
    };
    use tracing::{Event, Subscriber};
    use tracing_subscriber::{
        layer::{Context, SubscriberExt},
        Layer,
    };

    /// Records whether the table lock is held while an event is emitted.
    struct LockWatch {
        registry: Arc<Registry>,
        held: Arc<AtomicBool>,
    }

    impl<S: Subscriber> Layer<S> for LockWatch {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            if self.registry.table.try_lock().is_none() {
                self.held.store(true, Ordering::SeqCst);
            }
        }
    }

    fn live(id: u64) -> BufferDescriptor {
        BufferDescriptor {
            data: Some(NonNull::dangling()),
            id,
            handle: id,
            total_size: 16,
            valid_size: 16,
            origin: Origin::Allocated,
            ..Default::default()
        }
    }

    #[test]
    fn register_lookup_deregister() {
        let registry = Registry::new();
        let desc = live(registry.next_id());
        registry.register(&desc).unwrap();
        registry.register(&desc).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(desc.id()).unwrap().handle(), desc.handle());

        registry.deregister(desc.id());
        registry.deregister(desc.id());
        assert_eq!(
            registry.lookup(desc.id()).unwrap_err().kind(),
            ErrorKind::BadArguments
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_unallocated() {
        let registry = Registry::new();
        let err = registry.register(&BufferDescriptor::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadArguments);
        assert_eq!(registry.register(&live(0)).unwrap_err().kind(), ErrorKind::BadArguments);
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    (0..100)
                        .map(|_| {
                            let id = registry.next_id();
                            registry.register(&live(id)).unwrap();
                            id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
        assert_eq!(registry.ids(), all);
        assert!(!all.contains(&0));
    }

    #[test]
    fn logs_outside_the_lock() {
        let registry = Arc::new(Registry::new());
        let held = Arc::new(AtomicBool::new(false));
        let watch = LockWatch {
            registry: registry.clone(),
            held: held.clone(),
        };
        let subscriber = tracing_subscriber::registry().with(watch);
        tracing::subscriber::with_default(subscriber, || {
            let desc = live(registry.next_id());
            registry.register(&desc).unwrap();
            registry.register(&desc).unwrap();
            registry.lookup(desc.id()).unwrap();
            registry.deregister(desc.id());
            registry.deregister(desc.id());
        });
        assert!(!held.load(Ordering::SeqCst));
    }
}
