// src/health/registry.rs
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::probe::Probe;
use crate::metrics::SharedSink;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("check with name {0} already exists")]
    Duplicate(String),

    #[error("cannot register check {0}: health check already started")]
    Sealed(String),
}

/// A probe together with the metadata it was registered with.
pub struct RegisteredProbe {
    pub name: String,
    pub notes: String,
    pub probe: Arc<dyn Probe>,
}

impl std::fmt::Debug for RegisteredProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProbe")
            .field("name", &self.name)
            .field("notes", &self.notes)
            .finish_non_exhaustive()
    }
}

pub struct ProbeRegistry {
    probes: DashMap<String, Arc<RegisteredProbe>>,
    sink: Option<SharedSink>,
    sealed: AtomicBool,
}

impl ProbeRegistry {
    pub fn new(sink: Option<SharedSink>) -> Self {
        Self {
            probes: DashMap::new(),
            sink,
            sealed: AtomicBool::new(false),
        }
    }

    /// Add a probe under a unique name. An existing entry is never replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        notes: impl Into<String>,
        probe: impl Probe + 'static,
    ) -> Result<(), RegistryError> {
        self.register_arc(name, notes, Arc::new(probe))
    }

    pub fn register_arc(
        &self,
        name: impl Into<String>,
        notes: impl Into<String>,
        probe: Arc<dyn Probe>,
    ) -> Result<(), RegistryError> {
        let name = name.into();

        if self.is_sealed() {
            return Err(RegistryError::Sealed(name));
        }

        // The shard stays locked until the entry is inserted, so a concurrent
        // registration of the same name cannot slip in between. The seal is
        // checked again under that lock, so a snapshot taken after `seal()`
        // sees every registration that succeeded.
        let name = match self.probes.entry(name) {
            Entry::Occupied(entry) => return Err(RegistryError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                if self.is_sealed() {
                    return Err(RegistryError::Sealed(entry.into_key()));
                }

                let name = entry.key().clone();
                entry.insert(Arc::new(RegisteredProbe {
                    name: name.clone(),
                    notes: notes.into(),
                    probe,
                }));
                name
            }
        };

        // Outside the shard lock: the sink may look back into the registry.
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.register(&name) {
                warn!("Metrics registration for check {} failed: {}", name, e);
            }
        }

        debug!("Registered check {}", name);
        Ok(())
    }

    /// Point-in-time copy of every registered probe, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<RegisteredProbe>> {
        self.probes
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredProbe>> {
        self.probes.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.probes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Close the registry to further registrations.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::SeqCst) {
            debug!("Check registry sealed with {} checks", self.len());
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }
}
