//! Named, initialize-once instance registry.
//!
//! Holds expensive one-time constructions (store handles, clients) keyed by
//! name. A producer runs at most once per name for the lifetime of the
//! registry. The registry is an ordinary value: construct it at the
//! composition root and pass it to whoever needs it.
//!
//! A producer must not request its own name from the same registry; the
//! per-name cell is held while it runs.

use once_cell::sync::OnceCell;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{RecallResult, RegistryError};

type Instance = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<Instance>>;

/// Registry of lazily constructed, shared instances.
#[derive(Default)]
pub struct InstanceRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl InstanceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance registered under `name`, producing it on first use.
    pub fn get_or_init<T, F>(&self, name: &str, producer: F) -> RecallResult<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let slot = self.slot(name);
        let instance = slot.get_or_init(|| {
            tracing::debug!(name, instance_type = type_name::<T>(), "Initializing instance");
            Arc::new(producer()) as Instance
        });
        downcast(name, Arc::clone(instance))
    }

    /// Like [`get_or_init`](Self::get_or_init) for fallible producers.
    ///
    /// A failed producer leaves `name` uninitialised so a later call can
    /// retry.
    pub fn get_or_try_init<T, E, F>(&self, name: &str, producer: F) -> RecallResult<Arc<T>>
    where
        T: Any + Send + Sync,
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.slot(name);
        let instance = slot
            .get_or_try_init(|| {
                tracing::debug!(name, instance_type = type_name::<T>(), "Initializing instance");
                producer().map(|value| Arc::new(value) as Instance)
            })
            .map_err(|e| RegistryError::InitFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        downcast(name, Arc::clone(instance))
    }

    /// Return the instance under `name` if it has been initialised.
    pub fn get<T>(&self, name: &str) -> RecallResult<Option<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(name).cloned()
        };
        match slot.as_ref().and_then(|s| s.get()) {
            Some(instance) => downcast(name, Arc::clone(instance)).map(Some),
            None => Ok(None),
        }
    }

    /// Whether an instance has been initialised under `name`.
    pub fn contains(&self, name: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(name).is_some_and(|s| s.get().is_some())
    }

    /// Number of initialised instances.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|s| s.get().is_some()).count()
    }

    /// Whether no instance has been initialised yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(name.to_string()).or_default())
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("initialized", &self.len())
            .finish()
    }
}

fn downcast<T: Any + Send + Sync>(name: &str, instance: Instance) -> RecallResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| {
        RegistryError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>().to_string(),
        }
        .into()
    })
}
