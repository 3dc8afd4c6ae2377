//! Server side of the device access channel.
//!
//! Objects live under a namespace index and hold named, typed variables.
//! The simulation loop writes, the HTTP layer reads.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use shopfloor_core::channel::{Variant, SERVER_NAMESPACE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("unknown namespace index {0}")]
    UnknownNamespace(u16),
    #[error("object {ns}:{object} not found")]
    UnknownObject { ns: u16, object: String },
    #[error("variable {variable} is not declared on {object}")]
    UnknownVariable { object: String, variable: String },
    #[error("address space lock poisoned")]
    Poisoned,
}

impl ChannelError {
    /// True for lookups of things that don't exist, as opposed to a broken
    /// address space.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Poisoned)
    }
}

/// Shared, cloneable handle to the address space.
#[derive(Debug, Clone)]
pub struct AddressSpace {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    namespaces: Vec<String>,
    objects: BTreeMap<(u16, String), BTreeMap<String, Variant>>,
}

impl Inner {
    fn object_mut(
        &mut self,
        ns: u16,
        object: &str,
    ) -> Result<&mut BTreeMap<String, Variant>, ChannelError> {
        self.objects
            .get_mut(&(ns, object.to_string()))
            .ok_or_else(|| ChannelError::UnknownObject {
                ns,
                object: object.to_string(),
            })
    }

    fn object(&self, ns: u16, object: &str) -> Result<&BTreeMap<String, Variant>, ChannelError> {
        self.objects
            .get(&(ns, object.to_string()))
            .ok_or_else(|| ChannelError::UnknownObject {
                ns,
                object: object.to_string(),
            })
    }
}

impl AddressSpace {
    /// Empty address space with the server namespace at index 0.
    pub fn new() -> Self {
        let inner = Inner {
            namespaces: vec![SERVER_NAMESPACE.to_string()],
            objects: BTreeMap::new(),
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Register a namespace URI and return its index. Registering the same
    /// URI twice returns the existing index.
    pub fn register_namespace(&self, uri: &str) -> Result<u16, ChannelError> {
        let mut inner = self.inner.write().map_err(|_| ChannelError::Poisoned)?;
        let idx = match inner.namespaces.iter().position(|ns| ns == uri) {
            Some(idx) => idx,
            None => {
                inner.namespaces.push(uri.to_string());
                inner.namespaces.len() - 1
            }
        };
        // u16 holds far more namespaces than one simulator registers.
        Ok(idx as u16)
    }

    pub fn namespaces(&self) -> Result<Vec<String>, ChannelError> {
        let inner = self.inner.read().map_err(|_| ChannelError::Poisoned)?;
        Ok(inner.namespaces.clone())
    }

    /// Add an (empty) object. Adding an existing object is a no-op.
    pub fn add_object(&self, ns: u16, name: &str) -> Result<(), ChannelError> {
        let mut inner = self.inner.write().map_err(|_| ChannelError::Poisoned)?;
        if usize::from(ns) >= inner.namespaces.len() {
            return Err(ChannelError::UnknownNamespace(ns));
        }
        inner.objects.entry((ns, name.to_string())).or_default();
        Ok(())
    }

    /// Declare a variable with its initial value.
    pub fn add_variable(
        &self,
        ns: u16,
        object: &str,
        name: &str,
        initial: Variant,
    ) -> Result<(), ChannelError> {
        let mut inner = self.inner.write().map_err(|_| ChannelError::Poisoned)?;
        inner
            .object_mut(ns, object)?
            .insert(name.to_string(), initial);
        Ok(())
    }

    /// Overwrite a declared variable.
    pub fn write(
        &self,
        ns: u16,
        object: &str,
        variable: &str,
        value: Variant,
    ) -> Result<(), ChannelError> {
        let mut inner = self.inner.write().map_err(|_| ChannelError::Poisoned)?;
        let slot = inner
            .object_mut(ns, object)?
            .get_mut(variable)
            .ok_or_else(|| ChannelError::UnknownVariable {
                object: object.to_string(),
                variable: variable.to_string(),
            })?;
        *slot = value;
        Ok(())
    }

    /// Overwrite several declared variables under one lock. Readers see all
    /// of the new values or none; nothing is written if any name is
    /// undeclared.
    pub fn write_all<'a>(
        &self,
        ns: u16,
        object: &str,
        values: impl IntoIterator<Item = (&'a str, Variant)>,
    ) -> Result<(), ChannelError> {
        let mut inner = self.inner.write().map_err(|_| ChannelError::Poisoned)?;
        let slots = inner.object_mut(ns, object)?;
        let values: Vec<_> = values.into_iter().collect();
        if let Some((missing, _)) = values.iter().find(|(name, _)| !slots.contains_key(*name)) {
            return Err(ChannelError::UnknownVariable {
                object: object.to_string(),
                variable: missing.to_string(),
            });
        }
        for (name, value) in values {
            slots.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Every variable of an object, copied under one lock.
    pub fn object_values(
        &self,
        ns: u16,
        object: &str,
    ) -> Result<BTreeMap<String, Variant>, ChannelError> {
        let inner = self.inner.read().map_err(|_| ChannelError::Poisoned)?;
        Ok(inner.object(ns, object)?.clone())
    }

    pub fn read(&self, ns: u16, object: &str, variable: &str) -> Result<Variant, ChannelError> {
        let inner = self.inner.read().map_err(|_| ChannelError::Poisoned)?;
        inner
            .object(ns, object)?
            .get(variable)
            .cloned()
            .ok_or_else(|| ChannelError::UnknownVariable {
                object: object.to_string(),
                variable: variable.to_string(),
            })
    }

    /// Names of the variables declared on an object.
    pub fn browse(&self, ns: u16, object: &str) -> Result<Vec<String>, ChannelError> {
        let inner = self.inner.read().map_err(|_| ChannelError::Poisoned)?;
        Ok(inner.object(ns, object)?.keys().cloned().collect())
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}
