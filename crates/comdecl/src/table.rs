//! Interface dispatch tables.
//!
//! An [`InterfaceDecl`] collects what an interface declares; [`InterfaceDecl::compile`]
//! merges it over the parent's effective table into an immutable
//! [`InterfaceDescriptor`]:
//!
//! 1. the parent's entries, in the parent's order;
//! 2. own methods, replacing inherited entries of the same name in place;
//! 3. data-style table entries, replacing anything of the same name.
//!
//! Slot indices are taken as declared. Two names sharing a slot are not
//! detected.

use std::collections::HashMap;

use tracing::warn;

use crate::error::DeclError;
use crate::guid::GUID;
use crate::layout::TypeRegistry;
use crate::signature::{ParamDecl, Signature};

/// One entry of a dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSlot {
    pub name: String,
    pub slot: usize,
    pub signature: Signature,
}

/// What to do when a data-style entry reuses an existing method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Log a warning and let the later entry win.
    #[default]
    Warn,
    /// Reject the declaration with [`DeclError::DuplicateMethod`].
    Reject,
}

#[derive(Debug, Clone)]
struct MethodDecl {
    name: String,
    slot: usize,
    params: Vec<ParamDecl>,
}

/// An interface declaration awaiting compilation.
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    name: &'static str,
    iid: GUID,
    clsid: Option<GUID>,
    parents: Vec<&'static InterfaceDescriptor>,
    methods: Vec<MethodDecl>,
    table: Vec<MethodDecl>,
    collisions: CollisionPolicy,
}

impl InterfaceDecl {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            iid: GUID::ZERO,
            clsid: None,
            parents: Vec::new(),
            methods: Vec::new(),
            table: Vec::new(),
            collisions: CollisionPolicy::default(),
        }
    }

    #[must_use]
    pub fn iid(mut self, iid: GUID) -> Self {
        self.iid = iid;
        self
    }

    #[must_use]
    pub fn clsid(mut self, clsid: GUID) -> Self {
        self.clsid = Some(clsid);
        self
    }

    /// Inherit from `parent`. COM interfaces have at most one parent; a
    /// second call makes [`compile`](Self::compile) fail.
    #[must_use]
    pub fn extends(mut self, parent: &'static InterfaceDescriptor) -> Self {
        self.parents.push(parent);
        self
    }

    /// An own method at vtable `slot`.
    #[must_use]
    pub fn method<I>(mut self, name: &str, slot: usize, params: I) -> Self
    where
        I: IntoIterator<Item = ParamDecl>,
    {
        self.methods.push(MethodDecl {
            name: name.to_owned(),
            slot,
            params: params.into_iter().collect(),
        });
        self
    }

    /// A method given directly as data, for methods with no typed declaration.
    #[must_use]
    pub fn table_entry<I>(mut self, name: &str, slot: usize, params: I) -> Self
    where
        I: IntoIterator<Item = ParamDecl>,
    {
        self.table.push(MethodDecl {
            name: name.to_owned(),
            slot,
            params: params.into_iter().collect(),
        });
        self
    }

    #[must_use]
    pub fn collisions(mut self, policy: CollisionPolicy) -> Self {
        self.collisions = policy;
        self
    }

    /// Build the effective dispatch table.
    pub fn compile(self, registry: &TypeRegistry) -> Result<InterfaceDescriptor, DeclError> {
        if self.parents.len() > 1 {
            return Err(DeclError::MultipleInheritance {
                interface: self.name.to_owned(),
                count: self.parents.len(),
            });
        }
        let parent = self.parents.first().copied();

        let mut descriptor = InterfaceDescriptor {
            name: self.name,
            iid: self.iid,
            clsid: self.clsid,
            parent,
            entries: parent.map(|p| p.entries.clone()).unwrap_or_default(),
            index: parent.map(|p| p.index.clone()).unwrap_or_default(),
        };

        for method in &self.methods {
            let entry = self.resolve(method, registry)?;
            descriptor.insert(entry);
        }

        for method in &self.table {
            let entry = self.resolve(method, registry)?;
            if descriptor.index.contains_key(&entry.name) {
                match self.collisions {
                    CollisionPolicy::Warn => {
                        warn!("Overriding existing method {}.{}", self.name, entry.name);
                    }
                    CollisionPolicy::Reject => {
                        return Err(DeclError::DuplicateMethod {
                            interface: self.name.to_owned(),
                            method: entry.name,
                        });
                    }
                }
            }
            descriptor.insert(entry);
        }

        Ok(descriptor)
    }

    fn resolve(&self, method: &MethodDecl, registry: &TypeRegistry) -> Result<MethodSlot, DeclError> {
        let signature =
            Signature::extract(&method.params, registry).map_err(|source| DeclError::Signature {
                interface: self.name.to_owned(),
                method: method.name.clone(),
                source,
            })?;
        Ok(MethodSlot {
            name: method.name.clone(),
            slot: method.slot,
            signature,
        })
    }
}

/// The compiled, immutable dispatch table of one interface.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    name: &'static str,
    iid: GUID,
    clsid: Option<GUID>,
    parent: Option<&'static InterfaceDescriptor>,
    entries: Vec<MethodSlot>,
    index: HashMap<String, usize>,
}

impl InterfaceDescriptor {
    /// Replace the entry of the same name in place, or append.
    fn insert(&mut self, entry: MethodSlot) {
        match self.index.get(&entry.name) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn iid(&self) -> GUID {
        self.iid
    }

    #[must_use]
    pub fn clsid(&self) -> Option<GUID> {
        self.clsid
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'static InterfaceDescriptor> {
        self.parent
    }

    /// The effective entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodSlot> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Entries in declaration order, inherited ones first.
    pub fn iter(&self) -> impl Iterator<Item = &MethodSlot> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One past the highest declared slot.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.entries.iter().map(|e| e.slot + 1).max().unwrap_or(0)
    }

    /// Whether this interface is `iid` or derives from it.
    #[must_use]
    pub fn is_a(&self, iid: &GUID) -> bool {
        let mut current = Some(self);
        while let Some(descriptor) = current {
            if descriptor.iid == *iid {
                return true;
            }
            current = descriptor.parent;
        }
        false
    }
}
