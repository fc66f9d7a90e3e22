//! Arena-backed configuration tree.
//!
//! Nodes live in slots of a single [`ConfigTree`] and are addressed by
//! [`NodeId`] handles. A node owns its children through an ordered index list
//! and points back at its parent with a plain index, so there are no reference
//! cycles. Nodes are created detached and join the tree through
//! [`ConfigTree::add`] or [`ConfigTree::insert`].
//!
//! Structural checks run before any mutation: a failed `add` leaves both the
//! parent and the child untouched.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::descriptor::Identity;
use crate::error::{Error, Result};
use crate::objects::{NodeKind, Object};
use crate::value::Value;
use crate::version::{is_visible, SoftwareVersion};

/// Handle to a node in a [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: Option<String>,
    object: Object,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Owner of every node of one or more configuration trees.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    slots: Vec<Option<Slot>>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached node.
    pub fn create(&mut self, name: Option<&str>, object: impl Into<Object>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Some(Slot {
            name: name.map(str::to_string),
            object: object.into(),
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    /// Allocate a detached named node.
    pub fn create_named(&mut self, name: &str, object: impl Into<Object>) -> NodeId {
        self.create(Some(name), object)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::structural(format!("node {id} does not exist")))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::structural(format!("node {id} does not exist")))
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.slot(id)?.object.kind())
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.slot(id).ok()?.name.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).ok()?.parent
    }

    /// Direct children in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn object(&self, id: NodeId) -> Result<&Object> {
        Ok(&self.slot(id)?.object)
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut Object> {
        Ok(&mut self.slot_mut(id)?.object)
    }

    /// Value of a declared parameter.
    pub fn get(&self, id: NodeId, param: &str) -> Result<Option<Value>> {
        self.object(id)?.get(param)
    }

    /// Set a declared parameter locally. Nothing is sent to a device.
    pub fn set(&mut self, id: NodeId, param: &str, value: Option<Value>) -> Result<()> {
        self.object_mut(id)?.set(param, value)
    }

    /// `address 'web1'` style label for messages.
    pub fn label(&self, id: NodeId) -> String {
        match (self.kind(id), self.name(id)) {
            (Ok(kind), Some(name)) => format!("{kind} '{name}'"),
            (Ok(kind), None) => kind.to_string(),
            (Err(_), _) => format!("node {id}"),
        }
    }

    /// Ancestors from the parent up to the topmost node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Nearest device root at or above `id`.
    pub fn device_root(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.kind(*n).is_ok_and(NodeKind::is_device_root))
    }

    /// Topmost node above `id`, when it is a device root.
    pub fn top_root(&self, id: NodeId) -> Option<NodeId> {
        let top = self.ancestors(id).last().unwrap_or(id);
        self.kind(top)
            .is_ok_and(NodeKind::is_device_root)
            .then_some(top)
    }

    /// Software version cached on the nearest device root.
    pub fn version(&self, id: NodeId) -> Option<SoftwareVersion> {
        let root = self.device_root(id)?;
        self.object(root).ok()?.cached_version()
    }

    /// Cache `version` on the nearest device root of `id`.
    pub fn set_version(&mut self, id: NodeId, version: SoftwareVersion) -> Result<()> {
        let root = self
            .device_root(id)
            .ok_or_else(|| Error::structural(format!("{} has no device root", self.label(id))))?;
        self.object_mut(root)?.cache_version(version);
        Ok(())
    }

    /// Every node of the subtree rooted at `id`, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(Error::structural(format!(
                "cannot add {} below itself",
                self.label(child)
            )));
        }
        if c.parent.is_some() {
            return Err(Error::structural(format!(
                "{} already has a parent; remove it first",
                self.label(child)
            )));
        }

        let spec = p.object.spec();
        let kind = c.object.kind();
        if !spec.allows(kind) {
            return Err(Error::structural(format!(
                "{kind} is not allowed below {}",
                spec.kind
            )));
        }

        let siblings = p.children.iter().filter(|s| self.kind(**s).ok() == Some(kind));
        match kind.spec().identity {
            Identity::Named => {
                if let Some(name) = c.name.as_deref() {
                    if siblings.clone().any(|s| self.name(*s) == Some(name)) {
                        return Err(Error::structural(format!(
                            "{} already has a {kind} named '{name}'",
                            self.label(parent)
                        )));
                    }
                }
            }
            Identity::Singleton => {
                if siblings.count() > 0 {
                    return Err(Error::structural(format!(
                        "{} already has a {kind}",
                        self.label(parent)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Append `child` to `parent`'s children.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        self.check_attach(parent, child)?;
        self.slot_mut(parent)?.children.push(child);
        self.slot_mut(child)?.parent = Some(parent);
        Ok(child)
    }

    /// Insert `child` at `index`, clamped to the number of children.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<NodeId> {
        self.check_attach(parent, child)?;
        let children = &mut self.slot_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.slot_mut(child)?.parent = Some(parent);
        Ok(child)
    }

    /// Detach `child` from `parent`.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let children = &mut self.slot_mut(parent)?.children;
        let Some(pos) = children.iter().position(|c| *c == child) else {
            return Err(Error::structural(format!(
                "{} is not a child of {}",
                self.label(child),
                self.label(parent)
            )));
        };
        children.remove(pos);
        self.slot_mut(child)?.parent = None;
        Ok(())
    }

    /// Detach `id` from whatever parent it has.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        match self.slot(id)?.parent {
            Some(parent) => self.remove(parent, id),
            None => Ok(()),
        }
    }

    /// Detach the first child of `kind` named `name`.
    pub fn remove_by_name(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<NodeId>> {
        match self.find(parent, name, kind) {
            Some(child) => {
                self.remove(parent, child)?;
                Ok(Some(child))
            }
            None => Ok(None),
        }
    }

    /// Detach every child, or every child of `kind`.
    pub fn removeall(&mut self, parent: NodeId, kind: Option<NodeKind>) -> Result<Vec<NodeId>> {
        let matching: Vec<NodeId> = self
            .slot(parent)?
            .children
            .iter()
            .copied()
            .filter(|c| kind.map_or(true, |k| self.kind(*c).ok() == Some(k)))
            .collect();
        for child in &matching {
            self.remove(parent, *child)?;
        }
        Ok(matching)
    }

    /// First direct child of `kind` named `name`.
    pub fn find(&self, parent: NodeId, name: &str, kind: NodeKind) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.kind(*c).ok() == Some(kind) && self.name(*c) == Some(name))
    }

    /// Direct children of `kind`, in order.
    pub fn findall(&self, parent: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| self.kind(*c).ok() == Some(kind))
            .collect()
    }

    /// Find a child of `kind` with `name` (or the singleton of `kind` when
    /// `name` is `None`), creating and adding a default one if absent.
    pub fn find_or_create(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: Option<&str>,
    ) -> Result<NodeId> {
        let existing = self
            .findall(parent, kind)
            .into_iter()
            .find(|c| name.is_none() || self.name(*c) == name);
        if let Some(found) = existing {
            return Ok(found);
        }
        let child = self.create(name, Object::default_for(kind));
        self.add(parent, child).inspect_err(|_| self.forget(child))
    }

    /// All children of `kind`; when there are none, one default instance
    /// (named `name`) is created and added.
    pub fn findall_or_create(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: Option<&str>,
    ) -> Result<Vec<NodeId>> {
        let existing = self.findall(parent, kind);
        if !existing.is_empty() {
            return Ok(existing);
        }
        let child = self.create(name, Object::default_for(kind));
        self.add(parent, child).inspect_err(|_| self.forget(child))?;
        Ok(vec![child])
    }

    /// Deep equality over names, declared parameters and children, ignoring
    /// node handles. Parameters are compared at the version cached for `a`.
    pub fn equal(&self, a: NodeId, other: &ConfigTree, b: NodeId) -> bool {
        self.equal_at(a, other, b, self.version(a).as_ref())
    }

    /// [`ConfigTree::equal`] at an explicit version.
    ///
    /// Children are compared kind by kind, each kind in order. Managed device
    /// roots below a node are separate devices and are not compared.
    pub fn equal_at(
        &self,
        a: NodeId,
        other: &ConfigTree,
        b: NodeId,
        version: Option<&SoftwareVersion>,
    ) -> bool {
        let (Ok(x), Ok(y)) = (self.slot(a), other.slot(b)) else {
            return false;
        };
        if x.name != y.name || !x.object.same_params(&y.object, version) {
            return false;
        }
        x.object.spec().children.iter().all(|kind| {
            if kind.is_device_root() {
                return true;
            }
            let left = self.findall(a, *kind);
            let right = other.findall(b, *kind);
            left.len() == right.len()
                && left
                    .iter()
                    .zip(&right)
                    .all(|(l, r)| self.equal_at(*l, other, *r, version))
        })
    }

    /// Every declared parameter visible at the node's cached version, plus
    /// `name`.
    pub fn about(&self, id: NodeId) -> Result<BTreeMap<String, Option<Value>>> {
        let slot = self.slot(id)?;
        let version = self.version(id);
        let mut out = BTreeMap::new();
        out.insert(
            "name".to_string(),
            slot.name.clone().map(Value::Text),
        );
        for d in slot.object.spec().params {
            if is_visible(d, version.as_ref()) {
                out.insert(d.name.to_string(), slot.object.params().get(d.name));
            }
        }
        Ok(out)
    }

    /// Rename locally after checking that no sibling already uses `name`.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        let kind = self.kind(id)?;
        if kind.spec().identity == Identity::Singleton {
            return Err(Error::structural(format!("{kind} has no name")));
        }
        if let Some(parent) = self.parent(id) {
            if self.find(parent, name, kind).is_some_and(|other| other != id) {
                return Err(Error::structural(format!(
                    "{} already has a {kind} named '{name}'",
                    self.label(parent)
                )));
            }
        }
        self.slot_mut(id)?.name = Some(name.to_string());
        Ok(())
    }

    /// Move `child` to `index` among its parent's children.
    pub(crate) fn reposition(&mut self, child: NodeId, index: usize) -> Result<()> {
        let parent = self
            .parent(child)
            .ok_or_else(|| Error::structural(format!("{} has no parent", self.label(child))))?;
        let children = &mut self.slot_mut(parent)?.children;
        if let Some(pos) = children.iter().position(|c| *c == child) {
            children.remove(pos);
            let index = index.min(children.len());
            children.insert(index, child);
        }
        Ok(())
    }

    /// Replace the children of `kind` below `parent` with `ordered`, keeping
    /// other kinds where they are. Dropped children become detached.
    pub(crate) fn replace_kind(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        ordered: &[NodeId],
    ) -> Result<()> {
        let current = self.findall(parent, kind);
        for id in ordered {
            let owner = self.parent(*id);
            if owner.is_some() && owner != Some(parent) {
                return Err(Error::structural(format!(
                    "{} belongs to another parent",
                    self.label(*id)
                )));
            }
        }

        let slot = self.slot(parent)?;
        let anchor = slot
            .children
            .iter()
            .position(|c| current.contains(c))
            .unwrap_or(slot.children.len());
        let mut children: Vec<NodeId> = slot
            .children
            .iter()
            .copied()
            .filter(|c| !current.contains(c))
            .collect();
        let anchor = anchor.min(children.len());
        children.splice(anchor..anchor, ordered.iter().copied());

        for id in current.iter().filter(|c| !ordered.contains(c)) {
            self.slot_mut(*id)?.parent = None;
        }
        for id in ordered {
            self.slot_mut(*id)?.parent = Some(parent);
        }
        self.slot_mut(parent)?.children = children;
        Ok(())
    }

    /// Free a detached subtree. Handles into it become invalid.
    pub fn discard(&mut self, id: NodeId) -> Result<()> {
        if self.slot(id)?.parent.is_some() {
            return Err(Error::structural(format!(
                "{} is still attached; remove it before discarding",
                self.label(id)
            )));
        }
        self.forget(id);
        Ok(())
    }

    fn forget(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            if let Some(slot) = self.slots.get_mut(node.0) {
                *slot = None;
            }
        }
    }

    /// Copy the subtree at `src_id` of `src` into this tree, detached.
    pub fn graft(&mut self, src: &ConfigTree, src_id: NodeId) -> Result<NodeId> {
        let slot = src.slot(src_id)?;
        let id = self.create(slot.name.as_deref(), slot.object.clone());
        for child in &slot.children {
            let copy = self.graft(src, *child)?;
            self.slot_mut(copy)?.parent = Some(id);
            self.slot_mut(id)?.children.push(copy);
        }
        Ok(id)
    }
}
