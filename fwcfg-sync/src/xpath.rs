//! Absolute device addresses for tree nodes.
//!
//! A node's address is its device root's prefix followed by one segment per
//! ancestor below the root. Named kinds contribute
//! `/<suffix>/entry[@name='<name>']`, singletons `/<suffix>`.

use tracing::debug;
use xml_doc_core::quote_literal;

use crate::descriptor::{Identity, KindSpec, Placement};
use crate::error::{Error, Result};
use crate::objects::{NodeKind, Object, SHARED};
use crate::tree::{ConfigTree, NodeId};

/// Device-level configuration of the local device.
pub const DEVICE_PREFIX: &str = "/config/devices/entry[@name='localhost.localdomain']";
/// Shared scope.
pub const SHARED_PREFIX: &str = "/config/shared";

impl ConfigTree {
    /// Absolute address of `id`.
    pub fn xpath(&self, id: NodeId) -> Result<String> {
        let kind = self.kind(id)?;
        if kind.is_device_root() {
            return Ok(DEVICE_PREFIX.to_string());
        }
        let (container, spec) = self.locate(id)?;
        Ok(format!("{container}{}", self.segment(id, spec)?))
    }

    /// Address of the element `id` is merged into by `set`: the collection
    /// for named kinds, the enclosing element for singletons.
    pub fn xpath_short(&self, id: NodeId) -> Result<String> {
        let kind = self.kind(id)?;
        if kind.is_device_root() {
            return Err(Error::structural(format!(
                "{kind} is a device root and has no enclosing element"
            )));
        }
        let (container, spec) = self.locate(id)?;
        Ok(join(&container, &collection_path(spec)))
    }

    /// Address of the collection holding children of `kind` below `parent`,
    /// for named kinds `.../address`, for singletons the element itself.
    pub fn collection_xpath(&self, parent: NodeId, kind: NodeKind) -> Result<String> {
        let spec = kind.spec();
        let base = if self.kind(parent)?.is_device_root() {
            self.scope_prefix(parent, spec)?
        } else {
            self.require_root(parent)?;
            self.xpath(parent)?
        };
        Ok(join(&base, spec.suffix))
    }

    /// Prefix up to, but excluding, the node's own segment.
    fn locate(&self, id: NodeId) -> Result<(String, &'static KindSpec)> {
        self.require_root(id)?;
        let spec = self.kind(id)?.spec();
        let parent = self
            .parent(id)
            .ok_or_else(|| self.unresolvable(id))?;
        let container = if self.kind(parent)?.is_device_root() {
            self.scope_prefix(parent, spec)?
        } else {
            self.xpath(parent)?
        };
        Ok((container, spec))
    }

    fn require_root(&self, id: NodeId) -> Result<NodeId> {
        self.device_root(id).ok_or_else(|| self.unresolvable(id))
    }

    fn unresolvable(&self, id: NodeId) -> Error {
        match self.kind(id) {
            Ok(kind) => Error::Unresolvable {
                kind,
                name: self.name(id).unwrap_or_default().to_string(),
            },
            Err(err) => err,
        }
    }

    /// Segment contributed by the node itself.
    fn segment(&self, id: NodeId, spec: &KindSpec) -> Result<String> {
        match spec.identity {
            Identity::Named => {
                let name = self.name(id).ok_or_else(|| {
                    Error::structural(format!("{} has no name to address it by", spec.kind))
                })?;
                Ok(format!("/{}/entry[@name={}]", spec.suffix, quote_literal(name)))
            }
            Identity::Singleton => Ok(format!("/{}", spec.suffix)),
        }
    }

    /// Prefix a device root contributes for a direct child of `spec`'s kind.
    fn scope_prefix(&self, root: NodeId, spec: &KindSpec) -> Result<String> {
        match (self.object(root)?, spec.placement) {
            (_, Placement::Device) => Ok(DEVICE_PREFIX.to_string()),
            (Object::Firewall(fw), Placement::Scoped) if fw.vsys == SHARED => {
                Ok(SHARED_PREFIX.to_string())
            }
            (Object::Firewall(fw), Placement::Scoped) => Ok(format!(
                "{DEVICE_PREFIX}/vsys/entry[@name={}]",
                quote_literal(&fw.vsys)
            )),
            (Object::Panorama(_), Placement::Scoped) => {
                debug!(
                    kind = %spec.kind,
                    "object added directly below panorama; addressing it in the shared scope"
                );
                Ok(SHARED_PREFIX.to_string())
            }
            (root_object, placement) => Err(Error::structural(format!(
                "{} cannot be placed directly below {} ({placement:?})",
                spec.kind,
                root_object.kind()
            ))),
        }
    }
}

/// Element path, relative to the parent, of the element a node is merged
/// into: `address` for entries, `deviceconfig` for `deviceconfig/system`.
pub(crate) fn collection_path(spec: &KindSpec) -> String {
    match spec.identity {
        Identity::Named => spec.suffix.to_string(),
        Identity::Singleton => spec
            .suffix
            .rsplit_once('/')
            .map(|(head, _)| head.to_string())
            .unwrap_or_default(),
    }
}

/// Tag of the element a node of `spec` is written as.
pub(crate) fn element_tag(spec: &KindSpec) -> &'static str {
    match spec.identity {
        Identity::Named => "entry",
        Identity::Singleton => spec.suffix.rsplit('/').next().unwrap_or(spec.suffix),
    }
}

fn join(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{relative}")
    }
}
