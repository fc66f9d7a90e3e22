//! Synchronization between a [`ConfigTree`] and a device.
//!
//! A [`Session`] sends one request per operation through a [`Transport`], or
//! through an [`HaPair`] when the device is one member of an HA cluster. The
//! local tree is only touched after the device accepted the change, so a
//! rejected request leaves it exactly as it was.
//!
//! Nodes below a firewall that is itself managed by a Panorama are reached by
//! proxy: their requests carry the firewall's serial as `target`.
//!
//! Bulk `*_similar` operations send every sibling of the same kind in one
//! request and are all-or-nothing.

use std::str::FromStr;

use tracing::{debug, warn};
use xml_doc_core::xpath::{Predicate, Step};
use xml_doc_core::{XPath, XmlNode};

use crate::descriptor::Identity;
use crate::error::{Error, Result};
use crate::ha::HaPair;
use crate::marshal::{apply_element, decode_subtree, to_element};
use crate::objects::NodeKind;
use crate::protocol::{Action, Request, Response, Transport};
use crate::settings::SyncSettings;
use crate::tree::{ConfigTree, NodeId};
use crate::version::SoftwareVersion;

/// Where requests go.
#[derive(Debug)]
pub enum Targets<T> {
    Single(T),
    Ha(HaPair<T>),
}

/// New position for [`Session::move_to`], relative to siblings of the same
/// kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
    Before(String),
    After(String),
}

impl Position {
    fn where_arg(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Before(_) => "before",
            Self::After(_) => "after",
        }
    }

    fn reference(&self) -> Option<&str> {
        match self {
            Self::Before(name) | Self::After(name) => Some(name),
            Self::Top | Self::Bottom => None,
        }
    }
}

/// `<show><system><info/></system></show>`
fn system_info_cmd() -> XmlNode {
    XmlNode::new("show").child(XmlNode::new("system").child(XmlNode::new("info")))
}

#[derive(Debug)]
pub struct Session<T> {
    targets: Targets<T>,
    settings: SyncSettings,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            targets: Targets::Single(transport),
            settings: SyncSettings::default(),
        }
    }

    /// Session over both members of an HA pair.
    pub fn ha(primary: T, peer: T) -> Self {
        Self {
            targets: Targets::Ha(HaPair::new(primary, peer)),
            settings: SyncSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn targets(&self) -> &Targets<T> {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut Targets<T> {
        &mut self.targets
    }

    /// The transport of a single-device session.
    pub fn transport(&self) -> Option<&T> {
        match &self.targets {
            Targets::Single(transport) => Some(transport),
            Targets::Ha(_) => None,
        }
    }

    pub fn ha_pair(&self) -> Option<&HaPair<T>> {
        match &self.targets {
            Targets::Ha(pair) => Some(pair),
            Targets::Single(_) => None,
        }
    }

    /// Send `request` and turn anything but a success answer into an error.
    pub fn execute(&mut self, request: &Request) -> Result<Response> {
        debug!(
            action = %request.action,
            xpath = request.xpath.as_deref().unwrap_or(""),
            target = request.target().unwrap_or(""),
            "executing request"
        );
        let outcome = match &mut self.targets {
            Targets::Single(transport) => transport.execute(request),
            Targets::Ha(pair) => pair.execute(request, &self.settings),
        };
        let response = outcome.map_err(|err| {
            Error::device(request.action, None, format!("request could not be delivered: {err}"))
        })?;
        if response.is_success() {
            return Ok(response);
        }
        let message = response
            .message
            .clone()
            .unwrap_or_else(|| "no message from device".to_string());
        Err(Error::device(request.action, response.code.as_deref(), message))
    }

    /// Add the managed firewall's serial when `id` is reached through Panorama.
    fn route(&self, tree: &ConfigTree, id: NodeId, request: Request) -> Result<Request> {
        let Some(root) = tree.device_root(id) else {
            return Ok(request);
        };
        if tree.parent(root).is_none() {
            return Ok(request);
        }
        let serial = tree
            .object(root)?
            .as_firewall()
            .and_then(|fw| fw.serial.as_deref())
            .ok_or_else(|| {
                Error::structural(format!(
                    "{} is managed through Panorama but has no serial",
                    tree.label(root)
                ))
            })?;
        Ok(request.with_extra("target", serial))
    }

    fn execute_for(&mut self, tree: &ConfigTree, id: NodeId, request: Request) -> Result<Response> {
        let request = self.route(tree, id, request)?;
        self.execute(&request)
    }

    /// Software version of the device owning `id`.
    ///
    /// Probed once and cached on the device root. A failed probe is logged and
    /// yields `None`, which callers treat as the latest version.
    pub fn version(&mut self, tree: &mut ConfigTree, id: NodeId) -> Option<SoftwareVersion> {
        if let Some(version) = tree.version(id) {
            return Some(version);
        }
        let root = tree.device_root(id)?;
        let probed = self
            .execute_for(tree, root, Request::op(system_info_cmd()))
            .and_then(|response| {
                let raw = response
                    .document
                    .as_ref()
                    .and_then(|r| r.get_text(&["system", "sw-version"]))
                    .ok_or_else(|| Error::Document("system info without sw-version".to_string()))?;
                SoftwareVersion::from_str(raw)
                    .map_err(|err| Error::Document(format!("bad sw-version: {err}")))
            });
        match probed {
            Ok(version) => {
                debug!(device = %tree.label(root), %version, "software version discovered");
                tree.set_version(root, version).ok()?;
                Some(version)
            }
            Err(err) => {
                warn!(
                    device = %tree.label(root),
                    error = %err,
                    "could not determine software version; assuming latest"
                );
                None
            }
        }
    }

    /// Remote element of `id`, or `None` when the device does not have it.
    pub fn fetch(&mut self, tree: &ConfigTree, id: NodeId) -> Result<Option<XmlNode>> {
        let request = Request::at(Action::Get, tree.xpath(id)?);
        match self.execute_for(tree, id, request) {
            Ok(response) => Ok(response.first_result().cloned()),
            Err(err) if err.is_not_present() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Remote elements of every `kind` child of `parent`, in device order.
    pub fn fetch_collection(
        &mut self,
        tree: &ConfigTree,
        parent: NodeId,
        kind: NodeKind,
    ) -> Result<Vec<XmlNode>> {
        let xpath = tree.collection_xpath(parent, kind)?;
        let container = match self.execute_for(tree, parent, Request::at(Action::Get, xpath)) {
            Ok(response) => response.first_result().cloned(),
            Err(err) if err.is_not_present() => None,
            Err(err) => return Err(err),
        };
        Ok(match (container, kind.spec().identity) {
            (None, _) => Vec::new(),
            (Some(c), Identity::Named) => c.get_children("entry").into_iter().cloned().collect(),
            (Some(c), Identity::Singleton) => vec![c],
        })
    }

    /// Merge `id` and its descendants into the device configuration.
    pub fn create(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<()> {
        let version = self.version(tree, id);
        let element = to_element(tree, id, true, version.as_ref())?;
        let request = Request::at(Action::Set, tree.xpath_short(id)?).with_element(element);
        self.execute_for(tree, id, request)?;
        Ok(())
    }

    /// Replace the device's copy of `id` and its descendants.
    ///
    /// Returns `false` without sending a change when the device already holds
    /// an equal copy.
    pub fn apply(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<bool> {
        let version = self.version(tree, id);
        let element = to_element(tree, id, true, version.as_ref())?;

        if let Some(remote) = self.fetch(tree, id)? {
            let mut scratch = ConfigTree::new();
            let decoded = decode_subtree(&mut scratch, &remote, tree.kind(id)?, version.as_ref())?;
            if tree.equal_at(id, &scratch, decoded, version.as_ref()) {
                debug!(node = %tree.label(id), "device already up to date");
                return Ok(false);
            }
        }

        let request = Request::at(Action::Edit, tree.xpath(id)?).with_element(element);
        self.execute_for(tree, id, request)?;
        Ok(true)
    }

    /// Delete `id` on the device, then detach it locally.
    pub fn delete(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<()> {
        let request = Request::at(Action::Delete, tree.xpath(id)?);
        self.delete_request(tree, id, request)?;
        tree.detach(id)
    }

    fn delete_request(&mut self, tree: &ConfigTree, id: NodeId, request: Request) -> Result<()> {
        match self.execute_for(tree, id, request) {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_present() && self.settings.idempotent_delete => {
                debug!(node = %tree.label(id), "already absent on device");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Overwrite the parameters of `id` with the device's values. Children are
    /// left alone. A node the device does not have is reset to defaults.
    pub fn refresh(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<()> {
        let version = self.version(tree, id);
        let remote = self.fetch(tree, id)?;
        let object = tree.object_mut(id)?;
        match remote {
            Some(element) => apply_element(object, &element, version.as_ref()),
            None => {
                object.reset();
                Ok(())
            }
        }
    }

    /// Read every `kind` child of `parent` from the device.
    ///
    /// Local children with a matching name are refreshed in place. With `add`,
    /// entries only the device has become new children, children the device
    /// lacks are detached, and the order of `kind` children follows the
    /// device. Without `add`, unmatched entries on either side are ignored.
    ///
    /// Returns the refreshed (and, with `add`, created) children in device
    /// order.
    pub fn refreshall(
        &mut self,
        tree: &mut ConfigTree,
        parent: NodeId,
        kind: NodeKind,
        add: bool,
    ) -> Result<Vec<NodeId>> {
        if kind.is_device_root() {
            return Err(Error::structural(format!(
                "{kind} is a device root and cannot be read as a child"
            )));
        }
        let version = self.version(tree, parent);
        let elements = self.fetch_collection(tree, parent, kind)?;

        let spec = kind.spec();
        let mut ordered = Vec::with_capacity(elements.len());
        for element in &elements {
            let local = match spec.identity {
                Identity::Named => element.name().and_then(|n| tree.find(parent, n, kind)),
                Identity::Singleton => tree.findall(parent, kind).into_iter().next(),
            };
            match local {
                Some(id) => {
                    apply_element(tree.object_mut(id)?, element, version.as_ref())?;
                    ordered.push(id);
                }
                None if add => {
                    ordered.push(decode_subtree(tree, element, kind, version.as_ref())?);
                }
                None => {}
            }
        }

        if add {
            tree.replace_kind(parent, kind, &ordered)?;
        }
        debug!(parent = %tree.label(parent), %kind, count = ordered.len(), "refreshed children");
        Ok(ordered)
    }

    /// Move `id` among its siblings on the device, then locally.
    pub fn move_to(&mut self, tree: &mut ConfigTree, id: NodeId, position: Position) -> Result<()> {
        let kind = tree.kind(id)?;
        if !kind.spec().is_named() {
            return Err(Error::structural(format!("{kind} has no siblings to move among")));
        }
        if position.reference() == tree.name(id) {
            return Err(Error::structural(format!(
                "cannot move {} relative to itself",
                tree.label(id)
            )));
        }

        let mut request = Request::at(Action::Move, tree.xpath(id)?)
            .with_extra("where", position.where_arg());
        if let Some(dst) = position.reference() {
            request = request.with_extra("dst", dst);
        }
        self.execute_for(tree, id, request)?;

        let Some(parent) = tree.parent(id) else {
            return Ok(());
        };
        let siblings: Vec<NodeId> = tree
            .children(parent)
            .iter()
            .copied()
            .filter(|c| *c != id)
            .collect();
        let same_kind = |c: &NodeId| tree.kind(*c).ok() == Some(kind);
        let index = match &position {
            Position::Top => siblings.iter().position(same_kind),
            Position::Bottom => siblings.iter().rposition(same_kind).map(|i| i + 1),
            Position::Before(name) => siblings
                .iter()
                .position(|c| same_kind(c) && tree.name(*c) == Some(name.as_str())),
            Position::After(name) => siblings
                .iter()
                .position(|c| same_kind(c) && tree.name(*c) == Some(name.as_str()))
                .map(|i| i + 1),
        };
        match index {
            Some(index) => tree.reposition(id, index),
            None => {
                warn!(
                    node = %tree.label(id),
                    "moved on device but the local tree has no matching sibling"
                );
                Ok(())
            }
        }
    }

    /// Rename `id` on the device, then locally.
    pub fn rename(&mut self, tree: &mut ConfigTree, id: NodeId, new_name: &str) -> Result<()> {
        let kind = tree.kind(id)?;
        if !kind.spec().is_named() {
            return Err(Error::structural(format!("{kind} has no name")));
        }
        if let Some(parent) = tree.parent(id) {
            if tree.find(parent, new_name, kind).is_some_and(|other| other != id) {
                return Err(Error::structural(format!(
                    "{} already has a {kind} named '{new_name}'",
                    tree.label(parent)
                )));
            }
        }
        let request = Request::at(Action::Rename, tree.xpath(id)?).with_extra("newname", new_name);
        self.execute_for(tree, id, request)?;
        tree.set_name(id, new_name)
    }

    /// Siblings of `id` sharing its kind, with the address of their
    /// collection element.
    fn similar(&self, tree: &ConfigTree, id: NodeId) -> Result<(Vec<NodeId>, XPath)> {
        let kind = tree.kind(id)?;
        if !kind.spec().is_named() {
            return Err(Error::structural(format!(
                "{kind} is a singleton and has no similar siblings"
            )));
        }
        let parent = tree.parent(id).ok_or_else(|| Error::Unresolvable {
            kind,
            name: tree.name(id).unwrap_or_default().to_string(),
        })?;
        let collection = XPath::parse(&tree.xpath_short(id)?)?;
        Ok((tree.findall(parent, kind), collection))
    }

    fn collection_element(
        &mut self,
        tree: &mut ConfigTree,
        id: NodeId,
        members: &[NodeId],
        collection: &XPath,
    ) -> Result<XmlNode> {
        let version = self.version(tree, id);
        let tag = collection
            .last()
            .map(|step| step.tag.clone())
            .ok_or_else(|| Error::structural("empty collection address"))?;
        let mut element = XmlNode::new(tag);
        for member in members {
            element
                .children
                .push(to_element(tree, *member, true, version.as_ref())?);
        }
        Ok(element)
    }

    /// Merge every sibling of `id`'s kind in one request.
    pub fn create_similar(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<()> {
        let (members, collection) = self.similar(tree, id)?;
        let element = self.collection_element(tree, id, &members, &collection)?;
        let parent = collection
            .parent()
            .ok_or_else(|| Error::structural("collection has no enclosing element"))?;
        let request = Request::at(Action::Set, parent.to_string()).with_element(element);
        self.execute_for(tree, id, request)?;
        Ok(())
    }

    /// Replace the whole collection `id` belongs to with the local siblings.
    /// Entries only the device has are removed.
    pub fn apply_similar(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<()> {
        let (members, collection) = self.similar(tree, id)?;
        let element = self.collection_element(tree, id, &members, &collection)?;
        let request = Request::at(Action::Edit, collection.to_string()).with_element(element);
        self.execute_for(tree, id, request)?;
        Ok(())
    }

    /// Delete every sibling of `id`'s kind in one request, then detach them.
    pub fn delete_similar(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<()> {
        let (members, collection) = self.similar(tree, id)?;
        let names: Vec<String> = members
            .iter()
            .filter_map(|m| tree.name(*m).map(str::to_string))
            .collect();
        let target = collection.join(Step {
            tag: "entry".to_string(),
            predicate: Some(Predicate {
                attribute: "name".to_string(),
                values: names,
            }),
        });
        self.delete_request(tree, id, Request::at(Action::Delete, target.to_string()))?;
        for member in members {
            tree.detach(member)?;
        }
        Ok(())
    }

    /// Run an operational command on the connected device and return the
    /// `<result>` element.
    pub fn op(&mut self, cmd: XmlNode) -> Result<Option<XmlNode>> {
        Ok(self.execute(&Request::op(cmd))?.document)
    }

    /// [`Session::op`] on the device owning `id`, by proxy when needed.
    pub fn op_for(&mut self, tree: &ConfigTree, id: NodeId, cmd: XmlNode) -> Result<Option<XmlNode>> {
        Ok(self.execute_for(tree, id, Request::op(cmd))?.document)
    }

    /// Exchange credentials for an API key.
    pub fn keygen(&mut self, user: &str, password: &str) -> Result<String> {
        let request = Request::new(Action::Keygen)
            .with_extra("user", user)
            .with_extra("password", password);
        let response = self.execute(&request)?;
        response
            .document
            .as_ref()
            .and_then(|r| r.get_text(&["key"]))
            .map(str::to_string)
            .ok_or_else(|| Error::device(Action::Keygen, None, "response carried no key"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Position, Session};
    use crate::emulator::MemoryDevice;
    use crate::error::Error;
    use crate::objects::{AddressObject, Firewall, NodeKind, Panorama, Tag};
    use crate::protocol::Action;
    use crate::tree::{ConfigTree, NodeId};
    use crate::version::SoftwareVersion;

    fn firewall_tree() -> (ConfigTree, NodeId) {
        let mut tree = ConfigTree::new();
        let fw = tree.create(None, Firewall::new("fw1"));
        (tree, fw)
    }

    #[test]
    fn version_is_probed_once_and_cached() {
        let (mut tree, fw) = firewall_tree();
        let mut session = Session::new(MemoryDevice::firewall("9.1.4"));
        assert_eq!(session.version(&mut tree, fw), Some(SoftwareVersion::new(9, 1, 4)));
        assert_eq!(session.version(&mut tree, fw), Some(SoftwareVersion::new(9, 1, 4)));
        let device = session.transport().expect("single");
        assert_eq!(device.requests().len(), 1);
    }

    #[test]
    fn unreachable_version_probe_falls_back_to_latest() {
        let (mut tree, fw) = firewall_tree();
        let mut device = MemoryDevice::firewall("9.1.4");
        device.set_reachable(false);
        let mut session = Session::new(device);
        assert_eq!(session.version(&mut tree, fw), None);
        assert_eq!(tree.version(fw), None);
    }

    #[test]
    fn create_merges_into_collection() {
        let (mut tree, fw) = firewall_tree();
        let web = tree.create_named("web1", AddressObject::ip_netmask("10.0.0.1"));
        tree.add(fw, web).expect("add");
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        session.create(&mut tree, web).expect("create");

        let device = session.transport().expect("single");
        let set = device.last_request(Action::Set).expect("set sent");
        assert_eq!(
            set.xpath.as_deref(),
            Some("/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/address")
        );
        assert!(device.contains(&tree.xpath(web).expect("xpath")));
    }

    #[test]
    fn transport_failure_becomes_device_error() {
        let (mut tree, fw) = firewall_tree();
        tree.set_version(fw, SoftwareVersion::new(10, 1, 0)).expect("version");
        let tag = tree.create_named("prod", Tag::default());
        tree.add(fw, tag).expect("add");
        let mut device = MemoryDevice::firewall("10.1.0");
        device.set_reachable(false);
        let mut session = Session::new(device);
        let err = session.create(&mut tree, tag).expect_err("unreachable");
        assert!(matches!(err, Error::Device { action: Action::Set, code: None, .. }));
        assert!(err.to_string().contains("could not be delivered"));
    }

    #[test]
    fn rename_collision_leaves_local_name() {
        let (mut tree, fw) = firewall_tree();
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        for name in ["a", "b"] {
            let id = tree.create_named(name, Tag::default());
            tree.add(fw, id).expect("add");
            session.create(&mut tree, id).expect("create");
        }
        let a = tree.find(fw, "a", NodeKind::Tag).expect("a");
        let err = session.rename(&mut tree, a, "b").expect_err("local sibling");
        assert!(matches!(err, Error::Structural(_)));

        // Remote-only collision.
        let remote_only = tree.create_named("c", Tag::default());
        tree.add(fw, remote_only).expect("add");
        session.create(&mut tree, remote_only).expect("create");
        tree.remove(fw, remote_only).expect("remove");
        let err = session.rename(&mut tree, a, "c").expect_err("remote collision");
        assert_eq!(err.code(), Some("12"));
        assert_eq!(tree.name(a), Some("a"));
    }

    #[test]
    fn move_reorders_remote_and_local() {
        let (mut tree, fw) = firewall_tree();
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        let ids: Vec<NodeId> = ["a", "b", "c"]
            .iter()
            .map(|n| {
                let id = tree.create_named(n, Tag::default());
                tree.add(fw, id).expect("add")
            })
            .collect();
        session.create_similar(&mut tree, ids[0]).expect("bulk create");

        session
            .move_to(&mut tree, ids[2], Position::Before("a".to_string()))
            .expect("move");
        let local: Vec<&str> = tree
            .findall(fw, NodeKind::Tag)
            .into_iter()
            .filter_map(|id| tree.name(id))
            .collect();
        assert_eq!(local, ["c", "a", "b"]);

        let remote = session.refreshall(&mut tree, fw, NodeKind::Tag, true).expect("refresh");
        let names: Vec<&str> = remote.iter().filter_map(|id| tree.name(*id)).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn move_relative_to_missing_sibling_is_rejected_by_device() {
        let (mut tree, fw) = firewall_tree();
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        let a = tree.create_named("a", Tag::default());
        tree.add(fw, a).expect("add");
        session.create(&mut tree, a).expect("create");
        let err = session
            .move_to(&mut tree, a, Position::After("ghost".to_string()))
            .expect_err("bad dst");
        assert_eq!(err.code(), Some("14"));
    }

    #[test]
    fn managed_firewall_requests_are_proxied() {
        let mut tree = ConfigTree::new();
        let pano = tree.create(None, Panorama::new("pano"));
        let fw = tree.create(None, Firewall::managed("0070001"));
        tree.add(pano, fw).expect("add fw");
        let web = tree.create_named("web1", AddressObject::ip_netmask("10.0.0.1"));
        tree.add(fw, web).expect("add address");

        let mut panorama = MemoryDevice::panorama("10.2.0");
        panorama.manage("0070001", MemoryDevice::firewall("10.1.0"));
        let mut session = Session::new(panorama);
        session.create(&mut tree, web).expect("create");

        let device = session.transport().expect("single");
        let set = device.last_request(Action::Set).expect("set");
        assert_eq!(set.target(), Some("0070001"));
        let managed = device.managed("0070001").expect("managed");
        assert!(managed.contains(&tree.xpath(web).expect("xpath")));
        assert_eq!(tree.version(web), Some(SoftwareVersion::new(10, 1, 0)));
    }

    #[test]
    fn managed_firewall_without_serial_is_structural() {
        let mut tree = ConfigTree::new();
        let pano = tree.create(None, Panorama::new("pano"));
        let fw = tree.create(None, Firewall::new("fw"));
        tree.add(pano, fw).expect("add fw");
        tree.set_version(fw, SoftwareVersion::new(10, 1, 0)).expect("version");
        let tag = tree.create_named("t", Tag::default());
        tree.add(fw, tag).expect("add");
        let mut session = Session::new(MemoryDevice::panorama("10.2.0"));
        let err = session.create(&mut tree, tag).expect_err("no serial");
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn keygen_checks_credentials() {
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        assert!(!session.keygen("admin", "admin").expect("key").is_empty());
        let err = session.keygen("admin", "wrong").expect_err("denied");
        assert_eq!(err.code(), Some("403"));
    }
}
