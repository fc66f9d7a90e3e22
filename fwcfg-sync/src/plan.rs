//! What a sync would change, without changing anything.
//!
//! Pending operations are derived on demand: the local element is compared
//! with the device's copy after both went through the same decoder, so
//! elements the model does not know about and default filler never show up
//! as changes.

use serde::Serialize;
use xml_doc_core::{diff, quote_literal, DiffEntry, XmlNode};

use crate::descriptor::Identity;
use crate::error::Result;
use crate::marshal::{decode_subtree, to_element};
use crate::objects::NodeKind;
use crate::protocol::Transport;
use crate::session::Session;
use crate::tree::{ConfigTree, NodeId};
use crate::version::SoftwareVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOperation {
    /// Only the local tree has the node.
    Create,
    /// Both sides have it with different content; `changes` read from the
    /// device's copy to the local one.
    Update { changes: Vec<DiffEntry> },
    /// Only the device has the node.
    Delete,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub xpath: String,
    pub operation: PendingOperation,
}

impl PlannedChange {
    pub fn is_noop(&self) -> bool {
        self.operation == PendingOperation::NoOp
    }
}

/// Compare local `id` with the device's element for it.
fn compare(
    tree: &ConfigTree,
    id: NodeId,
    remote: Option<&XmlNode>,
    version: Option<&SoftwareVersion>,
) -> Result<PendingOperation> {
    let Some(remote) = remote else {
        return Ok(PendingOperation::Create);
    };
    let mut scratch = ConfigTree::new();
    let decoded = decode_subtree(&mut scratch, remote, tree.kind(id)?, version)?;
    if tree.equal_at(id, &scratch, decoded, version) {
        return Ok(PendingOperation::NoOp);
    }
    let before = to_element(&scratch, decoded, true, version)?;
    let after = to_element(tree, id, true, version)?;
    let changes = diff(&before, &after)
        .into_iter()
        .filter(DiffEntry::is_change)
        .collect();
    Ok(PendingOperation::Update { changes })
}

impl<T: Transport> Session<T> {
    /// Pending operation for a single node.
    pub fn plan(&mut self, tree: &mut ConfigTree, id: NodeId) -> Result<PlannedChange> {
        let version = self.version(tree, id);
        let remote = self.fetch(tree, id)?;
        Ok(PlannedChange {
            kind: tree.kind(id)?,
            name: tree.name(id).map(str::to_string),
            xpath: tree.xpath(id)?,
            operation: compare(tree, id, remote.as_ref(), version.as_ref())?,
        })
    }

    /// Pending operations for every `kind` child of `parent`: local children
    /// in local order, then entries only the device has.
    pub fn plan_all(
        &mut self,
        tree: &mut ConfigTree,
        parent: NodeId,
        kind: NodeKind,
    ) -> Result<Vec<PlannedChange>> {
        let version = self.version(tree, parent);
        let mut remote = self.fetch_collection(tree, parent, kind)?;
        let named = kind.spec().identity == Identity::Named;

        let mut planned = Vec::new();
        for id in tree.findall(parent, kind) {
            let name = tree.name(id);
            let position = remote
                .iter()
                .position(|e| !named || e.name() == name);
            let counterpart = position.map(|i| remote.remove(i));
            planned.push(PlannedChange {
                kind,
                name: name.map(str::to_string),
                xpath: tree.xpath(id)?,
                operation: compare(tree, id, counterpart.as_ref(), version.as_ref())?,
            });
        }

        let collection = tree.collection_xpath(parent, kind)?;
        for element in remote {
            let name = element.name().map(str::to_string);
            let xpath = match &name {
                Some(n) if named => format!("{collection}/entry[@name={}]", quote_literal(n)),
                _ => collection.clone(),
            };
            planned.push(PlannedChange {
                kind,
                name,
                xpath,
                operation: PendingOperation::Delete,
            });
        }
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::PendingOperation;
    use crate::emulator::MemoryDevice;
    use crate::objects::{AddressObject, Firewall, NodeKind};
    use crate::session::Session;
    use crate::tree::ConfigTree;
    use crate::value::Value;

    #[test]
    fn plan_reports_create_update_noop_and_delete() {
        let mut tree = ConfigTree::new();
        let fw = tree.create(None, Firewall::new("fw1"));
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        for (name, ip) in [("keep", "10.0.0.1"), ("change", "10.0.0.2"), ("gone", "10.0.0.3")] {
            let id = tree.create_named(name, AddressObject::ip_netmask(ip));
            tree.add(fw, id).expect("add");
        }
        let first = tree.find(fw, "keep", NodeKind::Address).expect("keep");
        session.create_similar(&mut tree, first).expect("seed");

        let change = tree.find(fw, "change", NodeKind::Address).expect("change");
        tree.set(change, "description", Some(Value::from("edited")))
            .expect("set");
        tree.remove_by_name(fw, "gone", NodeKind::Address).expect("remove");
        let fresh = tree.create_named("fresh", AddressObject::fqdn("a.example"));
        tree.add(fw, fresh).expect("add");

        let planned = session
            .plan_all(&mut tree, fw, NodeKind::Address)
            .expect("plan");
        let summary: Vec<(Option<&str>, &str)> = planned
            .iter()
            .map(|p| {
                let op = match &p.operation {
                    PendingOperation::Create => "create",
                    PendingOperation::Update { .. } => "update",
                    PendingOperation::Delete => "delete",
                    PendingOperation::NoOp => "noop",
                };
                (p.name.as_deref(), op)
            })
            .collect();
        assert_eq!(
            summary,
            [
                (Some("keep"), "noop"),
                (Some("change"), "update"),
                (Some("fresh"), "create"),
                (Some("gone"), "delete"),
            ]
        );

        let PendingOperation::Update { changes } = &planned[1].operation else {
            panic!("expected update");
        };
        assert!(changes.iter().any(|c| c.path().ends_with("/description")));
    }

    #[test]
    fn single_plan_is_noop_after_create() {
        let mut tree = ConfigTree::new();
        let fw = tree.create(None, Firewall::new("fw1"));
        let web = tree.create_named("web", AddressObject::ip_netmask("10.0.0.9"));
        tree.add(fw, web).expect("add");
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        assert_eq!(
            session.plan(&mut tree, web).expect("plan").operation,
            PendingOperation::Create
        );
        session.create(&mut tree, web).expect("create");
        assert!(session.plan(&mut tree, web).expect("plan").is_noop());
    }
}
