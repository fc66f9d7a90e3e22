//! Conversion between typed objects and XML elements.
//!
//! Encoding walks a kind's descriptor table in order and writes each visible,
//! set parameter at its path below the node's element. Decoding reads the same
//! paths back. Missing elements decode to the declared default, unknown
//! elements are ignored, and parameters outside the active version range are
//! skipped in both directions.

use std::collections::BTreeMap;

use xml_doc_core::XmlNode;

use crate::descriptor::{placeholder, Encoding, Identity, ParamDescriptor};
use crate::error::{Error, Result};
use crate::objects::{NodeKind, Object};
use crate::tree::{ConfigTree, NodeId};
use crate::value::{self, Value};
use crate::version::{is_visible, SoftwareVersion};
use crate::xpath::{collection_path, element_tag};

/// Element for `id`, optionally with its descendants nested at their
/// relative paths. Managed device roots below `id` are skipped.
pub fn to_element(
    tree: &ConfigTree,
    id: NodeId,
    include_children: bool,
    version: Option<&SoftwareVersion>,
) -> Result<XmlNode> {
    let object = tree.object(id)?;
    let spec = object.spec();
    if spec.kind.is_device_root() {
        return Err(Error::structural(format!(
            "{} is a device root and has no element of its own",
            spec.kind
        )));
    }

    let mut element = match spec.identity {
        Identity::Named => {
            let name = tree.name(id).ok_or_else(|| {
                Error::structural(format!("{} has no name to write", spec.kind))
            })?;
            XmlNode::entry(name)
        }
        Identity::Singleton => XmlNode::new(element_tag(spec)),
    };
    let params = object.params();
    encode_table(&mut element, spec.params, version, &|name| params.get(name))?;

    if include_children {
        for child in tree.children(id) {
            let child_spec = tree.kind(*child)?.spec();
            if child_spec.kind.is_device_root() {
                continue;
            }
            let child_element = to_element(tree, *child, true, version)?;
            let path = collection_path(child_spec);
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            element
                .ensure_path_mut(&segments)
                .children
                .push(child_element);
        }
    }
    Ok(element)
}

/// Overwrite every visible parameter of `object` from `element`.
pub fn apply_element(
    object: &mut Object,
    element: &XmlNode,
    version: Option<&SoftwareVersion>,
) -> Result<()> {
    let decoded = decode_table(element, object.spec().params, version)?;
    let params = object.params_mut();
    for (name, value) in decoded {
        params.set(name, value)?;
    }
    Ok(())
}

/// Build a detached subtree of `kind` from `element`, including every child
/// collection the kind allows. Children keep document order within a kind.
pub fn decode_subtree(
    tree: &mut ConfigTree,
    element: &XmlNode,
    kind: NodeKind,
    version: Option<&SoftwareVersion>,
) -> Result<NodeId> {
    let spec = kind.spec();
    let mut object = Object::default_for(kind);
    apply_element(&mut object, element, version)?;
    let name = match spec.identity {
        Identity::Named => element.name(),
        Identity::Singleton => None,
    };
    let id = tree.create(name, object);

    for child_kind in spec.children {
        if child_kind.is_device_root() {
            continue;
        }
        for child_element in child_elements(element, *child_kind) {
            let child = decode_subtree(tree, child_element, *child_kind, version)?;
            tree.add(id, child)?;
        }
    }
    Ok(id)
}

/// Elements of `kind` directly below a parent's element.
pub fn child_elements(parent: &XmlNode, kind: NodeKind) -> Vec<&XmlNode> {
    let spec = kind.spec();
    let segments: Vec<&str> = spec.suffix.split('/').collect();
    match spec.identity {
        Identity::Named => parent
            .descend(&segments)
            .map(|container| container.get_children("entry"))
            .unwrap_or_default(),
        Identity::Singleton => parent.descend(&segments).into_iter().collect(),
    }
}

fn encode_table(
    element: &mut XmlNode,
    table: &'static [ParamDescriptor],
    version: Option<&SoftwareVersion>,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<()> {
    for d in table {
        if !is_visible(d, version) {
            continue;
        }
        let Some(value) = lookup(d.name) else {
            continue;
        };
        let Some(segments) = resolve(d, lookup) else {
            continue;
        };
        encode(element, &segments, d, value, version)?;
    }
    Ok(())
}

fn encode(
    element: &mut XmlNode,
    segments: &[String],
    d: &ParamDescriptor,
    value: Value,
    version: Option<&SoftwareVersion>,
) -> Result<()> {
    let path: Vec<&str> = segments.iter().map(String::as_str).collect();
    match d.encoding {
        Encoding::Text | Encoding::Int => {
            element.ensure_path_mut(&path).text = Some(scalar(d, &value)?);
        }
        Encoding::Choice(choices) => {
            let word = scalar(d, &value)?;
            if !choices.contains(&word.as_str()) {
                return Err(invalid(d, format!("'{word}'")));
            }
            element.ensure_path_mut(&path).text = Some(word);
        }
        Encoding::YesNo => {
            let flag = value::boolean(d.name, Some(value))?.unwrap_or_default();
            element.ensure_path_mut(&path).text = Some(if flag { "yes" } else { "no" }.to_string());
        }
        Encoding::Exist => {
            if value::boolean(d.name, Some(value))? == Some(true) {
                element.ensure_path_mut(&path);
            }
        }
        Encoding::Members => {
            let members = value::list(d.name, Some(value))?.unwrap_or_default();
            let node = element.ensure_path_mut(&path);
            node.children
                .extend(members.into_iter().map(|m| XmlNode::with_text("member", m)));
        }
        Encoding::Selector(choices) => {
            let word = scalar(d, &value)?;
            if !choices.contains(&word.as_str()) {
                return Err(invalid(d, format!("'{word}'")));
            }
            element.ensure_path_mut(&path).ensure_path_mut(&[word.as_str()]);
        }
        Encoding::Nested(inner) => {
            let fields = value::record(d.name, Some(value))?.unwrap_or_default();
            let node = element.ensure_path_mut(&path);
            encode_table(node, inner, version, &|name| fields.get(name).cloned())?;
        }
    }
    Ok(())
}

/// Decoded values in table order. Invisible parameters are left out.
fn decode_table(
    element: &XmlNode,
    table: &'static [ParamDescriptor],
    version: Option<&SoftwareVersion>,
) -> Result<Vec<(&'static str, Option<Value>)>> {
    let mut seen: BTreeMap<&'static str, Value> = BTreeMap::new();
    let mut out = Vec::new();
    for d in table {
        if !is_visible(d, version) {
            continue;
        }
        let decoded = match resolve(d, &|name| seen.get(name).cloned()) {
            Some(segments) => decode(element, &segments, d, version)?,
            None => None,
        };
        let value = decoded.or_else(|| d.default_value());
        if let Some(v) = &value {
            seen.insert(d.name, v.clone());
        }
        out.push((d.name, value));
    }
    Ok(out)
}

fn decode(
    element: &XmlNode,
    segments: &[String],
    d: &ParamDescriptor,
    version: Option<&SoftwareVersion>,
) -> Result<Option<Value>> {
    let path: Vec<&str> = segments.iter().map(String::as_str).collect();
    let node = element.descend(&path);
    let raw = || node.and_then(|n| n.text.as_deref());
    let text = || raw().map(str::trim);
    let value = match d.encoding {
        // Text is kept verbatim; an empty leaf is the empty string.
        Encoding::Text => match node {
            Some(n) if n.text.is_none() && n.children.is_empty() => Some(Value::from("")),
            _ => raw().map(Value::from),
        },
        Encoding::Choice(_) => raw().map(Value::from),
        Encoding::Int => match text() {
            Some(raw) => Some(Value::Int(
                raw.parse().map_err(|_| invalid(d, format!("'{raw}'")))?,
            )),
            None => None,
        },
        Encoding::YesNo => match text() {
            Some("yes") => Some(Value::Bool(true)),
            Some("no") => Some(Value::Bool(false)),
            Some(other) => return Err(invalid(d, format!("'{other}'"))),
            None => None,
        },
        Encoding::Exist => node.map(|_| Value::Bool(true)),
        Encoding::Members => node.map(|n| {
            Value::List(
                n.get_children("member")
                    .into_iter()
                    .map(|m| m.text.clone().unwrap_or_default())
                    .collect(),
            )
        }),
        Encoding::Selector(choices) => node
            .and_then(|n| n.children.iter().find(|c| choices.contains(&c.tag.as_str())))
            .map(|c| Value::from(c.tag.as_str())),
        Encoding::Nested(inner) => match node {
            Some(n) => {
                let fields = decode_table(n, inner, version)?
                    .into_iter()
                    .filter_map(|(name, v)| v.map(|v| (name.to_string(), v)))
                    .collect();
                Some(Value::Record(fields))
            }
            None => None,
        },
    };
    Ok(value)
}

/// Path segments with `{param}` placeholders substituted, or `None` when a
/// referenced parameter is unset.
fn resolve(d: &ParamDescriptor, lookup: &dyn Fn(&str) -> Option<Value>) -> Option<Vec<String>> {
    d.segments()
        .map(|segment| match placeholder(segment) {
            Some(name) => lookup(name).map(|v| v.to_string()),
            None => Some(segment.to_string()),
        })
        .collect()
}

fn scalar(d: &ParamDescriptor, value: &Value) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        other => Err(invalid(d, other.to_string())),
    }
}

fn invalid(d: &ParamDescriptor, got: String) -> Error {
    Error::InvalidValue {
        param: d.name.to_string(),
        expected: d.encoding.label(),
        got,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use xml_doc_core::{parse_str, to_string};

    use super::{apply_element, decode_subtree, to_element};
    use crate::objects::{
        AddressGroup, AddressObject, DnsServers, Firewall, NodeKind, Object, RuleAction,
        Rulebase, SecurityRule, ServiceObject, ServiceProtocol, SystemSettings, Tag,
    };
    use crate::tree::ConfigTree;
    use crate::value::Value;
    use crate::version::SoftwareVersion;

    fn render(tree: &ConfigTree, id: crate::tree::NodeId) -> String {
        to_string(&to_element(tree, id, true, None).expect("element")).expect("xml")
    }

    #[test]
    fn address_value_lands_under_its_type() {
        let mut tree = ConfigTree::new();
        let a = tree.create_named(
            "web1",
            AddressObject::fqdn("web.example.com").with_description("front"),
        );
        assert_eq!(
            render(&tree, a),
            r#"<entry name="web1"><fqdn>web.example.com</fqdn><description>front</description></entry>"#
        );
    }

    #[test]
    fn none_is_omitted_and_booleans_use_tokens() {
        let mut tree = ConfigTree::new();
        let mut rule = SecurityRule::default();
        rule.action = Some(RuleAction::Deny);
        rule.log_end = Some(true);
        rule.disabled = Some(false);
        let id = tree.create_named("deny-all", rule);
        assert_eq!(
            render(&tree, id),
            r#"<entry name="deny-all"><action>deny</action><log-end>yes</log-end><disabled>no</disabled></entry>"#
        );
    }

    #[test]
    fn service_port_follows_protocol_template() {
        let mut tree = ConfigTree::new();
        let mut svc = ServiceObject::new(ServiceProtocol::Udp, "53");
        svc.override_disabled = Some(true);
        let id = tree.create_named("dns", svc);
        assert_eq!(
            render(&tree, id),
            r#"<entry name="dns"><protocol><udp><port>53</port><override><no/></override></udp></protocol></entry>"#
        );
    }

    #[test]
    fn nested_record_is_embedded() {
        let mut tree = ConfigTree::new();
        let id = tree.create(
            None,
            SystemSettings {
                hostname: Some("fw1".to_string()),
                dns: Some(DnsServers {
                    primary: Some("9.9.9.9".to_string()),
                    secondary: Some("1.1.1.1".to_string()),
                }),
                ..SystemSettings::default()
            },
        );
        assert_eq!(
            render(&tree, id),
            "<system><hostname>fw1</hostname><dns-setting><servers><primary>9.9.9.9</primary><secondary>1.1.1.1</secondary></servers></dns-setting></system>"
        );
    }

    #[test]
    fn children_nest_at_their_relative_path() {
        let mut tree = ConfigTree::new();
        let rb = tree.create(None, Rulebase);
        for name in ["b", "a"] {
            let rule = tree.create_named(name, SecurityRule::any(RuleAction::Allow));
            tree.add(rb, rule).expect("add");
        }
        let element = to_element(&tree, rb, true, None).expect("element");
        let names: Vec<_> = element
            .descend(&["security", "rules"])
            .expect("rules")
            .children
            .iter()
            .filter_map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        let bare = to_element(&tree, rb, false, None).expect("bare");
        assert!(bare.children.is_empty());
    }

    #[test]
    fn device_roots_cannot_be_marshaled() {
        let mut tree = ConfigTree::new();
        let fw = tree.create(None, Firewall::new("fw1"));
        assert!(to_element(&tree, fw, false, None).is_err());
    }

    #[test]
    fn empty_member_list_differs_from_absent() {
        let element = parse_str(r#"<entry name="g"><static/></entry>"#).expect("xml");
        let mut object = Object::from(AddressGroup::default());
        apply_element(&mut object, &element, None).expect("apply");
        assert_eq!(object.get("static_value").expect("get"), Some(Value::List(vec![])));
        assert_eq!(object.get("tag").expect("get"), None);
    }

    #[test]
    fn missing_selector_decodes_to_default_and_unknown_elements_are_ignored() {
        let element =
            parse_str(r#"<entry name="x"><future-field>1</future-field><description>d</description></entry>"#)
                .expect("xml");
        let mut object = Object::from(AddressObject::fqdn("old.example"));
        apply_element(&mut object, &element, None).expect("apply");
        assert_eq!(object.get("type").expect("type"), Some(Value::from("ip-netmask")));
        assert_eq!(object.get("value").expect("value"), None);
        assert_eq!(object.get("description").expect("d"), Some(Value::from("d")));
    }

    #[test]
    fn gated_params_are_skipped_both_ways() {
        let mut tree = ConfigTree::new();
        let mut rule = SecurityRule::any(RuleAction::Allow);
        rule.group_tag = Some("web".to_string());
        let id = tree.create_named("r", rule);
        let old = SoftwareVersion::new(8, 1, 0);
        let element = to_element(&tree, id, false, Some(&old)).expect("element");
        assert!(element.get_child("group-tag").is_none());

        let with_group = parse_str(r#"<entry name="r"><group-tag>db</group-tag></entry>"#)
            .expect("xml");
        let mut object = Object::default_for(NodeKind::SecurityRule);
        apply_element(&mut object, &with_group, Some(&old)).expect("apply");
        assert_eq!(object.get("group_tag").expect("get"), None);
        apply_element(&mut object, &with_group, None).expect("apply");
        assert_eq!(object.get("group_tag").expect("get"), Some(Value::from("db")));
    }

    #[test]
    fn bad_tokens_are_reported() {
        let element = parse_str(r#"<entry name="r"><log-end>maybe</log-end></entry>"#)
            .expect("xml");
        let mut object = Object::default_for(NodeKind::SecurityRule);
        assert!(apply_element(&mut object, &element, None).is_err());
    }

    #[test]
    fn decoded_subtree_round_trips() {
        let mut tree = ConfigTree::new();
        let rb = tree.create(None, Rulebase);
        let mut rule = SecurityRule::any(RuleAction::Allow);
        rule.tag = Some(vec!["web".to_string(), "prod".to_string()]);
        rule.log_start = Some(false);
        let r = tree.create_named("allow-web", rule);
        tree.add(rb, r).expect("add");
        let t = tree.create_named("prod", Tag {
            color: Some("color1".to_string()),
            comments: Some("production".to_string()),
        });

        for id in [rb, t] {
            let element = to_element(&tree, id, true, None).expect("element");
            let kind = tree.kind(id).expect("kind");
            let copy = decode_subtree(&mut tree, &element, kind, None).expect("decode");
            assert!(tree.equal_at(id, &tree, copy, None));
        }
    }
}
