//! Static parameter metadata.
//!
//! Every node kind declares an ordered table of [`ParamDescriptor`]s saying
//! where each parameter lives below the node's element and how its value is
//! spelled. Tables are `&'static` data built with `const` constructors and are
//! never mutated.

use crate::error::{Error, Result};
use crate::objects::NodeKind;
use crate::value::Value;
use crate::version::SoftwareVersion;

/// How a parameter value is written into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Leaf text.
    Text,
    /// Leaf text holding a base-10 integer.
    Int,
    /// Boolean spelled `yes` / `no`.
    YesNo,
    /// Boolean spelled as presence of an empty element.
    Exist,
    /// Ordered `<member>` list.
    Members,
    /// Leaf text restricted to a fixed vocabulary.
    Choice(&'static [&'static str]),
    /// The value names which child element exists below the path.
    Selector(&'static [&'static str]),
    /// Embedded record with its own table.
    Nested(&'static [ParamDescriptor]),
}

impl Encoding {
    /// Short name used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "integer",
            Self::YesNo | Self::Exist => "boolean",
            Self::Members => "member list",
            Self::Choice(_) | Self::Selector(_) => "choice",
            Self::Nested(_) => "record",
        }
    }
}

/// Literal default applied when the element is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    None,
    Text(&'static str),
    Int(i64),
    Bool(bool),
}

/// Where and how one parameter is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    /// `/`-separated element path below the node's element. A `{param}`
    /// segment is replaced by the current value of that parameter. An empty
    /// path places a [`Encoding::Selector`] choice directly below the node.
    pub path: &'static str,
    pub encoding: Encoding,
    pub default: Fallback,
    /// First version carrying the parameter.
    pub since: Option<SoftwareVersion>,
    /// First version no longer carrying the parameter.
    pub until: Option<SoftwareVersion>,
}

/// Start a descriptor with no default and no version bounds.
pub const fn param(name: &'static str, path: &'static str, encoding: Encoding) -> ParamDescriptor {
    ParamDescriptor {
        name,
        path,
        encoding,
        default: Fallback::None,
        since: None,
        until: None,
    }
}

impl ParamDescriptor {
    pub const fn default_text(mut self, value: &'static str) -> Self {
        self.default = Fallback::Text(value);
        self
    }

    pub const fn default_int(mut self, value: i64) -> Self {
        self.default = Fallback::Int(value);
        self
    }

    pub const fn default_bool(mut self, value: bool) -> Self {
        self.default = Fallback::Bool(value);
        self
    }

    pub const fn since(mut self, version: SoftwareVersion) -> Self {
        self.since = Some(version);
        self
    }

    pub const fn until(mut self, version: SoftwareVersion) -> Self {
        self.until = Some(version);
        self
    }

    /// Declared default as an owned value.
    pub fn default_value(&self) -> Option<Value> {
        match self.default {
            Fallback::None => None,
            Fallback::Text(s) => Some(Value::Text(s.to_string())),
            Fallback::Int(i) => Some(Value::Int(i)),
            Fallback::Bool(b) => Some(Value::Bool(b)),
        }
    }

    /// Path segments, with `{param}` placeholders left in place.
    pub fn segments(&self) -> impl Iterator<Item = &'static str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Names of the parameters this path is templated on.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        self.segments().filter_map(placeholder)
    }
}

/// `{type}` yields `Some("type")`.
pub(crate) fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

/// Whether a kind is addressed as `entry[@name=...]` or as a bare element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Named,
    Singleton,
}

/// Where a kind sits when it is a direct child of a device root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The device root itself.
    Root,
    /// Device-wide configuration under the device entry.
    Device,
    /// Policy objects that live in a vsys, device group or the shared scope.
    Scoped,
    /// Only meaningful below another config object.
    Nested,
}

/// Per-kind schema: element location, identity, allowed children and the
/// parameter table.
#[derive(Debug)]
pub struct KindSpec {
    pub kind: NodeKind,
    /// Element path of the container holding this kind, e.g. `address`
    /// or `deviceconfig/system`.
    pub suffix: &'static str,
    pub identity: Identity,
    pub placement: Placement,
    pub children: &'static [NodeKind],
    pub params: &'static [ParamDescriptor],
}

impl KindSpec {
    pub fn allows(&self, child: NodeKind) -> bool {
        self.children.contains(&child)
    }

    pub fn is_named(&self) -> bool {
        self.identity == Identity::Named
    }

    /// Declared parameter, or [`Error::UnknownParam`].
    pub fn descriptor(&self, name: &str) -> Result<&'static ParamDescriptor> {
        find(self.params, name).ok_or_else(|| Error::UnknownParam {
            kind: self.kind,
            param: name.to_string(),
        })
    }
}

pub(crate) fn find(table: &'static [ParamDescriptor], name: &str) -> Option<&'static ParamDescriptor> {
    table.iter().find(|d| d.name == name)
}

/// Look up a parameter of `kind`.
pub fn descriptor(kind: NodeKind, name: &str) -> Result<&'static ParamDescriptor> {
    kind.spec().descriptor(name)
}
