//! Typed configuration objects.
//!
//! Each node kind is a plain struct with typed fields. [`Params`] exposes
//! those fields by parameter name so the marshaling engine and `about()` can
//! walk them through the kind's descriptor table. [`Object`] is the closed set
//! of kinds a tree slot can hold.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::descriptor::{KindSpec, ParamDescriptor};
use crate::error::{Error, Result};
use crate::value::{self, Value};
use crate::version::{is_visible, SoftwareVersion};

/// Word outside a keyword vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown keyword '{0}'")]
pub struct UnknownKeyword(pub String);

/// Enum whose variants are spelled as fixed device keywords.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name { $($variant),+ }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
            pub const KEYWORDS: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::objects::UnknownKeyword;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::objects::UnknownKeyword(s.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// `Params` for kinds without configurable parameters.
macro_rules! empty_params {
    ($($ty:ident => $kind:ident),+ $(,)?) => {
        $(impl $crate::objects::Params for $ty {
            fn descriptors(&self) -> &'static [$crate::descriptor::ParamDescriptor] {
                &[]
            }

            fn get(&self, _name: &str) -> Option<$crate::value::Value> {
                None
            }

            fn set(&mut self, name: &str, _value: Option<$crate::value::Value>) -> $crate::error::Result<()> {
                Err($crate::objects::unknown($crate::objects::NodeKind::$kind, name))
            }
        })+
    };
}

mod address;
mod device;
mod policy;
mod service;
mod tag;

pub use address::{AddressGroup, AddressObject, AddressType};
pub use device::{DeviceGroup, DnsServers, Firewall, Panorama, SystemSettings, Vsys, SHARED};
pub use policy::{PostRulebase, PreRulebase, RuleAction, Rulebase, SecurityRule};
pub use service::{ServiceObject, ServiceProtocol};
pub use tag::Tag;

keyword_enum! {
    /// Tag identifying the concrete kind of a tree node.
    #[derive(PartialOrd, Ord, serde::Serialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum NodeKind {
        Firewall => "firewall",
        Panorama => "panorama",
        Vsys => "vsys",
        DeviceGroup => "device-group",
        SystemSettings => "system",
        Rulebase => "rulebase",
        PreRulebase => "pre-rulebase",
        PostRulebase => "post-rulebase",
        Address => "address",
        AddressGroup => "address-group",
        Service => "service",
        Tag => "tag",
        SecurityRule => "security-rule",
    }
}

impl NodeKind {
    /// Schema entry for this kind.
    pub fn spec(self) -> &'static KindSpec {
        match self {
            Self::Firewall => &device::FIREWALL,
            Self::Panorama => &device::PANORAMA,
            Self::Vsys => &device::VSYS,
            Self::DeviceGroup => &device::DEVICE_GROUP,
            Self::SystemSettings => &device::SYSTEM,
            Self::Rulebase => &policy::RULEBASE,
            Self::PreRulebase => &policy::PRE_RULEBASE,
            Self::PostRulebase => &policy::POST_RULEBASE,
            Self::Address => &address::ADDRESS,
            Self::AddressGroup => &address::ADDRESS_GROUP,
            Self::Service => &service::SERVICE,
            Self::Tag => &tag::TAG,
            Self::SecurityRule => &policy::SECURITY_RULE,
        }
    }

    /// Firewalls and Panoramas terminate path resolution.
    pub fn is_device_root(self) -> bool {
        matches!(self, Self::Firewall | Self::Panorama)
    }
}

/// Name-based access to the typed fields of an object.
pub trait Params {
    /// Descriptor table, in marshaling order.
    fn descriptors(&self) -> &'static [ParamDescriptor];

    /// Current value of a declared parameter. Undeclared names yield `None`.
    fn get(&self, name: &str) -> Option<Value>;

    /// Replace a parameter value; `None` clears it (or restores the
    /// declared default for parameters that always carry one).
    fn set(&mut self, name: &str, value: Option<Value>) -> Result<()>;
}

pub(crate) fn unknown(kind: NodeKind, name: &str) -> Error {
    Error::UnknownParam {
        kind,
        param: name.to_string(),
    }
}

/// Nested record as a [`Value::Record`]; `None` when every field is unset.
pub(crate) fn to_record<P: Params>(params: &P) -> Option<Value> {
    let fields: BTreeMap<String, Value> = params
        .descriptors()
        .iter()
        .filter_map(|d| params.get(d.name).map(|v| (d.name.to_string(), v)))
        .collect();
    (!fields.is_empty()).then_some(Value::Record(fields))
}

pub(crate) fn from_record<P: Params + Default>(param: &str, value: Option<Value>) -> Result<Option<P>> {
    let Some(fields) = value::record(param, value)? else {
        return Ok(None);
    };
    let mut out = P::default();
    for (name, v) in fields {
        out.set(&name, Some(v))?;
    }
    Ok(Some(out))
}

/// A tree slot's payload: one of the concrete node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Firewall(Firewall),
    Panorama(Panorama),
    Vsys(Vsys),
    DeviceGroup(DeviceGroup),
    SystemSettings(SystemSettings),
    Rulebase(Rulebase),
    PreRulebase(PreRulebase),
    PostRulebase(PostRulebase),
    Address(AddressObject),
    AddressGroup(AddressGroup),
    Service(ServiceObject),
    Tag(Tag),
    SecurityRule(SecurityRule),
}

macro_rules! object_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(impl From<$ty> for Object {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        })+
    };
}

object_from! {
    Firewall(Firewall),
    Panorama(Panorama),
    Vsys(Vsys),
    DeviceGroup(DeviceGroup),
    SystemSettings(SystemSettings),
    Rulebase(Rulebase),
    PreRulebase(PreRulebase),
    PostRulebase(PostRulebase),
    Address(AddressObject),
    AddressGroup(AddressGroup),
    Service(ServiceObject),
    Tag(Tag),
    SecurityRule(SecurityRule),
}

impl Object {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Firewall(_) => NodeKind::Firewall,
            Self::Panorama(_) => NodeKind::Panorama,
            Self::Vsys(_) => NodeKind::Vsys,
            Self::DeviceGroup(_) => NodeKind::DeviceGroup,
            Self::SystemSettings(_) => NodeKind::SystemSettings,
            Self::Rulebase(_) => NodeKind::Rulebase,
            Self::PreRulebase(_) => NodeKind::PreRulebase,
            Self::PostRulebase(_) => NodeKind::PostRulebase,
            Self::Address(_) => NodeKind::Address,
            Self::AddressGroup(_) => NodeKind::AddressGroup,
            Self::Service(_) => NodeKind::Service,
            Self::Tag(_) => NodeKind::Tag,
            Self::SecurityRule(_) => NodeKind::SecurityRule,
        }
    }

    /// Freshly constructed object of `kind` with declared defaults.
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Firewall => Firewall::default().into(),
            NodeKind::Panorama => Panorama::default().into(),
            NodeKind::Vsys => Vsys::default().into(),
            NodeKind::DeviceGroup => DeviceGroup::default().into(),
            NodeKind::SystemSettings => SystemSettings::default().into(),
            NodeKind::Rulebase => Rulebase.into(),
            NodeKind::PreRulebase => PreRulebase.into(),
            NodeKind::PostRulebase => PostRulebase.into(),
            NodeKind::Address => AddressObject::default().into(),
            NodeKind::AddressGroup => AddressGroup::default().into(),
            NodeKind::Service => ServiceObject::default().into(),
            NodeKind::Tag => Tag::default().into(),
            NodeKind::SecurityRule => SecurityRule::default().into(),
        }
    }

    pub fn spec(&self) -> &'static KindSpec {
        self.kind().spec()
    }

    pub fn params(&self) -> &dyn Params {
        match self {
            Self::Firewall(o) => o,
            Self::Panorama(o) => o,
            Self::Vsys(o) => o,
            Self::DeviceGroup(o) => o,
            Self::SystemSettings(o) => o,
            Self::Rulebase(o) => o,
            Self::PreRulebase(o) => o,
            Self::PostRulebase(o) => o,
            Self::Address(o) => o,
            Self::AddressGroup(o) => o,
            Self::Service(o) => o,
            Self::Tag(o) => o,
            Self::SecurityRule(o) => o,
        }
    }

    pub fn params_mut(&mut self) -> &mut dyn Params {
        match self {
            Self::Firewall(o) => o,
            Self::Panorama(o) => o,
            Self::Vsys(o) => o,
            Self::DeviceGroup(o) => o,
            Self::SystemSettings(o) => o,
            Self::Rulebase(o) => o,
            Self::PreRulebase(o) => o,
            Self::PostRulebase(o) => o,
            Self::Address(o) => o,
            Self::AddressGroup(o) => o,
            Self::Service(o) => o,
            Self::Tag(o) => o,
            Self::SecurityRule(o) => o,
        }
    }

    /// Value of a declared parameter.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        self.spec().descriptor(name)?;
        Ok(self.params().get(name))
    }

    /// Set a declared parameter.
    pub fn set(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        self.spec().descriptor(name)?;
        self.params_mut().set(name, value)
    }

    /// Reset every parameter to its declared default, keeping the kind.
    pub fn reset(&mut self) {
        *self = Self::default_for(self.kind());
    }

    /// Parameter-wise equality over descriptors visible at `version`.
    pub fn same_params(&self, other: &Object, version: Option<&SoftwareVersion>) -> bool {
        self.kind() == other.kind()
            && self
                .spec()
                .params
                .iter()
                .filter(|d| is_visible(d, version))
                .all(|d| self.params().get(d.name) == other.params().get(d.name))
    }

    pub fn as_firewall(&self) -> Option<&Firewall> {
        match self {
            Self::Firewall(fw) => Some(fw),
            _ => None,
        }
    }

    pub fn as_panorama(&self) -> Option<&Panorama> {
        match self {
            Self::Panorama(p) => Some(p),
            _ => None,
        }
    }

    /// Version cached on a device root.
    pub fn cached_version(&self) -> Option<SoftwareVersion> {
        match self {
            Self::Firewall(fw) => fw.version,
            Self::Panorama(p) => p.version,
            _ => None,
        }
    }

    pub(crate) fn cache_version(&mut self, version: SoftwareVersion) {
        match self {
            Self::Firewall(fw) => fw.version = Some(version),
            Self::Panorama(p) => p.version = Some(version),
            _ => {}
        }
    }
}
