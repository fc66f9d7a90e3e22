use crate::descriptor::{param, Encoding, Identity, KindSpec, ParamDescriptor, Placement};
use crate::error::Result;
use crate::objects::{unknown, NodeKind, Params};
use crate::value::{self, some_list, some_text, Value};

keyword_enum! {
    /// Which element carries an address object's value.
    pub enum AddressType {
        IpNetmask => "ip-netmask",
        IpRange => "ip-range",
        IpWildcard => "ip-wildcard",
        Fqdn => "fqdn",
    }
}

impl Default for AddressType {
    fn default() -> Self {
        Self::IpNetmask
    }
}

static ADDRESS_PARAMS: &[ParamDescriptor] = &[
    param("type", "", Encoding::Selector(AddressType::KEYWORDS)).default_text("ip-netmask"),
    param("value", "{type}", Encoding::Text),
    param("description", "description", Encoding::Text),
    param("tag", "tag", Encoding::Members),
];

pub(crate) static ADDRESS: KindSpec = KindSpec {
    kind: NodeKind::Address,
    suffix: "address",
    identity: Identity::Named,
    placement: Placement::Scoped,
    children: &[],
    params: ADDRESS_PARAMS,
};

/// Address object (`address/entry`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressObject {
    pub address_type: AddressType,
    pub value: Option<String>,
    pub description: Option<String>,
    pub tag: Option<Vec<String>>,
}

impl AddressObject {
    pub fn ip_netmask(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn fqdn(value: impl Into<String>) -> Self {
        Self {
            address_type: AddressType::Fqdn,
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Params for AddressObject {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        ADDRESS_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "type" => Some(Value::from(self.address_type.as_str())),
            "value" => some_text(&self.value),
            "description" => some_text(&self.description),
            "tag" => some_list(&self.tag),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "type" => self.address_type = value::choice(name, v)?.unwrap_or_default(),
            "value" => self.value = value::text(name, v)?,
            "description" => self.description = value::text(name, v)?,
            "tag" => self.tag = value::list(name, v)?,
            _ => return Err(unknown(NodeKind::Address, name)),
        }
        Ok(())
    }
}

static ADDRESS_GROUP_PARAMS: &[ParamDescriptor] = &[
    param("static_value", "static", Encoding::Members),
    param("dynamic_value", "dynamic/filter", Encoding::Text),
    param("description", "description", Encoding::Text),
    param("tag", "tag", Encoding::Members),
];

pub(crate) static ADDRESS_GROUP: KindSpec = KindSpec {
    kind: NodeKind::AddressGroup,
    suffix: "address-group",
    identity: Identity::Named,
    placement: Placement::Scoped,
    children: &[],
    params: ADDRESS_GROUP_PARAMS,
};

/// Static or dynamic address group (`address-group/entry`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressGroup {
    pub static_value: Option<Vec<String>>,
    pub dynamic_value: Option<String>,
    pub description: Option<String>,
    pub tag: Option<Vec<String>>,
}

impl AddressGroup {
    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            static_value: Some(members.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

impl Params for AddressGroup {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        ADDRESS_GROUP_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "static_value" => some_list(&self.static_value),
            "dynamic_value" => some_text(&self.dynamic_value),
            "description" => some_text(&self.description),
            "tag" => some_list(&self.tag),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "static_value" => self.static_value = value::list(name, v)?,
            "dynamic_value" => self.dynamic_value = value::text(name, v)?,
            "description" => self.description = value::text(name, v)?,
            "tag" => self.tag = value::list(name, v)?,
            _ => return Err(unknown(NodeKind::AddressGroup, name)),
        }
        Ok(())
    }
}
