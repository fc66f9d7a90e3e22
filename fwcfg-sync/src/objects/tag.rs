use crate::descriptor::{param, Encoding, Identity, KindSpec, ParamDescriptor, Placement};
use crate::error::Result;
use crate::objects::{unknown, NodeKind, Params};
use crate::value::{self, some_text, Value};
use crate::version::SoftwareVersion;

static TAG_PARAMS: &[ParamDescriptor] = &[
    param("color", "color", Encoding::Text),
    param("comments", "comments", Encoding::Text).since(SoftwareVersion::new(8, 1, 0)),
];

pub(crate) static TAG: KindSpec = KindSpec {
    kind: NodeKind::Tag,
    suffix: "tag",
    identity: Identity::Named,
    placement: Placement::Scoped,
    children: &[],
    params: TAG_PARAMS,
};

/// Administrative tag (`tag/entry`). Colors use the device's `colorN` names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub color: Option<String>,
    pub comments: Option<String>,
}

impl Params for Tag {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        TAG_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "color" => some_text(&self.color),
            "comments" => some_text(&self.comments),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "color" => self.color = value::text(name, v)?,
            "comments" => self.comments = value::text(name, v)?,
            _ => return Err(unknown(NodeKind::Tag, name)),
        }
        Ok(())
    }
}
