use crate::descriptor::{param, Encoding, Identity, KindSpec, ParamDescriptor, Placement};
use crate::error::Result;
use crate::objects::{unknown, NodeKind, Params};
use crate::value::{self, some_list, some_text, Value};

keyword_enum! {
    pub enum ServiceProtocol {
        Tcp => "tcp",
        Udp => "udp",
        Sctp => "sctp",
    }
}

impl Default for ServiceProtocol {
    fn default() -> Self {
        Self::Tcp
    }
}

static SERVICE_PARAMS: &[ParamDescriptor] = &[
    param("protocol", "protocol", Encoding::Selector(ServiceProtocol::KEYWORDS))
        .default_text("tcp"),
    param("source_port", "protocol/{protocol}/source-port", Encoding::Text),
    param("destination_port", "protocol/{protocol}/port", Encoding::Text),
    param("override_disabled", "protocol/{protocol}/override/no", Encoding::Exist),
    param("description", "description", Encoding::Text),
    param("tag", "tag", Encoding::Members),
];

pub(crate) static SERVICE: KindSpec = KindSpec {
    kind: NodeKind::Service,
    suffix: "service",
    identity: Identity::Named,
    placement: Placement::Scoped,
    children: &[],
    params: SERVICE_PARAMS,
};

/// Service object (`service/entry`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceObject {
    pub protocol: ServiceProtocol,
    pub source_port: Option<String>,
    pub destination_port: Option<String>,
    pub override_disabled: Option<bool>,
    pub description: Option<String>,
    pub tag: Option<Vec<String>>,
}

impl ServiceObject {
    pub fn new(protocol: ServiceProtocol, destination_port: impl Into<String>) -> Self {
        Self {
            protocol,
            destination_port: Some(destination_port.into()),
            ..Self::default()
        }
    }
}

impl Params for ServiceObject {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        SERVICE_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "protocol" => Some(Value::from(self.protocol.as_str())),
            "source_port" => some_text(&self.source_port),
            "destination_port" => some_text(&self.destination_port),
            // Only presence is encoded; `Some(false)` reads as unset.
            "override_disabled" => self.override_disabled.filter(|flag| *flag).map(Value::Bool),
            "description" => some_text(&self.description),
            "tag" => some_list(&self.tag),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "protocol" => self.protocol = value::choice(name, v)?.unwrap_or_default(),
            "source_port" => self.source_port = value::text(name, v)?,
            "destination_port" => self.destination_port = value::text(name, v)?,
            // Presence-only flag: false and unset encode the same way.
            "override_disabled" => {
                self.override_disabled = value::boolean(name, v)?.filter(|flag| *flag)
            }
            "description" => self.description = value::text(name, v)?,
            "tag" => self.tag = value::list(name, v)?,
            _ => return Err(unknown(NodeKind::Service, name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceObject, ServiceProtocol};
    use crate::objects::{Object, Params};
    use crate::value::Value;

    #[test]
    fn cleared_presence_flag_is_unset() {
        let mut svc = ServiceObject::new(ServiceProtocol::Udp, "53");
        svc.set("override_disabled", Some(Value::Bool(true))).expect("set");
        assert_eq!(svc.get("override_disabled"), Some(Value::Bool(true)));
        svc.set("override_disabled", Some(Value::Bool(false))).expect("clear");
        assert_eq!(svc.get("override_disabled"), None);
    }

    #[test]
    fn assigned_false_flag_reads_as_unset() {
        let mut svc = ServiceObject::new(ServiceProtocol::Tcp, "443");
        svc.override_disabled = Some(false);
        assert_eq!(svc.get("override_disabled"), None);

        let mut unset = svc.clone();
        unset.override_disabled = None;
        assert!(Object::from(svc).same_params(&Object::from(unset), None));
    }

    #[test]
    fn protocol_falls_back_to_tcp() {
        let mut svc = ServiceObject::new(ServiceProtocol::Sctp, "9");
        svc.set("protocol", None).expect("reset");
        assert_eq!(svc.protocol, ServiceProtocol::Tcp);
        assert!(svc.set("protocol", Some(Value::from("icmp"))).is_err());
    }
}
