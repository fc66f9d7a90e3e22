use crate::descriptor::{param, Encoding, Identity, KindSpec, ParamDescriptor, Placement};
use crate::error::Result;
use crate::objects::{from_record, to_record, unknown, NodeKind, Params};
use crate::value::{self, some_list, some_text, Value};
use crate::version::SoftwareVersion;

/// Vsys name that places scoped objects in `/config/shared`.
pub const SHARED: &str = "shared";

pub(crate) static FIREWALL: KindSpec = KindSpec {
    kind: NodeKind::Firewall,
    suffix: "",
    identity: Identity::Named,
    placement: Placement::Root,
    children: &[
        NodeKind::Vsys,
        NodeKind::SystemSettings,
        NodeKind::Address,
        NodeKind::AddressGroup,
        NodeKind::Service,
        NodeKind::Tag,
        NodeKind::Rulebase,
    ],
    params: &[],
};

pub(crate) static PANORAMA: KindSpec = KindSpec {
    kind: NodeKind::Panorama,
    suffix: "",
    identity: Identity::Singleton,
    placement: Placement::Root,
    children: &[
        NodeKind::DeviceGroup,
        NodeKind::SystemSettings,
        NodeKind::Address,
        NodeKind::AddressGroup,
        NodeKind::Service,
        NodeKind::Tag,
        NodeKind::PreRulebase,
        NodeKind::PostRulebase,
        NodeKind::Firewall,
    ],
    params: &[],
};

/// Standalone firewall, or a managed firewall below a Panorama.
///
/// `vsys` selects the scope used for policy objects added directly below the
/// firewall. `serial` identifies a managed firewall when requests are proxied
/// through its Panorama. `version` caches the running software version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firewall {
    pub hostname: Option<String>,
    pub serial: Option<String>,
    pub vsys: String,
    pub version: Option<SoftwareVersion>,
}

impl Default for Firewall {
    fn default() -> Self {
        Self {
            hostname: None,
            serial: None,
            vsys: "vsys1".to_string(),
            version: None,
        }
    }
}

impl Firewall {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            ..Self::default()
        }
    }

    /// Managed firewall addressed by serial through its Panorama.
    pub fn managed(serial: impl Into<String>) -> Self {
        Self {
            serial: Some(serial.into()),
            ..Self::default()
        }
    }

    pub fn with_vsys(mut self, vsys: impl Into<String>) -> Self {
        self.vsys = vsys.into();
        self
    }

    pub fn with_version(mut self, version: SoftwareVersion) -> Self {
        self.version = Some(version);
        self
    }
}

/// Panorama manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Panorama {
    pub hostname: Option<String>,
    pub version: Option<SoftwareVersion>,
}

impl Panorama {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            version: None,
        }
    }
}

empty_params! {
    Firewall => Firewall,
    Panorama => Panorama,
}

static VSYS_PARAMS: &[ParamDescriptor] = &[
    param("display_name", "display-name", Encoding::Text),
    param("max_sessions", "import/resource/max-sessions", Encoding::Int),
    param("interface", "import/network/interface", Encoding::Members),
];

pub(crate) static VSYS: KindSpec = KindSpec {
    kind: NodeKind::Vsys,
    suffix: "vsys",
    identity: Identity::Named,
    placement: Placement::Device,
    children: &[
        NodeKind::Address,
        NodeKind::AddressGroup,
        NodeKind::Service,
        NodeKind::Tag,
        NodeKind::Rulebase,
    ],
    params: VSYS_PARAMS,
};

/// Virtual system (`vsys/entry`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vsys {
    pub display_name: Option<String>,
    pub max_sessions: Option<i64>,
    pub interface: Option<Vec<String>>,
}

impl Params for Vsys {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        VSYS_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "display_name" => some_text(&self.display_name),
            "max_sessions" => self.max_sessions.map(Value::Int),
            "interface" => some_list(&self.interface),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "display_name" => self.display_name = value::text(name, v)?,
            "max_sessions" => self.max_sessions = value::int(name, v)?,
            "interface" => self.interface = value::list(name, v)?,
            _ => return Err(unknown(NodeKind::Vsys, name)),
        }
        Ok(())
    }
}

static DEVICE_GROUP_PARAMS: &[ParamDescriptor] =
    &[param("description", "description", Encoding::Text)];

pub(crate) static DEVICE_GROUP: KindSpec = KindSpec {
    kind: NodeKind::DeviceGroup,
    suffix: "device-group",
    identity: Identity::Named,
    placement: Placement::Device,
    children: &[
        NodeKind::Address,
        NodeKind::AddressGroup,
        NodeKind::Service,
        NodeKind::Tag,
        NodeKind::PreRulebase,
        NodeKind::PostRulebase,
        NodeKind::Firewall,
    ],
    params: DEVICE_GROUP_PARAMS,
};

/// Panorama device group (`device-group/entry`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceGroup {
    pub description: Option<String>,
}

impl Params for DeviceGroup {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        DEVICE_GROUP_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "description" => some_text(&self.description),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "description" => self.description = value::text(name, v)?,
            _ => return Err(unknown(NodeKind::DeviceGroup, name)),
        }
        Ok(())
    }
}

static DNS_PARAMS: &[ParamDescriptor] = &[
    param("primary", "primary", Encoding::Text),
    param("secondary", "secondary", Encoding::Text),
];

/// DNS servers embedded in [`SystemSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsServers {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl Params for DnsServers {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        DNS_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "primary" => some_text(&self.primary),
            "secondary" => some_text(&self.secondary),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "primary" => self.primary = value::text(name, v)?,
            "secondary" => self.secondary = value::text(name, v)?,
            _ => return Err(unknown(NodeKind::SystemSettings, name)),
        }
        Ok(())
    }
}

static SYSTEM_PARAMS: &[ParamDescriptor] = &[
    param("hostname", "hostname", Encoding::Text),
    param("domain", "domain", Encoding::Text),
    param("timezone", "timezone", Encoding::Text),
    param("panorama_server", "panorama-server", Encoding::Text),
    param("login_banner", "login-banner", Encoding::Text).until(SoftwareVersion::new(11, 0, 0)),
    param("dns", "dns-setting/servers", Encoding::Nested(DNS_PARAMS)),
];

pub(crate) static SYSTEM: KindSpec = KindSpec {
    kind: NodeKind::SystemSettings,
    suffix: "deviceconfig/system",
    identity: Identity::Singleton,
    placement: Placement::Device,
    children: &[],
    params: SYSTEM_PARAMS,
};

/// Device-wide system settings (`deviceconfig/system`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemSettings {
    pub hostname: Option<String>,
    pub domain: Option<String>,
    pub timezone: Option<String>,
    pub panorama_server: Option<String>,
    pub login_banner: Option<String>,
    pub dns: Option<DnsServers>,
}

impl Params for SystemSettings {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        SYSTEM_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "hostname" => some_text(&self.hostname),
            "domain" => some_text(&self.domain),
            "timezone" => some_text(&self.timezone),
            "panorama_server" => some_text(&self.panorama_server),
            "login_banner" => some_text(&self.login_banner),
            "dns" => self.dns.as_ref().and_then(to_record),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "hostname" => self.hostname = value::text(name, v)?,
            "domain" => self.domain = value::text(name, v)?,
            "timezone" => self.timezone = value::text(name, v)?,
            "panorama_server" => self.panorama_server = value::text(name, v)?,
            "login_banner" => self.login_banner = value::text(name, v)?,
            "dns" => self.dns = from_record(name, v)?,
            _ => return Err(unknown(NodeKind::SystemSettings, name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DnsServers, SystemSettings};
    use crate::objects::Params;
    use crate::value::Value;

    #[test]
    fn dns_round_trips_through_record() {
        let mut settings = SystemSettings {
            dns: Some(DnsServers {
                primary: Some("9.9.9.9".to_string()),
                secondary: None,
            }),
            ..SystemSettings::default()
        };
        let record = settings.get("dns").expect("record");
        assert!(matches!(&record, Value::Record(fields) if fields.len() == 1));

        settings.dns = None;
        settings.set("dns", Some(record)).expect("set");
        assert_eq!(
            settings.dns.and_then(|d| d.primary).as_deref(),
            Some("9.9.9.9")
        );
    }

    #[test]
    fn empty_dns_record_reads_as_unset() {
        let settings = SystemSettings {
            dns: Some(DnsServers::default()),
            ..SystemSettings::default()
        };
        assert_eq!(settings.get("dns"), None);
    }
}
