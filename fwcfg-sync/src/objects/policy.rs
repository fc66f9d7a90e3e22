use crate::descriptor::{param, Encoding, Identity, KindSpec, ParamDescriptor, Placement};
use crate::error::Result;
use crate::objects::{unknown, NodeKind, Params};
use crate::value::{self, some_list, some_text, Value};
use crate::version::SoftwareVersion;

keyword_enum! {
    pub enum RuleAction {
        Allow => "allow",
        Deny => "deny",
        Drop => "drop",
        ResetClient => "reset-client",
        ResetServer => "reset-server",
        ResetBoth => "reset-both",
    }
}

pub(crate) static RULEBASE: KindSpec = KindSpec {
    kind: NodeKind::Rulebase,
    suffix: "rulebase",
    identity: Identity::Singleton,
    placement: Placement::Scoped,
    children: &[NodeKind::SecurityRule],
    params: &[],
};

pub(crate) static PRE_RULEBASE: KindSpec = KindSpec {
    kind: NodeKind::PreRulebase,
    suffix: "pre-rulebase",
    identity: Identity::Singleton,
    placement: Placement::Scoped,
    children: &[NodeKind::SecurityRule],
    params: &[],
};

pub(crate) static POST_RULEBASE: KindSpec = KindSpec {
    kind: NodeKind::PostRulebase,
    suffix: "post-rulebase",
    identity: Identity::Singleton,
    placement: Placement::Scoped,
    children: &[NodeKind::SecurityRule],
    params: &[],
};

/// Firewall rulebase (`rulebase`), a container for ordered rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rulebase;

/// Panorama rules evaluated before the device's local rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreRulebase;

/// Panorama rules evaluated after the device's local rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostRulebase;

empty_params! {
    Rulebase => Rulebase,
    PreRulebase => PreRulebase,
    PostRulebase => PostRulebase,
}

static SECURITY_RULE_PARAMS: &[ParamDescriptor] = &[
    param("fromzone", "from", Encoding::Members),
    param("tozone", "to", Encoding::Members),
    param("source", "source", Encoding::Members),
    param("source_user", "source-user", Encoding::Members),
    param("destination", "destination", Encoding::Members),
    param("application", "application", Encoding::Members),
    param("service", "service", Encoding::Members),
    param("category", "category", Encoding::Members),
    param("action", "action", Encoding::Choice(RuleAction::KEYWORDS)),
    param("log_setting", "log-setting", Encoding::Text),
    param("log_start", "log-start", Encoding::YesNo),
    param("log_end", "log-end", Encoding::YesNo),
    param("disabled", "disabled", Encoding::YesNo),
    param("negate_source", "negate-source", Encoding::YesNo),
    param("negate_destination", "negate-destination", Encoding::YesNo),
    param("description", "description", Encoding::Text),
    param("tag", "tag", Encoding::Members),
    param("group_tag", "group-tag", Encoding::Text).since(SoftwareVersion::new(9, 0, 0)),
];

pub(crate) static SECURITY_RULE: KindSpec = KindSpec {
    kind: NodeKind::SecurityRule,
    suffix: "security/rules",
    identity: Identity::Named,
    placement: Placement::Nested,
    children: &[],
    params: SECURITY_RULE_PARAMS,
};

/// Security policy rule (`security/rules/entry`). Position among siblings
/// is evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRule {
    pub fromzone: Option<Vec<String>>,
    pub tozone: Option<Vec<String>>,
    pub source: Option<Vec<String>>,
    pub source_user: Option<Vec<String>>,
    pub destination: Option<Vec<String>>,
    pub application: Option<Vec<String>>,
    pub service: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
    pub action: Option<RuleAction>,
    pub log_setting: Option<String>,
    pub log_start: Option<bool>,
    pub log_end: Option<bool>,
    pub disabled: Option<bool>,
    pub negate_source: Option<bool>,
    pub negate_destination: Option<bool>,
    pub description: Option<String>,
    pub tag: Option<Vec<String>>,
    pub group_tag: Option<String>,
}

impl SecurityRule {
    /// Rule matching `any` everywhere with the given action.
    pub fn any(action: RuleAction) -> Self {
        let any = || Some(vec!["any".to_string()]);
        Self {
            fromzone: any(),
            tozone: any(),
            source: any(),
            source_user: any(),
            destination: any(),
            application: any(),
            service: Some(vec!["application-default".to_string()]),
            category: any(),
            action: Some(action),
            ..Self::default()
        }
    }
}

impl Params for SecurityRule {
    fn descriptors(&self) -> &'static [ParamDescriptor] {
        SECURITY_RULE_PARAMS
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "fromzone" => some_list(&self.fromzone),
            "tozone" => some_list(&self.tozone),
            "source" => some_list(&self.source),
            "source_user" => some_list(&self.source_user),
            "destination" => some_list(&self.destination),
            "application" => some_list(&self.application),
            "service" => some_list(&self.service),
            "category" => some_list(&self.category),
            "action" => self.action.map(|a| Value::from(a.as_str())),
            "log_setting" => some_text(&self.log_setting),
            "log_start" => self.log_start.map(Value::Bool),
            "log_end" => self.log_end.map(Value::Bool),
            "disabled" => self.disabled.map(Value::Bool),
            "negate_source" => self.negate_source.map(Value::Bool),
            "negate_destination" => self.negate_destination.map(Value::Bool),
            "description" => some_text(&self.description),
            "tag" => some_list(&self.tag),
            "group_tag" => some_text(&self.group_tag),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, v: Option<Value>) -> Result<()> {
        match name {
            "fromzone" => self.fromzone = value::list(name, v)?,
            "tozone" => self.tozone = value::list(name, v)?,
            "source" => self.source = value::list(name, v)?,
            "source_user" => self.source_user = value::list(name, v)?,
            "destination" => self.destination = value::list(name, v)?,
            "application" => self.application = value::list(name, v)?,
            "service" => self.service = value::list(name, v)?,
            "category" => self.category = value::list(name, v)?,
            "action" => self.action = value::choice(name, v)?,
            "log_setting" => self.log_setting = value::text(name, v)?,
            "log_start" => self.log_start = value::boolean(name, v)?,
            "log_end" => self.log_end = value::boolean(name, v)?,
            "disabled" => self.disabled = value::boolean(name, v)?,
            "negate_source" => self.negate_source = value::boolean(name, v)?,
            "negate_destination" => self.negate_destination = value::boolean(name, v)?,
            "description" => self.description = value::text(name, v)?,
            "tag" => self.tag = value::list(name, v)?,
            "group_tag" => self.group_tag = value::text(name, v)?,
            _ => return Err(unknown(NodeKind::SecurityRule, name)),
        }
        Ok(())
    }
}
