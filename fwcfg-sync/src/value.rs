use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Dynamically typed parameter value used at the generic edges of the crate
/// (marshaling, `about()`, the CLI). Typed structs hold the real state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Record(fields) => {
                let inner: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

fn invalid(param: &str, expected: &'static str, got: &Value) -> Error {
    Error::InvalidValue {
        param: param.to_string(),
        expected,
        got: got.shape().to_string(),
    }
}

pub(crate) fn text(param: &str, value: Option<Value>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(Value::Text(s)) => Ok(Some(s)),
        Some(Value::Int(i)) => Ok(Some(i.to_string())),
        Some(other) => Err(invalid(param, "text", &other)),
    }
}

pub(crate) fn int(param: &str, value: Option<Value>) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(Value::Int(i)) => Ok(Some(i)),
        Some(Value::Text(s)) => s.trim().parse().map(Some).map_err(|_| Error::InvalidValue {
            param: param.to_string(),
            expected: "integer",
            got: format!("'{s}'"),
        }),
        Some(other) => Err(invalid(param, "integer", &other)),
    }
}

pub(crate) fn boolean(param: &str, value: Option<Value>) -> Result<Option<bool>> {
    match value {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(other) => Err(invalid(param, "boolean", &other)),
    }
}

pub(crate) fn list(param: &str, value: Option<Value>) -> Result<Option<Vec<String>>> {
    match value {
        None => Ok(None),
        Some(Value::List(items)) => Ok(Some(items)),
        Some(Value::Text(s)) => Ok(Some(vec![s])),
        Some(other) => Err(invalid(param, "member list", &other)),
    }
}

/// Text parsed into one of a fixed set of typed choices.
pub(crate) fn choice<T: FromStr>(param: &str, value: Option<Value>) -> Result<Option<T>> {
    match text(param, value)? {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| Error::InvalidValue {
            param: param.to_string(),
            expected: "one of the declared choices",
            got: format!("'{s}'"),
        }),
    }
}

pub(crate) fn record(param: &str, value: Option<Value>) -> Result<Option<BTreeMap<String, Value>>> {
    match value {
        None => Ok(None),
        Some(Value::Record(fields)) => Ok(Some(fields)),
        Some(other) => Err(invalid(param, "record", &other)),
    }
}

pub(crate) fn some_text(value: &Option<String>) -> Option<Value> {
    value.clone().map(Value::Text)
}

pub(crate) fn some_list(value: &Option<Vec<String>>) -> Option<Value> {
    value.clone().map(Value::List)
}

#[cfg(test)]
mod tests {
    use super::{choice, int, list, text, Value};
    use crate::error::Error;
    use crate::objects::AddressType;

    #[test]
    fn text_accepts_integers() {
        assert_eq!(
            text("port", Some(Value::Int(443))).expect("text"),
            Some("443".to_string())
        );
    }

    #[test]
    fn int_parses_numeric_text() {
        assert_eq!(int("timeout", Some("30".into())).expect("int"), Some(30));
        assert!(matches!(
            int("timeout", Some("soon".into())),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn single_text_becomes_one_member() {
        assert_eq!(
            list("tag", Some("prod".into())).expect("list"),
            Some(vec!["prod".to_string()])
        );
    }

    #[test]
    fn choices_reject_unknown_words() {
        assert_eq!(
            choice::<AddressType>("type", Some("fqdn".into())).expect("choice"),
            Some(AddressType::Fqdn)
        );
        assert!(choice::<AddressType>("type", Some("dns-name".into())).is_err());
    }

    #[test]
    fn display_uses_device_spelling() {
        assert_eq!(Value::Bool(true).to_string(), "yes");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[a, b]");
    }
}
