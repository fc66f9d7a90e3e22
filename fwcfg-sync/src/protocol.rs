//! The remote configuration protocol consumed by [`crate::session::Session`].
//!
//! A [`Transport`] executes one [`Request`] and returns the device's
//! [`Response`]. HTTP clients, key caching and certificate handling live
//! behind the trait; [`crate::emulator::MemoryDevice`] is the in-memory
//! implementation.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use thiserror::Error;
use xml_doc_core::XmlNode;

/// Remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Get,
    Set,
    Edit,
    Delete,
    Move,
    Rename,
    Override,
    Commit,
    Op,
    Keygen,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Rename => "rename",
            Self::Override => "override",
            Self::Commit => "commit",
            Self::Op => "op",
            Self::Keygen => "keygen",
        }
    }

    /// Actions that change the candidate configuration or commit it.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::Set
                | Self::Edit
                | Self::Delete
                | Self::Move
                | Self::Rename
                | Self::Override
                | Self::Commit
        )
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote operation. `extra` carries per-action arguments such as the
/// proxy `target` serial, `where`/`dst` for moves or `newname` for renames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub action: Action,
    pub xpath: Option<String>,
    pub element: Option<XmlNode>,
    pub extra: BTreeMap<String, String>,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            xpath: None,
            element: None,
            extra: BTreeMap::new(),
        }
    }

    /// Request addressed at `xpath`.
    pub fn at(action: Action, xpath: impl Into<String>) -> Self {
        Self {
            xpath: Some(xpath.into()),
            ..Self::new(action)
        }
    }

    /// Operational command; the command document travels as the element.
    pub fn op(cmd: XmlNode) -> Self {
        Self::new(Action::Op).with_element(cmd)
    }

    pub fn with_element(mut self, element: XmlNode) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.extra.get("target").map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

/// Device answer. `document` is the `<result>` element when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub code: Option<String>,
    pub message: Option<String>,
    pub document: Option<XmlNode>,
}

/// The transport could not produce a device answer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl Response {
    pub fn success(document: Option<XmlNode>) -> Self {
        Self {
            status: Status::Success,
            code: None,
            message: None,
            document,
        }
    }

    pub fn error(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            code: code.map(str::to_string),
            message: Some(message.into()),
            document: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Decode `<response status=".." code=".."><result/><msg/></response>`.
    ///
    /// Messages may be plain text or a list of `<line>` elements, either at
    /// the top level or inside `<result>`.
    pub fn from_envelope(envelope: &XmlNode) -> Result<Self, TransportError> {
        if envelope.tag != "response" {
            return Err(TransportError::Malformed(format!(
                "expected <response>, found <{}>",
                envelope.tag
            )));
        }
        let status = match envelope.attributes.get("status").map(String::as_str) {
            Some("success") => Status::Success,
            Some("error") => Status::Error,
            other => {
                return Err(TransportError::Malformed(format!(
                    "unexpected status {other:?}"
                )))
            }
        };
        let document = envelope.get_child("result").cloned();
        let message = envelope
            .get_child("msg")
            .or_else(|| document.as_ref().and_then(|r| r.get_child("msg")))
            .and_then(message_text);
        Ok(Self {
            status,
            code: envelope.attributes.get("code").cloned(),
            message,
            document,
        })
    }

    /// Render the device envelope.
    pub fn into_envelope(self) -> XmlNode {
        let status = match self.status {
            Status::Success => "success",
            Status::Error => "error",
        };
        let mut envelope = XmlNode::new("response").attr("status", status);
        if let Some(code) = self.code {
            envelope = envelope.attr("code", code);
        }
        if let Some(result) = self.document {
            envelope = envelope.child(result);
        }
        if let Some(message) = self.message {
            let mut msg = XmlNode::new("msg");
            msg.children = message
                .split("; ")
                .map(|line| XmlNode::with_text("line", line))
                .collect();
            envelope = envelope.child(msg);
        }
        envelope
    }

    /// First element inside `<result>`.
    pub fn first_result(&self) -> Option<&XmlNode> {
        self.document.as_ref()?.children.first()
    }
}

fn message_text(msg: &XmlNode) -> Option<String> {
    let lines: Vec<&str> = msg
        .get_children("line")
        .into_iter()
        .filter_map(|l| l.text.as_deref())
        .collect();
    if lines.is_empty() {
        msg.text.clone()
    } else {
        Some(lines.join("; "))
    }
}

/// Executes remote operations against one device.
pub trait Transport {
    fn execute(&mut self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn execute(&mut self, request: &Request) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&mut self, request: &Request) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use xml_doc_core::{parse_str, XmlNode};

    use super::{Action, Response, Status};

    #[test]
    fn decodes_error_envelope_with_lines() {
        let xml = r#"<response status="error" code="7"><msg><line>edit failed</line><line>Object doesn't exist</line></msg></response>"#;
        let response = Response::from_envelope(&parse_str(xml).expect("xml")).expect("envelope");
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.code.as_deref(), Some("7"));
        assert_eq!(
            response.message.as_deref(),
            Some("edit failed; Object doesn't exist")
        );
    }

    #[test]
    fn decodes_message_nested_in_result() {
        let xml = r#"<response status="success" code="19"><result><msg><line>There are no changes to commit.</line></msg></result></response>"#;
        let response = Response::from_envelope(&parse_str(xml).expect("xml")).expect("envelope");
        assert!(response.is_success());
        assert_eq!(
            response.message.as_deref(),
            Some("There are no changes to commit.")
        );
    }

    #[test]
    fn envelope_round_trip_keeps_result() {
        let result = XmlNode::new("result").child(XmlNode::entry("web1"));
        let response = Response::success(Some(result)).with_message("command succeeded");
        let decoded = Response::from_envelope(&response.clone().into_envelope()).expect("decode");
        assert_eq!(decoded, response);
        assert_eq!(decoded.first_result().and_then(|e| e.name()), Some("web1"));
    }

    #[test]
    fn rejects_other_roots() {
        assert!(Response::from_envelope(&XmlNode::new("html")).is_err());
    }

    #[test]
    fn only_config_changes_are_mutating() {
        assert!(Action::Edit.is_mutating());
        assert!(Action::Commit.is_mutating());
        assert!(!Action::Get.is_mutating());
        assert!(!Action::Op.is_mutating());
    }
}
