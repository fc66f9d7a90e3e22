//! The address syntax used to point at elements of a configuration document.
//!
//! Only the subset devices actually speak is supported: `/`-separated element
//! steps, each with an optional identity predicate on one attribute, e.g.
//! `entry[@name='web1']` or, for bulk deletes,
//! `entry[@name='a' or @name='b']`. Literals are single- or double-quoted, or a
//! `concat(...)` of quoted parts when a value holds both quote characters.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::XmlNode;

/// Errors raised while parsing or applying an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    #[error("empty xpath")]
    Empty,
    #[error("invalid xpath {path:?}: {reason}")]
    Syntax { path: String, reason: String },
    #[error("xpath starts at <{expected}> but the document root is <{found}>")]
    RootMismatch { expected: String, found: String },
    #[error("cannot create element for multi-valued step {0}")]
    Ambiguous(String),
}

/// Identity filter on a step: `[@attr='v1' or @attr='v2']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub attribute: String,
    pub values: Vec<String>,
}

/// One element step of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub tag: String,
    pub predicate: Option<Predicate>,
}

impl Step {
    /// A plain element step.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            predicate: None,
        }
    }

    /// An `entry[@name='...']`-style step.
    pub fn named(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            predicate: Some(Predicate {
                attribute: "name".to_string(),
                values: vec![name.into()],
            }),
        }
    }

    /// True if `node` is selected by this step.
    pub fn matches(&self, node: &XmlNode) -> bool {
        if node.tag != self.tag {
            return false;
        }
        match &self.predicate {
            None => true,
            Some(pred) => node
                .attributes
                .get(&pred.attribute)
                .is_some_and(|value| pred.values.iter().any(|v| v == value)),
        }
    }

    fn to_node(&self) -> Result<XmlNode, XPathError> {
        let mut node = XmlNode::new(self.tag.as_str());
        if let Some(pred) = &self.predicate {
            let [value] = pred.values.as_slice() else {
                return Err(XPathError::Ambiguous(self.to_string()));
            };
            node.attributes
                .insert(pred.attribute.clone(), value.clone());
        }
        Ok(node)
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(pred) = &self.predicate {
            let clauses: Vec<String> = pred
                .values
                .iter()
                .map(|v| format!("@{}={}", pred.attribute, quote_literal(v)))
                .collect();
            write!(f, "[{}]", clauses.join(" or "))?;
        }
        Ok(())
    }
}

/// A parsed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

impl XPath {
    /// Parse an address string.
    pub fn parse(input: &str) -> Result<Self, XPathError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Err(XPathError::Empty);
        }
        let absolute = trimmed.starts_with('/');
        let body = trimmed.trim_start_matches('/');

        let mut steps = Vec::new();
        for raw in split_steps(body, input)? {
            steps.push(parse_step(raw, input)?);
        }
        Ok(Self { absolute, steps })
    }

    /// The address of the enclosing element, or `None` for a single step.
    pub fn parent(&self) -> Option<XPath> {
        if self.steps.len() < 2 {
            return None;
        }
        Some(Self {
            absolute: self.absolute,
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    /// Last step of the address.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Append a step, returning the extended address.
    pub fn join(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// All elements selected by this address, in document order.
    pub fn select<'a>(&self, root: &'a XmlNode) -> Vec<&'a XmlNode> {
        let mut current: Vec<&XmlNode> = vec![root];
        let mut steps = self.steps.iter();
        if self.absolute {
            match steps.next() {
                Some(first) if first.matches(root) => {}
                _ => return Vec::new(),
            }
        }
        for step in steps {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(|c| step.matches(c)))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First element selected by this address.
    pub fn select_first<'a>(&self, root: &'a XmlNode) -> Option<&'a XmlNode> {
        self.select(root).into_iter().next()
    }

    /// Mutable access to the first element selected by this address.
    pub fn select_mut<'a>(&self, root: &'a mut XmlNode) -> Option<&'a mut XmlNode> {
        let mut steps = self.steps.iter();
        if self.absolute {
            match steps.next() {
                Some(first) if first.matches(root) => {}
                _ => return None,
            }
        }
        let mut current = root;
        for step in steps {
            current = current.children.iter_mut().find(|c| step.matches(c))?;
        }
        Some(current)
    }

    /// Mutable access to the addressed element, creating missing elements on
    /// the way. Created steps carry their predicate attribute.
    pub fn ensure_mut<'a>(&self, root: &'a mut XmlNode) -> Result<&'a mut XmlNode, XPathError> {
        let mut steps = self.steps.iter();
        if self.absolute {
            let first = steps.next().ok_or(XPathError::Empty)?;
            if !first.matches(root) {
                return Err(XPathError::RootMismatch {
                    expected: first.tag.clone(),
                    found: root.tag.clone(),
                });
            }
        }
        let mut current = root;
        for step in steps {
            let idx = match current.children.iter().position(|c| step.matches(c)) {
                Some(idx) => idx,
                None => {
                    current.children.push(step.to_node()?);
                    current.children.len() - 1
                }
            };
            current = &mut current.children[idx];
        }
        Ok(current)
    }

    /// Detach every element selected by the last step and return them.
    pub fn remove_all(&self, root: &mut XmlNode) -> Vec<XmlNode> {
        let (Some(parent), Some(last)) = (self.parent(), self.last()) else {
            return Vec::new();
        };
        let Some(container) = parent.select_mut(root) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<XmlNode>, Vec<XmlNode>) = std::mem::take(&mut container.children)
            .into_iter()
            .partition(|c| last.matches(c));
        container.children = kept;
        removed
    }
}

impl Display for XPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if self.absolute || idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Quote a value for use inside a predicate.
///
/// Single quotes are preferred; values containing `'` use double quotes, and
/// values containing both fall back to `concat()`.
pub fn quote_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn syntax(path: &str, reason: impl Into<String>) -> XPathError {
    XPathError::Syntax {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Split on `/` outside of brackets and quotes.
fn split_steps<'a>(body: &'a str, input: &str) -> Result<Vec<&'a str>, XPathError> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| syntax(input, "unbalanced ']'"))?;
            }
            (None, '/') if depth == 0 => {
                steps.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(syntax(input, "unterminated predicate"));
    }
    steps.push(&body[start..]);
    if steps.iter().any(|s| s.is_empty()) {
        return Err(syntax(input, "empty step"));
    }
    Ok(steps)
}

fn parse_step(raw: &str, input: &str) -> Result<Step, XPathError> {
    let Some(open) = raw.find('[') else {
        return Ok(Step::element(raw));
    };
    let tag = &raw[..open];
    let inner = raw[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| syntax(input, format!("step {raw:?} has trailing text")))?;
    if tag.is_empty() {
        return Err(syntax(input, "predicate without element name"));
    }

    let mut attribute: Option<String> = None;
    let mut values = Vec::new();
    for clause in split_or(inner) {
        let clause = clause.trim();
        let (attr, literal) = clause
            .strip_prefix('@')
            .and_then(|c| c.split_once('='))
            .ok_or_else(|| syntax(input, format!("unsupported predicate {clause:?}")))?;
        let attr = attr.trim();
        match &attribute {
            Some(existing) if existing != attr => {
                return Err(syntax(input, "predicate mixes attributes"));
            }
            Some(_) => {}
            None => attribute = Some(attr.to_string()),
        }
        values.push(parse_literal(literal.trim(), input)?);
    }

    Ok(Step {
        tag: tag.to_string(),
        predicate: attribute.map(|attribute| Predicate { attribute, values }),
    })
}

/// Split predicate clauses on ` or ` outside of quotes.
fn split_or(inner: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = inner.as_bytes();
    for (idx, ch) in inner.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ' ') if depth == 0 && bytes[idx..].starts_with(b" or ") => {
                clauses.push(&inner[start..idx]);
                start = idx + 4;
            }
            _ => {}
        }
    }
    clauses.push(&inner[start..]);
    clauses
}

fn parse_literal(raw: &str, input: &str) -> Result<String, XPathError> {
    if let Some(args) = raw
        .strip_prefix("concat(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut out = String::new();
        for part in split_concat_args(args) {
            out.push_str(&parse_quoted(part.trim(), input)?);
        }
        return Ok(out);
    }
    parse_quoted(raw, input)
}

fn parse_quoted(raw: &str, input: &str) -> Result<String, XPathError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('\'' | '"')), Some(close)) if open == close && raw.len() >= 2 => {
            Ok(raw[1..raw.len() - 1].to_string())
        }
        _ => Err(syntax(input, format!("expected quoted literal, got {raw:?}"))),
    }
}

fn split_concat_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in args.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ',') => {
                parts.push(&args[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::{quote_literal, XPath, XPathError};
    use crate::parse_str;

    #[test]
    fn parses_and_renders_named_steps() {
        let raw = "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']";
        let path = XPath::parse(raw).expect("parse");
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 5);
        assert_eq!(path.to_string(), raw);
    }

    #[test]
    fn quoting_round_trips_awkward_names() {
        for name in ["plain", "it's", r#"say "hi""#, r#"both ' and ""#] {
            let raw = format!("/a/entry[@name={}]", quote_literal(name));
            let path = XPath::parse(&raw).expect("parse");
            let pred = path.steps[1].predicate.as_ref().expect("predicate");
            assert_eq!(pred.values, vec![name.to_string()], "{raw}");
        }
    }

    #[test]
    fn or_predicate_selects_several_entries() {
        let doc = parse_str(
            r#"<a><entry name="x"/><entry name="y"/><entry name="z"/></a>"#,
        )
        .expect("doc");
        let path = XPath::parse("/a/entry[@name='x' or @name='z']").expect("parse");
        let names: Vec<_> = path.select(&doc).iter().filter_map(|n| n.name()).collect();
        assert_eq!(names, vec!["x", "z"]);
    }

    #[test]
    fn ensure_creates_missing_steps_with_identity() {
        let mut doc = parse_str("<config/>").expect("doc");
        let path = XPath::parse("/config/shared/address/entry[@name='web1']").expect("parse");
        path.ensure_mut(&mut doc).expect("ensure");

        let entry = path.select_first(&doc).expect("created");
        assert_eq!(entry.name(), Some("web1"));
    }

    #[test]
    fn ensure_refuses_multi_valued_step() {
        let mut doc = parse_str("<config/>").expect("doc");
        let path = XPath::parse("/config/entry[@name='a' or @name='b']").expect("parse");
        assert!(matches!(
            path.ensure_mut(&mut doc),
            Err(XPathError::Ambiguous(_))
        ));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(XPath::parse("  "), Err(XPathError::Empty));
        assert!(XPath::parse("/a//b").is_err());
        assert!(XPath::parse("/a/entry[@name='x'").is_err());
        assert!(XPath::parse("/a/entry[name='x']").is_err());
    }
}
