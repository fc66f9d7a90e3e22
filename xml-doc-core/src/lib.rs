//! Structured-document primitives for configuration synchronization.
//!
//! The crate knows nothing about firewalls. It provides:
//!
//! - [`XmlNode`], an owned element tree with ordered children
//! - [`parse`] and [`write`] on top of `quick-xml`
//! - [`xpath`], the address syntax used to point at elements
//!   (`/config/shared/address/entry[@name='web1']`)
//! - [`diff`], a keyed tree differ used to explain what changed between two
//!   versions of the same element

pub mod diff;
pub mod format;
pub mod parser;
pub mod tree;
pub mod writer;
pub mod xpath;

pub use diff::{diff, diff_with_options, DiffEntry, DiffOptions};
pub use format::{format_json, format_summary, format_text};
pub use parser::{parse, parse_file, parse_str, ParseError};
pub use tree::XmlNode;
pub use writer::{to_string, write, write_compact, write_file, WriteError};
pub use xpath::{quote_literal, XPath, XPathError};
