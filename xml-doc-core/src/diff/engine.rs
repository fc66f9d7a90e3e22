use std::collections::HashSet;

use crate::diff::result::DiffEntry;
use crate::xpath::quote_literal;
use crate::XmlNode;

/// Configures tree diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Include [`DiffEntry::Identical`] rows.
    pub include_identical: bool,
    /// Maximum recursion depth below the root. `None` means unlimited.
    pub max_depth: Option<usize>,
    /// Attribute used to pair repeated siblings, e.g. `name` for
    /// `entry[@name=...]` collections. Siblings fall back to positional
    /// matching when any of them lacks the attribute.
    pub key_attribute: Option<String>,
    /// Element tags skipped entirely.
    pub ignore_tags: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_identical: false,
            max_depth: None,
            key_attribute: Some("name".to_string()),
            ignore_tags: Vec::new(),
        }
    }
}

/// Diff two XML trees with default options.
pub fn diff(old: &XmlNode, new: &XmlNode) -> Vec<DiffEntry> {
    diff_with_options(old, new, &DiffOptions::default())
}

/// Diff two XML trees with custom options.
pub fn diff_with_options(old: &XmlNode, new: &XmlNode, opts: &DiffOptions) -> Vec<DiffEntry> {
    let mut walker = Walker { opts, out: Vec::new() };
    let root_path = format!("/{}", label(old, opts, None));
    walker.node(old, new, &root_path, 0);
    walker.out
}

struct Walker<'a> {
    opts: &'a DiffOptions,
    out: Vec<DiffEntry>,
}

impl Walker<'_> {
    fn node(&mut self, old: &XmlNode, new: &XmlNode, path: &str, depth: usize) {
        if self.opts.max_depth.is_some_and(|max| depth > max) {
            return;
        }

        if old.tag != new.tag {
            self.out.push(DiffEntry::Structural {
                path: path.to_string(),
                description: format!("tag mismatch: old='{}' new='{}'", old.tag, new.tag),
            });
            return;
        }

        let start_len = self.out.len();
        if old.attributes != new.attributes || normalize_text(&old.text) != normalize_text(&new.text)
        {
            self.out.push(DiffEntry::Modified {
                path: path.to_string(),
                old: signature(old),
                new: signature(new),
            });
        }

        self.children(old, new, path, depth);

        let unchanged = self.out[start_len..].iter().all(|e| !e.is_change());
        if self.opts.include_identical && unchanged {
            self.out.push(DiffEntry::Identical {
                path: path.to_string(),
            });
        }
    }

    fn children(&mut self, old: &XmlNode, new: &XmlNode, path: &str, depth: usize) {
        let opts = self.opts;
        let mut tags: Vec<&str> = Vec::new();
        for child in old.children.iter().chain(&new.children) {
            if !tags.contains(&child.tag.as_str()) {
                tags.push(&child.tag);
            }
        }

        for tag in tags {
            if opts.ignore_tags.iter().any(|t| t == tag) {
                continue;
            }
            let olds: Vec<&XmlNode> = old.children.iter().filter(|n| n.tag == tag).collect();
            let news: Vec<&XmlNode> = new.children.iter().filter(|n| n.tag == tag).collect();

            let keyed = opts.key_attribute.as_deref().filter(|attr| {
                olds.iter()
                    .chain(&news)
                    .all(|n| n.attributes.contains_key(*attr))
            });
            match keyed {
                Some(attr) => self.pair_by_key(attr, &olds, &news, path, depth),
                None => self.pair_by_position(&olds, &news, path, depth),
            }
        }
    }

    fn pair_by_key(
        &mut self,
        attr: &str,
        olds: &[&XmlNode],
        news: &[&XmlNode],
        parent: &str,
        depth: usize,
    ) {
        let mut used = HashSet::new();
        for old in olds {
            let path = format!("{parent}/{}", label(old, self.opts, None));
            let key = old.attributes.get(attr);
            let matched = news
                .iter()
                .enumerate()
                .find(|(idx, n)| !used.contains(idx) && n.attributes.get(attr) == key);
            match matched {
                Some((idx, new)) => {
                    used.insert(idx);
                    self.node(old, new, &path, depth + 1);
                }
                None => self.out.push(DiffEntry::Removed {
                    path,
                    node: (*old).clone(),
                }),
            }
        }
        for (idx, new) in news.iter().enumerate() {
            if used.contains(&idx) {
                continue;
            }
            self.out.push(DiffEntry::Added {
                path: format!("{parent}/{}", label(new, self.opts, None)),
                node: (*new).clone(),
            });
        }
    }

    fn pair_by_position(
        &mut self,
        olds: &[&XmlNode],
        news: &[&XmlNode],
        parent: &str,
        depth: usize,
    ) {
        let single = olds.len() <= 1 && news.len() <= 1;
        for i in 0..olds.len().max(news.len()) {
            let index = if single { None } else { Some(i + 1) };
            match (olds.get(i), news.get(i)) {
                (Some(old), Some(new)) => {
                    let path = format!("{parent}/{}", label(old, self.opts, index));
                    self.node(old, new, &path, depth + 1);
                }
                (Some(old), None) => self.out.push(DiffEntry::Removed {
                    path: format!("{parent}/{}", label(old, self.opts, index)),
                    node: (*old).clone(),
                }),
                (None, Some(new)) => self.out.push(DiffEntry::Added {
                    path: format!("{parent}/{}", label(new, self.opts, index)),
                    node: (*new).clone(),
                }),
                (None, None) => {}
            }
        }
    }
}

/// `tag`, `tag[@name='x']` or `tag[3]`.
fn label(node: &XmlNode, opts: &DiffOptions, index: Option<usize>) -> String {
    let key = opts
        .key_attribute
        .as_deref()
        .and_then(|attr| node.attributes.get(attr).map(|v| (attr, v)));
    match (key, index) {
        (Some((attr, value)), _) => format!("{}[@{attr}={}]", node.tag, quote_literal(value)),
        (None, Some(i)) => format!("{}[{i}]", node.tag),
        (None, None) => node.tag.clone(),
    }
}

fn normalize_text(input: &Option<String>) -> Option<&str> {
    input.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn signature(node: &XmlNode) -> String {
    format!(
        "attributes={:?}, text={:?}",
        node.attributes,
        normalize_text(&node.text)
    )
}
