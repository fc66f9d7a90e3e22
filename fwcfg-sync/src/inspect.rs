use xml_doc_core::XmlNode;

/// Render a configuration element tree down to `max_depth`.
///
/// Entries show their name, leaves their text.
pub fn render_tree(node: &XmlNode, max_depth: usize) -> String {
    let mut out = String::new();
    render_node(node, 0, max_depth, &mut out);
    out
}

fn render_node(node: &XmlNode, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let label = match node.name() {
        Some(name) => format!("{}[{name}]", node.tag),
        None => node.tag.clone(),
    };
    match node.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) if node.children.is_empty() => {
            out.push_str(&format!("{indent}{label}: {text}\n"));
        }
        _ => out.push_str(&format!("{indent}{label}\n")),
    }

    if depth >= max_depth {
        if !node.children.is_empty() {
            out.push_str(&format!("{indent}  ... {} more\n", node.children.len()));
        }
        return;
    }

    for child in &node.children {
        render_node(child, depth + 1, max_depth, out);
    }
}
