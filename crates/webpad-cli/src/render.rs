use webpad_core::{OpenTab, TreeIndex, TreeNode};

/// Indented listing of the tree. Children of collapsed folders are hidden.
pub fn render_tree(tree: &TreeIndex) -> String {
    let mut out = String::new();
    for node in tree.roots() {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    if node.is_folder() {
        let marker = if node.is_open { '-' } else { '+' };
        out.push_str(&format!("{indent}{marker} {}/  [{}]\n", node.name, node.id));
        if node.is_open {
            for child in node.children() {
                render_node(child, depth + 1, out);
            }
        }
    } else {
        out.push_str(&format!("{indent}  {}  [{}]\n", node.name, node.id));
    }
}

pub fn render_tabs(tabs: &[OpenTab], active_id: Option<&str>) -> String {
    if tabs.is_empty() {
        return "no open tabs\n".to_string();
    }
    tabs.iter()
        .map(|tab| {
            let active = if Some(tab.id.as_str()) == active_id {
                '*'
            } else {
                ' '
            };
            let dirty = if tab.is_dirty { " (modified)" } else { "" };
            format!(
                "{active} {}  [{}] {}{dirty}\n",
                tab.name, tab.id, tab.file_type
            )
        })
        .collect()
}
