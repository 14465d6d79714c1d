//! Addressable, mutable mirror of the project tree.

use crate::TreeNode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeIndex {
    roots: Vec<TreeNode>,
}

impl TreeIndex {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<TreeNode> {
        self.roots
    }

    /// Swaps in a freshly fetched tree. Nothing from the previous tree
    /// survives, so references taken before the call must be resolved again.
    pub fn replace(&mut self, roots: Vec<TreeNode>) {
        self.roots = roots;
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        find_in(&self.roots, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        find_in_mut(&mut self.roots, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Total number of nodes at every depth.
    pub fn len(&self) -> usize {
        fn count(nodes: &[TreeNode]) -> usize {
            nodes
                .iter()
                .map(|node| 1 + count(node.children()))
                .sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Flips the expand flag of a folder. Returns false, leaving the tree
    /// untouched, when `id` is unknown or names a file.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(node) if node.is_folder() => {
                node.is_open = !node.is_open;
                true
            }
            _ => false,
        }
    }

    /// Appends `node` under `parent_id`, or at the root when no parent is
    /// given. The parent is forced open. Returns false when the parent does
    /// not resolve to a folder.
    pub fn insert(&mut self, node: TreeNode, parent_id: Option<&str>) -> bool {
        let Some(parent_id) = parent_id else {
            self.roots.push(node);
            return true;
        };
        match self.find_mut(parent_id) {
            Some(parent) if parent.is_folder() => {
                parent.children.get_or_insert_with(Vec::new).push(node);
                parent.is_open = true;
                true
            }
            _ => false,
        }
    }

    /// Detaches the node and its whole subtree.
    pub fn remove(&mut self, id: &str) -> Option<TreeNode> {
        remove_from(&mut self.roots, id)
    }

    /// Mirrors saved content into a file node.
    pub fn set_content(&mut self, id: &str, content: &str) -> bool {
        match self.find_mut(id) {
            Some(node) if node.is_file() => {
                node.content = Some(content.to_string());
                true
            }
            _ => false,
        }
    }

    /// Ids of every file in the subtree rooted at `id`, including `id` itself
    /// when it is a file.
    pub fn file_ids_under(&self, id: &str) -> Vec<String> {
        let mut ids = Vec::new();
        if let Some(node) = self.find(id) {
            collect_file_ids(node, &mut ids);
        }
        ids
    }
}

fn find_in<'a>(nodes: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in(node.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(nodes: &'a mut [TreeNode], id: &str) -> Option<&'a mut TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(children) = node.children.as_deref_mut() {
            if let Some(found) = find_in_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_from(nodes: &mut Vec<TreeNode>, id: &str) -> Option<TreeNode> {
    if let Some(idx) = nodes.iter().position(|node| node.id == id) {
        return Some(nodes.remove(idx));
    }
    nodes
        .iter_mut()
        .filter_map(|node| node.children.as_mut())
        .find_map(|children| remove_from(children, id))
}

fn collect_file_ids(node: &TreeNode, ids: &mut Vec<String>) {
    if node.is_file() {
        ids.push(node.id.clone());
        return;
    }
    for child in node.children() {
        collect_file_ids(child, ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;

    fn sample() -> TreeIndex {
        TreeIndex::new(vec![
            TreeNode::folder(
                "src",
                "src",
                vec![
                    TreeNode::file("index.html", "index.html", FileType::Html, "<h1></h1>"),
                    TreeNode::folder(
                        "lib",
                        "lib",
                        vec![TreeNode::file("util.js", "util.js", FileType::Js, "")],
                    ),
                ],
            )
            .with_open(true),
            TreeNode::file("readme.html", "readme.html", FileType::Html, ""),
        ])
    }

    #[test]
    fn find_searches_nested_folders() {
        let tree = sample();
        assert_eq!(tree.find("util.js").map(|n| n.name.as_str()), Some("util.js"));
        assert!(tree.find("missing").is_none());
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn toggle_only_affects_folders() {
        let mut tree = sample();
        assert!(tree.toggle("src"));
        assert!(!tree.find("src").expect("src").is_open);
        assert!(!tree.toggle("index.html"));
        assert!(!tree.toggle("missing"));
    }

    #[test]
    fn insert_creates_children_and_opens_parent() {
        let mut tree = TreeIndex::new(vec![TreeNode {
            children: None,
            ..TreeNode::folder("empty", "empty", Vec::new())
        }]);
        let node = TreeNode::file("a.css", "a.css", FileType::Css, "");

        assert!(tree.insert(node.clone(), Some("empty")));
        let parent = tree.find("empty").expect("parent");
        assert!(parent.is_open);
        assert_eq!(parent.children().len(), 1);

        assert!(!tree.insert(node.clone(), Some("a.css")));
        assert!(tree.insert(node, None));
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn replace_drops_previous_nodes() {
        let mut tree = sample();
        tree.replace(vec![TreeNode::file("new.js", "new.js", FileType::Js, "")]);
        assert!(!tree.contains("index.html"));
        assert!(tree.contains("new.js"));
    }

    #[test]
    fn file_ids_under_walks_every_depth() {
        let tree = sample();
        let mut ids = tree.file_ids_under("src");
        ids.sort();
        assert_eq!(ids, vec!["index.html".to_string(), "util.js".to_string()]);
        assert_eq!(tree.file_ids_under("readme.html"), vec!["readme.html".to_string()]);
        assert!(tree.file_ids_under("missing").is_empty());
    }

    #[test]
    fn remove_and_set_content() {
        let mut tree = sample();
        assert!(tree.set_content("util.js", "export {}"));
        assert_eq!(
            tree.find("util.js").and_then(|n| n.content.as_deref()),
            Some("export {}")
        );
        assert!(!tree.set_content("lib", "nope"));

        let removed = tree.remove("lib").expect("removed");
        assert_eq!(removed.children().len(), 1);
        assert!(!tree.contains("util.js"));
    }
}
