//! Category forest.
//!
//! Categories reference their parent by id. Nothing stops a parent chain from
//! looping back on itself, so every walk here keeps a visited set and visits
//! each category at most once.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

/// Minimal view of a category needed to build the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,
    pub name: String,
}

impl CategoryNode {
    /// Create a node.
    #[must_use]
    pub fn new(id: CategoryId, parent_id: Option<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
        }
    }
}

/// A category with its children, sorted by name at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTree {
    pub node: CategoryNode,
    pub children: Vec<CategoryTree>,
}

/// Indexed set of categories supporting parent/child lookups.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    nodes: HashMap<CategoryId, CategoryNode>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
}

impl CategoryIndex {
    /// Build an index from a flat list of categories.
    ///
    /// Child lists are sorted by name, then id, so traversal order is stable.
    #[must_use]
    pub fn new(categories: impl IntoIterator<Item = CategoryNode>) -> Self {
        let nodes: HashMap<CategoryId, CategoryNode> =
            categories.into_iter().map(|c| (c.id, c)).collect();

        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node.id);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| {
                let name_a = nodes.get(a).map(|n| n.name.as_str());
                let name_b = nodes.get(b).map(|n| n.name.as_str());
                name_a.cmp(&name_b).then(a.cmp(b))
            });
        }

        Self { nodes, children }
    }

    /// Look up a category.
    #[must_use]
    pub fn get(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.nodes.get(&id)
    }

    /// Number of categories in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a category, sorted by name.
    #[must_use]
    pub fn children_of(&self, id: CategoryId) -> &[CategoryId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// The category itself plus every category below it.
    ///
    /// Uses an explicit stack and a visited set, so a parent cycle ends the
    /// walk instead of looping. An unknown id yields a set containing only
    /// that id.
    #[must_use]
    pub fn descendants_of(&self, root: CategoryId) -> BTreeSet<CategoryId> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            stack.extend(
                self.children_of(id)
                    .iter()
                    .copied()
                    .filter(|child| !visited.contains(child)),
            );
        }

        visited
    }

    /// `"Parent → Child"` when the category has a known parent, otherwise its name.
    #[must_use]
    pub fn display_name(&self, id: CategoryId) -> Option<String> {
        let node = self.nodes.get(&id)?;
        let parent = node
            .parent_id
            .filter(|p| *p != id)
            .and_then(|p| self.nodes.get(&p));
        Some(match parent {
            Some(parent) => format!("{} → {}", parent.name, node.name),
            None => node.name.clone(),
        })
    }

    /// Categories without a (known) parent, sorted by name.
    #[must_use]
    pub fn roots(&self) -> Vec<CategoryId> {
        let mut roots: Vec<&CategoryNode> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.is_none_or(|p| !self.nodes.contains_key(&p)))
            .collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        roots.into_iter().map(|n| n.id).collect()
    }

    /// Build the category forest for navigation.
    ///
    /// Categories caught in a parent cycle with no path to a root do not
    /// appear in the forest.
    #[must_use]
    pub fn forest(&self) -> Vec<CategoryTree> {
        let mut visited = HashSet::new();
        self.roots()
            .into_iter()
            .filter_map(|id| self.subtree(id, &mut visited))
            .collect()
    }

    fn subtree(&self, id: CategoryId, visited: &mut HashSet<CategoryId>) -> Option<CategoryTree> {
        if !visited.insert(id) {
            return None;
        }
        let node = self.nodes.get(&id)?.clone();
        let children = self
            .children_of(id)
            .iter()
            .filter_map(|child| self.subtree(*child, visited))
            .collect();
        Some(CategoryTree { node, children })
    }

    /// Depth-first listing of the forest as `(id, depth, name)`, for select boxes.
    #[must_use]
    pub fn flatten(&self) -> Vec<(CategoryId, usize, String)> {
        fn walk(tree: &CategoryTree, depth: usize, out: &mut Vec<(CategoryId, usize, String)>) {
            out.push((tree.node.id, depth, tree.node.name.clone()));
            for child in &tree.children {
                walk(child, depth + 1, out);
            }
        }

        let mut out = Vec::with_capacity(self.nodes.len());
        for tree in self.forest() {
            walk(&tree, 0, &mut out);
        }
        out
    }
}
