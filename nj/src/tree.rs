/// A node in a (bifurcating) phylogenetic tree.
/// Can be either a leaf node (no children) or an internal node (two children).
/// `len` is the length of the branch to the parent.
/// Leaf nodes represent taxa, internal nodes the joins made by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub children: Option<[Box<TreeNode>; 2]>,
    pub len: f64,
}

impl TreeNode {
    /// Creates a leaf node with the given name.
    pub fn leaf(name: String, len: Option<f64>) -> Self {
        Self {
            name,
            children: None,
            len: len.unwrap_or(0.0),
        }
    }

    /// Creates an internal node over two children.
    pub fn internal(name: String, children: [Box<TreeNode>; 2], len: f64) -> Self {
        Self {
            name,
            children: Some(children),
            len,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Exports the subtree in Newick format.
    ///
    /// Branch lengths are printed with `decimals` fractional digits.
    /// If `hide_internal` is true, internal node names are omitted from the output.
    pub fn to_newick(&self, hide_internal: bool, decimals: usize) -> String {
        match &self.children {
            Some([left, right]) => {
                let left_str = left.to_newick(hide_internal, decimals);
                let right_str = right.to_newick(hide_internal, decimals);
                let name_str = if hide_internal { "" } else { self.name.as_str() };
                format!(
                    "({}:{:.*},{}:{:.*}){}",
                    left_str, decimals, left.len, right_str, decimals, right.len, name_str
                )
            }
            None => self.name.clone(),
        }
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a TreeNode)) {
        f(self);
        if let Some([left, right]) = &self.children {
            left.visit(f);
            right.visit(f);
        }
    }
}

/// Result of a run: a binary tree whose root has exactly two children.
///
/// Trees produced by the engine are unrooted; the root only records where the
/// last join happened, and its two children are interchangeable.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    root: TreeNode,
    rooted: bool,
}

impl Tree {
    pub fn new(root: TreeNode, rooted: bool) -> Self {
        Self { root, rooted }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    /// Newick string terminated with `;`.
    pub fn to_newick(&self, hide_internal: bool, decimals: usize) -> String {
        format!("{};", self.root.to_newick(hide_internal, decimals))
    }

    /// Leaf names in left-to-right order.
    pub fn leaf_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.root.visit(&mut |n| {
            if n.is_leaf() {
                names.push(n.name.as_str());
            }
        });
        names
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_names().len()
    }

    /// Internal nodes, root included.
    pub fn internal_count(&self) -> usize {
        let mut count = 0;
        self.root.visit(&mut |n| {
            if !n.is_leaf() {
                count += 1;
            }
        });
        count
    }

    /// Every non-root node paired with the length of its parent branch.
    pub fn edges(&self) -> Vec<(&TreeNode, f64)> {
        let mut edges = Vec::new();
        if let Some(children) = &self.root.children {
            for child in children.iter() {
                child.visit(&mut |n| edges.push((n, n.len)));
            }
        }
        edges
    }
}

/// Holds the subtree currently occupying each storage slot and joins them
/// pairwise until only the root is left.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Option<TreeNode>>,
    next_internal: usize,
}

impl TreeBuilder {
    /// One leaf per label, in slot order.
    pub fn new(labels: &[String]) -> Self {
        Self {
            nodes: labels
                .iter()
                .map(|name| Some(TreeNode::leaf(name.clone(), None)))
                .collect(),
            next_internal: labels.len(),
        }
    }

    fn take(&mut self, slot: usize, len: f64) -> TreeNode {
        let mut node = self.nodes[slot]
            .take()
            .unwrap_or_else(|| panic!("slot {slot} was already joined"));
        node.len = len;
        node
    }

    fn next_name(&mut self) -> String {
        let name = format!("Node{}", self.next_internal);
        self.next_internal += 1;
        name
    }

    /// Joins the subtrees in slots `i` and `j` under a new internal node,
    /// which takes over slot `i`.
    ///
    /// # Panics
    /// Panics if either slot has already been joined.
    pub fn join(&mut self, i: usize, j: usize, len_i: f64, len_j: f64) -> &TreeNode {
        let left = self.take(i, len_i);
        let right = self.take(j, len_j);
        let name = self.next_name();
        self.nodes[i].insert(TreeNode::internal(
            name,
            [Box::new(left), Box::new(right)],
            0.0,
        ))
    }

    /// Joins the last two subtrees under the root, each hanging at `len`.
    pub fn finalize_root(mut self, a: usize, b: usize, len: f64) -> Tree {
        let left = self.take(a, len);
        let right = self.take(b, len);
        let name = self.next_name();
        Tree::new(
            TreeNode::internal(name, [Box::new(left), Box::new(right)], 0.0),
            false,
        )
    }

    /// Two taxa need no iteration: both hang off the root at half the distance.
    pub fn join_pair(a: String, b: String, len: f64) -> Tree {
        Self::new(&[a, b]).finalize_root(0, 1, len)
    }
}
