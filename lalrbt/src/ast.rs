//! Arena-allocated syntax trees.
//!
//! All nodes of one parse live in an [`Ast`] and are addressed by
//! [`NodeId`]. Children and parents are plain ids, so a tree has no owning
//! edges at all and is released as a whole when the arena is dropped.
//!
//! A node's children may contain `None` placeholders for optional
//! sub-rules that matched nothing. [`Ast::all_children`] keeps them,
//! [`Ast::children`] filters them out.
//!
//! List nodes collect the elements of recursive rules. A left-recursive
//! rule (`List -> List Item`) appends in source order. A right-recursive
//! rule (`List -> Item List`) reduces the last element first, so it builds a
//! [`ListOrder::Reversed`] list; [`Ast::ordered_elements`] flips it into
//! source order the first time it is called and is a no-op afterwards.
//! Read-only accessors always present source order.

use crate::TokenRange;
use std::fmt;

/// Index of a node in its [`Ast`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The id for arena slot `index`, if it fits the 32-bit id space.
    fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(NodeId)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage order of a list node's elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ListOrder {
    #[default]
    Source,
    Reversed,
}

/// One node of an [`Ast`].
///
/// # Fields
/// - `kind`: the caller's node kind, usually one variant per grammar rule.
/// - `range`: the tokens the node covers, half open. An empty rule yields a
///   zero-width range at the token that followed it.
/// - `parent`: set when the node is adopted by a parent or a list.
/// - `children`: child ids in source order. `None` marks an optional part
///   that matched nothing.
/// - `list`: the storage order if the node is a list.
/// - `token`: the token index of a leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node<K> {
    kind: K,
    range: TokenRange,
    parent: Option<NodeId>,
    children: Vec<Option<NodeId>>,
    list: Option<ListOrder>,
    token: Option<usize>,
}

impl<K: Copy> Node<K> {
    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn range(&self) -> TokenRange {
        self.range
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The token of a token leaf.
    pub fn token(&self) -> Option<usize> {
        self.token
    }

    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }
}

/// Hooks called by [`Ast::accept`].
///
/// For each node: `pre_visit`; if that returns `true`, `visit`, then the
/// children left to right if `visit` returned `true`, then `end_visit` and
/// `post_visit`.
pub trait Visitor<K> {
    fn pre_visit(&mut self, _ast: &Ast<K>, _node: NodeId) -> bool {
        true
    }

    fn visit(&mut self, _ast: &Ast<K>, _node: NodeId) -> bool {
        true
    }

    fn end_visit(&mut self, _ast: &Ast<K>, _node: NodeId) {}

    fn post_visit(&mut self, _ast: &Ast<K>, _node: NodeId) {}
}

/// An arena of [`Node`]s.
///
/// # Overview
/// Nodes are only ever added; ids stay valid for the lifetime of the arena
/// and index straight into it. Semantic actions add the children of a rule
/// before the rule itself, so a parent's id is always larger than its
/// children's.
///
/// # Panics
/// Ids are 32 bits wide. Adding a node to an arena that already holds
/// `u32::MAX + 1` nodes panics.
#[derive(Clone, Debug)]
pub struct Ast<K> {
    nodes: Vec<Node<K>>,
}

impl<K> Default for Ast<K> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<K: Copy> Ast<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn push(&mut self, node: Node<K>) -> NodeId {
        let Some(id) = NodeId::from_index(self.nodes.len()) else {
            panic!("syntax tree arena is full ({} nodes)", self.nodes.len());
        };
        self.nodes.push(node);
        id
    }

    /// Adds an interior node and makes it the parent of its present children.
    pub fn new_node<I>(&mut self, kind: K, range: TokenRange, children: I) -> NodeId
    where
        I: IntoIterator<Item = Option<NodeId>>,
    {
        let children: Vec<Option<NodeId>> = children.into_iter().collect();
        let id = self.push(Node {
            kind,
            range,
            parent: None,
            children,
            list: None,
            token: None,
        });
        for child in self.nodes[id.index()].children.clone().into_iter().flatten() {
            self.nodes[child.index()].parent = Some(id);
        }
        id
    }

    /// Adds a leaf for token `index`.
    pub fn new_token(&mut self, kind: K, index: usize) -> NodeId {
        self.push(Node {
            kind,
            range: TokenRange::token(index),
            parent: None,
            children: Vec::new(),
            list: None,
            token: Some(index),
        })
    }

    /// Adds an empty list covering `range`.
    pub fn new_list(&mut self, kind: K, order: ListOrder, range: TokenRange) -> NodeId {
        self.push(Node {
            kind,
            range,
            parent: None,
            children: Vec::new(),
            list: Some(order),
            token: None,
        })
    }

    /// Appends `element` to the storage of `list` and widens its range.
    pub fn list_push(&mut self, list: NodeId, element: NodeId) {
        let element_range = self.nodes[element.index()].range;
        self.nodes[element.index()].parent = Some(list);
        let node = &mut self.nodes[list.index()];
        node.range = if node.children.is_empty() && node.range.is_empty() {
            element_range
        } else {
            node.range.cover(&element_range)
        };
        node.children.push(Some(element));
    }

    /// Puts the elements of `list` in source order, flipping a reversed
    /// list once.
    pub fn ordered_elements(&mut self, list: NodeId) -> &[Option<NodeId>] {
        let node = &mut self.nodes[list.index()];
        if node.list == Some(ListOrder::Reversed) {
            node.children.reverse();
            node.list = Some(ListOrder::Source);
        }
        &node.children
    }

    pub fn list_order(&self, id: NodeId) -> Option<ListOrder> {
        self.nodes[id.index()].list
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<K> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> K {
        self.nodes[id.index()].kind
    }

    #[inline]
    pub fn range(&self, id: NodeId) -> TokenRange {
        self.nodes[id.index()].range
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn token(&self, id: NodeId) -> Option<usize> {
        self.nodes[id.index()].token
    }

    pub fn left_token(&self, id: NodeId) -> usize {
        self.range(id).left_token()
    }

    pub fn right_token(&self, id: NodeId) -> Option<usize> {
        self.range(id).right_token()
    }

    /// Children in source order, `None` for absent optional parts.
    pub fn all_children(&self, id: NodeId) -> Vec<Option<NodeId>> {
        let node = &self.nodes[id.index()];
        match node.list {
            Some(ListOrder::Reversed) => node.children.iter().rev().copied().collect(),
            _ => node.children.clone(),
        }
    }

    /// Present children in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.all_children(id).into_iter().flatten().collect()
    }

    /// The `i`-th child slot, in source order.
    pub fn child(&self, id: NodeId, i: usize) -> Option<NodeId> {
        self.all_children(id).get(i).copied().flatten()
    }

    /// Walks the tree under `root` depth first, left to right.
    pub fn accept<V: Visitor<K> + ?Sized>(&self, root: NodeId, visitor: &mut V) {
        enum Walk {
            Enter(NodeId),
            Exit(NodeId),
        }
        let mut stack = vec![Walk::Enter(root)];
        while let Some(step) = stack.pop() {
            match step {
                Walk::Enter(id) => {
                    if !visitor.pre_visit(self, id) {
                        continue;
                    }
                    stack.push(Walk::Exit(id));
                    if visitor.visit(self, id) {
                        stack.extend(self.children(id).into_iter().rev().map(Walk::Enter));
                    }
                }
                Walk::Exit(id) => {
                    visitor.end_visit(self, id);
                    visitor.post_visit(self, id);
                }
            }
        }
    }

    /// Ids of `root` and its descendants, in pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        struct Collect(Vec<NodeId>);
        impl<K> Visitor<K> for Collect {
            fn visit(&mut self, _: &Ast<K>, node: NodeId) -> bool {
                self.0.push(node);
                true
            }
        }
        let mut collect = Collect(Vec::new());
        self.accept(root, &mut collect);
        collect.0
    }
}
