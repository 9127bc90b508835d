//! Lossless concrete syntax tree.
//!
//! Nodes live in an append-only pool owned by [`Tree`] and refer to their
//! children by [`NodeId`]. Every byte of the source belongs to exactly one
//! leaf, so concatenating the leaves in order gives the input back.

use jsp_lexer::Span;
use serde::ser::{Error as _, SerializeStruct, Serializer};
use serde::Serialize;

use crate::syntax_kind::SyntaxKind;

/// Index of a node in its tree's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: SyntaxKind,
    span: Span,
    children: Vec<NodeId>,
}

/// A parsed document: the source text plus the node pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    source: String,
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The `component` node spanning the whole input.
    pub fn root(&self) -> Node<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Concatenate the text of every leaf in document order.
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for leaf in self.root().leaves() {
            out.push_str(leaf.text());
        }
        out
    }

    /// Render named nodes as a tree-sitter style s-expression.
    pub fn to_sexp(&self) -> String {
        self.root().to_sexp()
    }

    pub fn has_errors(&self) -> bool {
        self.root()
            .descendants()
            .any(|node| node.kind() == SyntaxKind::Error)
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Node view
// ---------------------------------------------------------------------------

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> Node<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.index()]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> SyntaxKind {
        self.data().kind
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn text(&self) -> &'t str {
        let span = self.span();
        &self.tree.source[span.start..span.end]
    }

    pub fn is_named(&self) -> bool {
        self.kind().is_named()
    }

    pub fn is_leaf(&self) -> bool {
        self.data().children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| Node { tree, id })
    }

    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        self.children().filter(|child| child.is_named())
    }

    pub fn child_by_kind(&self, kind: SyntaxKind) -> Option<Node<'t>> {
        self.children().find(|child| child.kind() == kind)
    }

    pub fn children_by_kind(&self, kind: SyntaxKind) -> impl Iterator<Item = Node<'t>> + 't {
        self.children().filter(move |child| child.kind() == kind)
    }

    /// This node and everything below it, in document order.
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    pub fn leaves(&self) -> impl Iterator<Item = Node<'t>> + 't {
        self.descendants().filter(|node| node.is_leaf())
    }

    pub fn to_sexp(&self) -> String {
        enum Visit {
            Enter(NodeId),
            Exit,
        }

        let mut out = String::new();
        let mut stack = vec![Visit::Enter(self.id)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    let node = self.tree.node(id);
                    if id != self.id {
                        out.push(' ');
                    }
                    out.push('(');
                    out.push_str(node.kind().as_str());
                    stack.push(Visit::Exit);
                    let named: Vec<NodeId> =
                        node.named_children().map(|child| child.id).collect();
                    stack.extend(named.into_iter().rev().map(Visit::Enter));
                }
                Visit::Exit => out.push(')'),
            }
        }
        out
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}..{}",
            self.kind(),
            self.span().start,
            self.span().end
        )
    }
}

/// Nesting beyond which JSON output is refused instead of risking the stack.
pub const MAX_SERIALIZE_DEPTH: usize = 256;

impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Nested {
            node: *self,
            depth: 0,
        }
        .serialize(serializer)
    }
}

/// A node together with its distance from where serialization started.
struct Nested<'t> {
    node: Node<'t>,
    depth: usize,
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.depth > MAX_SERIALIZE_DEPTH {
            return Err(S::Error::custom(format!(
                "tree nesting exceeds {MAX_SERIALIZE_DEPTH} levels"
            )));
        }
        let node = self.node;
        let mut state = serializer.serialize_struct("Node", 4)?;
        state.serialize_field("kind", &node.kind())?;
        state.serialize_field("start", &node.span().start)?;
        state.serialize_field("end", &node.span().end)?;
        if node.is_leaf() {
            state.serialize_field("text", node.text())?;
            state.skip_field("children")?;
        } else {
            state.skip_field("text")?;
            let children: Vec<Nested<'_>> = node
                .children()
                .map(|child| Nested {
                    node: child,
                    depth: self.depth + 1,
                })
                .collect();
            state.serialize_field("children", &children)?;
        }
        state.end()
    }
}

/// Pre-order traversal returned by [`Node::descendants`].
pub struct Descendants<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let id = self.stack.pop()?;
        let node = Node {
            tree: self.tree,
            id,
        };
        self.stack.extend(node.data().children.iter().rev().copied());
        Some(node)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Handle to an open node, valid until that node is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker(usize);

struct Frame {
    kind: SyntaxKind,
    start: usize,
    children: Vec<NodeId>,
}

/// Assembles a [`Tree`] bottom-up.
///
/// Interior nodes are opened with [`TreeBuilder::start_node`] and closed with
/// [`TreeBuilder::finish_node`]; their span is derived from their children,
/// or is empty at the start offset when they have none.
#[derive(Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    frames: Vec<Frame>,
    root: Option<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_node(&mut self, kind: SyntaxKind, at: usize) -> Marker {
        self.frames.push(Frame {
            kind,
            start: at,
            children: Vec::new(),
        });
        Marker(self.frames.len() - 1)
    }

    /// Change the kind of a node that is still open.
    pub fn retag(&mut self, marker: Marker, kind: SyntaxKind) {
        if let Some(frame) = self.frames.get_mut(marker.0) {
            frame.kind = kind;
        }
    }

    pub fn leaf(&mut self, kind: SyntaxKind, span: Span) -> NodeId {
        let id = self.push(NodeData {
            kind,
            span,
            children: Vec::new(),
        });
        self.attach(id);
        id
    }

    pub fn finish_node(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let span = match (frame.children.first(), frame.children.last()) {
            (Some(first), Some(last)) => Span::new(
                self.nodes[first.index()].span.start,
                self.nodes[last.index()].span.end,
            ),
            _ => Span::empty(frame.start),
        };
        let id = self.push(NodeData {
            kind: frame.kind,
            span,
            children: frame.children,
        });
        self.attach(id);
    }

    /// Close any open nodes and produce the tree.
    pub fn finish(mut self, source: String) -> Tree {
        while !self.frames.is_empty() {
            self.finish_node();
        }
        let root = match self.root {
            Some(root) => root,
            None => self.push(NodeData {
                kind: SyntaxKind::Component,
                span: Span::empty(0),
                children: Vec::new(),
            }),
        };
        Tree {
            source,
            nodes: self.nodes,
            root,
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn attach(&mut self, id: NodeId) {
        match self.frames.last_mut() {
            Some(parent) => parent.children.push(id),
            None => self.root = Some(id),
        }
    }
}
