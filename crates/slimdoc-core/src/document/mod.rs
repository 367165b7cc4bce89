//! Document model: an arena of markup nodes addressed by stable index.
//!
//! A document is split into two kinds of node:
//! - `Text`: any run of markup that is not an `<img>` start tag, stored verbatim
//! - `Image`: one `<img>` start tag, split around its `src` attribute value
//!
//! Serializing concatenates the nodes, so everything except a replaced `src`
//! value comes back byte-for-byte.
//!
//! # Ownership
//!
//! A `NodeId` is an index into the arena. The batch coordinator hands each
//! task exactly one id, and `replace_src` is the only mutator, so concurrent
//! tasks never contend on the same node and the tree needs no locking.

mod parse;

use std::fmt;

use thiserror::Error;

pub use parse::ParseError;

/// Stable index of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An `<img>` start tag, split around its `src` attribute value.
///
/// `before` runs from `<img` up to and including the opening quote of the
/// value (or the whole tag when there is no `src`); `after` holds the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    before: String,
    src: Option<String>,
    after: String,
}

impl ImageNode {
    fn new(before: &str, src: Option<&str>, after: &str) -> Self {
        Self {
            before: before.to_string(),
            src: src.map(str::to_string),
            after: after.to_string(),
        }
    }

    /// Raw `src` attribute value, exactly as written in the markup.
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    fn serialized_len(&self) -> usize {
        self.before.len() + self.src.as_ref().map_or(0, String::len) + self.after.len()
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.before);
        if let Some(src) = &self.src {
            out.push_str(src);
        }
        out.push_str(&self.after);
    }
}

/// One node of the document arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Image(ImageNode),
}

impl Node {
    fn serialized_len(&self) -> usize {
        match self {
            Node::Text(text) => text.len(),
            Node::Image(img) => img.serialized_len(),
        }
    }
}

/// Errors from addressing a node that cannot take a new `src`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Node {0} does not exist")]
    NoSuchNode(NodeId),

    #[error("Node {0} is not an image")]
    NotAnImage(NodeId),

    #[error("Image node {0} has no src attribute")]
    MissingSrc(NodeId),
}

/// A parsed markup document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Scan markup text into a document.
    ///
    /// Never fails: markup the scanner cannot make sense of, such as a tag
    /// cut off at end of input, is kept as text.
    pub fn parse(text: &str) -> Self {
        Self {
            nodes: parse::parse_nodes(text),
        }
    }

    /// Decode UTF-8 bytes and scan them into a document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidUtf8 {
            valid_up_to: e.valid_up_to(),
        })?;
        Ok(Self::parse(text))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn image(&self, id: NodeId) -> Option<&ImageNode> {
        match self.get(id)? {
            Node::Image(img) => Some(img),
            Node::Text(_) => None,
        }
    }

    /// All image nodes in document order.
    pub fn image_nodes(&self) -> impl Iterator<Item = (NodeId, &ImageNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                Node::Image(img) => Some((NodeId(index), img)),
                Node::Text(_) => None,
            })
    }

    /// Replace the `src` value of an image node, returning the previous value.
    ///
    /// The surrounding quotes and all other attributes are left as they were.
    pub fn replace_src(&mut self, id: NodeId, src: String) -> Result<String, DocumentError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(DocumentError::NoSuchNode(id))?;
        let Node::Image(img) = node else {
            return Err(DocumentError::NotAnImage(id));
        };
        let slot = img.src.as_mut().ok_or(DocumentError::MissingSrc(id))?;
        Ok(std::mem::replace(slot, src))
    }

    /// Serialize the document back to markup text.
    pub fn serialize(&self) -> String {
        let capacity = self.nodes.iter().map(Node::serialized_len).sum();
        let mut out = String::with_capacity(capacity);
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Image(img) => img.write_to(&mut out),
            }
        }
        out
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
