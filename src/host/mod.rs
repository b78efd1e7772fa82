//! Host tree capability.
//!
//! The core never owns the rendered tree. It asks a [`Host`] to construct
//! nodes, move them around and write attributes, the same way a browser's
//! retained-mode document API would be driven. [`MemoryDocument`] is a
//! complete in-memory implementation used for headless rendering and tests.
//!
//! Nodes are addressed by [`NodeId`] handles; the core keys its per-node
//! bookkeeping on them.

mod memory;

use indexmap::IndexMap;

use crate::value::{Callable, Value};

pub use memory::MemoryDocument;

/// Namespace URI for vector-graphics elements.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Handle to a node in the host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// What a host node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// An element with its lowercase tag name.
    Element(String),
    /// A text node.
    Text,
    /// A detached container whose children move on insertion.
    Fragment,
    /// Opaque markup inserted through `set_inner_html`.
    Markup,
}

/// Retained-mode tree operations the core relies on.
///
/// Insertion methods follow document semantics: inserting a node that already
/// has a parent moves it, and inserting a fragment moves the fragment's
/// children instead of the fragment itself.
pub trait Host {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_element_ns(&mut self, namespace: &str, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    fn create_fragment(&mut self) -> NodeId;

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    fn kind(&self, node: NodeId) -> NodeKind;
    fn namespace(&self, node: NodeId) -> Option<String>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId);
    fn remove_child(&mut self, parent: NodeId, child: NodeId);
    fn replace_child(&mut self, parent: NodeId, replacement: NodeId, old: NodeId);

    /// Whether the node is reachable from the document root.
    fn is_connected(&self, node: NodeId) -> bool;

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn text_content(&self, node: NodeId) -> String;
    fn set_text_content(&mut self, node: NodeId, text: &str);
    fn set_inner_html(&mut self, node: NodeId, markup: &str);
    fn style(&self, node: NodeId) -> IndexMap<String, String>;
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    fn clear_style(&mut self, node: NodeId);

    // -------------------------------------------------------------------------
    // Native properties and handlers
    // -------------------------------------------------------------------------

    /// Whether the node natively exposes a property of this name
    /// (`id`, `value`, `onclick`, ...).
    fn has_native_property(&self, node: NodeId, name: &str) -> bool;

    /// Read a property through the native surface. Unknown names read as null.
    fn property(&self, node: NodeId, name: &str) -> Value;

    /// Write a property through the native surface.
    fn set_property(&mut self, node: NodeId, name: &str, value: Value);

    fn set_handler(&mut self, node: NodeId, name: &str, handler: Callable);
    fn handler(&self, node: NodeId, name: &str) -> Option<Callable>;

    /// Whether the core may install intercepted accessors on this node.
    /// Nodes that refuse stay non-reactive.
    fn allows_redefinition(&self, _node: NodeId) -> bool {
        true
    }

    // -------------------------------------------------------------------------
    // Document lookups
    // -------------------------------------------------------------------------

    fn head(&self) -> Option<NodeId>;
    fn body(&self) -> Option<NodeId>;
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// Serialized markup of the node and its subtree.
    fn outer_html(&self, node: NodeId) -> String;

    /// Lowercase tag for elements, `None` otherwise.
    fn tag(&self, node: NodeId) -> Option<String> {
        match self.kind(node) {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }
}
