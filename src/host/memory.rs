//! In-memory host tree.
//!
//! An arena of nodes shaped like a browser document (`html > head + body`).
//! Removed nodes stay in the arena, detached, so stale handles keep reading
//! sensible values.

use indexmap::IndexMap;

use crate::value::{Callable, Value};
use super::{Host, NodeId, NodeKind};

/// Properties every element exposes natively, besides event handlers.
const NATIVE_PROPERTIES: &[&str] = &[
    "id",
    "className",
    "tagName",
    "nodeName",
    "textContent",
    "innerHTML",
    "outerHTML",
    "value",
    "style",
    "hidden",
    "title",
    "childElementCount",
];

/// Event handler properties elements expose natively.
const EVENT_HANDLERS: &[&str] = &[
    "onclick",
    "ondblclick",
    "oninput",
    "onchange",
    "onsubmit",
    "onkeydown",
    "onkeyup",
    "onkeypress",
    "onfocus",
    "onblur",
    "onmousedown",
    "onmouseup",
    "onmouseover",
    "onmouseout",
    "onmousemove",
    "onscroll",
    "onload",
];

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    namespace: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Character data for text and markup nodes.
    data: String,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    properties: IndexMap<String, Value>,
    handlers: IndexMap<String, Callable>,
    frozen: bool,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            namespace: None,
            parent: None,
            children: Vec::new(),
            data: String::new(),
            attributes: IndexMap::new(),
            style: IndexMap::new(),
            properties: IndexMap::new(),
            handlers: IndexMap::new(),
            frozen: false,
        }
    }

    fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }
}

/// A complete in-memory document.
///
/// Nodes live in an append-only arena; detached nodes are not reclaimed.
/// Repainting the text or markup of a node whose only child is already text
/// or markup rewrites that child in place.
#[derive(Debug)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create an empty `html > head + body` document.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
        };
        doc.root = doc.alloc(NodeData::new(NodeKind::Document));
        let html = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.append_child(doc.root, html);
        doc.append_child(html, doc.head);
        doc.append_child(html, doc.body);
        doc
    }

    /// The document root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Mark a node as refusing accessor redefinition.
    pub fn freeze_node(&mut self, node: NodeId) {
        self.nodes[node.0].frozen = true;
    }

    /// Connected elements with the given tag, in document order.
    pub fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        let mut found = Vec::new();
        self.walk(self.root, &mut |id, data| {
            if data.kind == NodeKind::Element(tag.clone()) {
                found.push(id);
            }
        });
        found
    }

    /// Serialized markup of the node's children.
    pub fn inner_html(&self, node: NodeId) -> String {
        self.nodes[node.0]
            .children
            .iter()
            .map(|&child| self.outer_html(child))
            .collect()
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    fn walk(&self, node: NodeId, visit: &mut impl FnMut(NodeId, &NodeData)) {
        let data = &self.nodes[node.0];
        visit(node, data);
        for &child in &data.children {
            self.walk(child, visit);
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Detach a node for insertion, expanding fragments into their children.
    fn take_for_insert(&mut self, node: NodeId) -> Vec<NodeId> {
        if self.nodes[node.0].kind == NodeKind::Fragment {
            let children = std::mem::take(&mut self.nodes[node.0].children);
            for &child in &children {
                self.nodes[child.0].parent = None;
            }
            children
        } else {
            self.detach(node);
            vec![node]
        }
    }

    fn adopt(&mut self, parent: NodeId, nodes: &[NodeId]) {
        for &node in nodes {
            self.nodes[node.0].parent = Some(parent);
        }
    }

    /// The only child of `node`, when it has exactly one and it is of `kind`.
    /// Content repaints rewrite it in place instead of allocating.
    fn sole_child(&self, node: NodeId, kind: NodeKind) -> Option<NodeId> {
        match self.nodes[node.0].children.as_slice() {
            [child] if self.nodes[child.0].kind == kind => Some(*child),
            _ => None,
        }
    }

    fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    fn sync_style_attribute(&mut self, node: NodeId) {
        let data = &mut self.nodes[node.0];
        if data.style.is_empty() {
            data.attributes.shift_remove("style");
        } else {
            let text = data
                .style
                .iter()
                .map(|(k, v)| format!("{k}: {v};"))
                .collect::<Vec<_>>()
                .join(" ");
            data.attributes.insert("style".to_string(), text);
        }
    }
}

// =============================================================================
// Host implementation
// =============================================================================

impl Host for MemoryDocument {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::new(NodeKind::Element(tag.to_ascii_lowercase())))
    }

    fn create_element_ns(&mut self, namespace: &str, tag: &str) -> NodeId {
        // Namespaced tags keep their case (`foreignObject`, `linearGradient`).
        let mut data = NodeData::new(NodeKind::Element(tag.to_string()));
        data.namespace = Some(namespace.to_string());
        self.alloc(data)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.data = text.to_string();
        self.alloc(data)
    }

    fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::new(NodeKind::Fragment))
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.0].kind.clone()
    }

    fn namespace(&self, node: NodeId) -> Option<String> {
        self.nodes[node.0].namespace.clone()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let moved = self.take_for_insert(child);
        self.adopt(parent, &moved);
        self.nodes[parent.0].children.extend(moved);
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if child == reference {
            return;
        }
        let moved = self.take_for_insert(child);
        self.adopt(parent, &moved);
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&c| c == reference) {
            Some(at) => {
                children.splice(at..at, moved);
            }
            None => children.extend(moved),
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes[child.0].parent == Some(parent) {
            self.detach(child);
        }
    }

    fn replace_child(&mut self, parent: NodeId, replacement: NodeId, old: NodeId) {
        if self.nodes[old.0].parent != Some(parent) || replacement == old {
            return;
        }
        let moved = self.take_for_insert(replacement);
        self.adopt(parent, &moved);
        let children = &mut self.nodes[parent.0].children;
        if let Some(at) = children.iter().position(|&c| c == old) {
            children.splice(at..=at, moved);
        }
        self.nodes[old.0].parent = None;
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes[node.0].attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if !self.nodes[node.0].is_element() {
            return;
        }
        if name == "style" {
            let data = &mut self.nodes[node.0];
            data.style = parse_style(value);
        }
        self.nodes[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn text_content(&self, node: NodeId) -> String {
        let data = &self.nodes[node.0];
        match data.kind {
            NodeKind::Text => data.data.clone(),
            NodeKind::Markup => strip_tags(&data.data),
            _ => data
                .children
                .iter()
                .map(|&child| self.text_content(child))
                .collect(),
        }
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        match self.nodes[node.0].kind {
            NodeKind::Text | NodeKind::Markup => self.nodes[node.0].data = text.to_string(),
            _ => {
                if let Some(child) = self.sole_child(node, NodeKind::Text).filter(|_| !text.is_empty()) {
                    self.nodes[child.0].data = text.to_string();
                    return;
                }
                self.clear_children(node);
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    self.append_child(node, text_node);
                }
            }
        }
    }

    fn set_inner_html(&mut self, node: NodeId, markup: &str) {
        if matches!(self.nodes[node.0].kind, NodeKind::Text | NodeKind::Markup) {
            return;
        }
        if let Some(child) = self.sole_child(node, NodeKind::Markup).filter(|_| !markup.is_empty()) {
            self.nodes[child.0].data = markup.to_string();
            return;
        }
        self.clear_children(node);
        if !markup.is_empty() {
            let mut data = NodeData::new(NodeKind::Markup);
            data.data = markup.to_string();
            let markup_node = self.alloc(data);
            self.append_child(node, markup_node);
        }
    }

    fn style(&self, node: NodeId) -> IndexMap<String, String> {
        self.nodes[node.0].style.clone()
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if !self.nodes[node.0].is_element() {
            return;
        }
        let property = kebab_case(property);
        let style = &mut self.nodes[node.0].style;
        if value.is_empty() {
            style.shift_remove(&property);
        } else {
            style.insert(property, value.to_string());
        }
        self.sync_style_attribute(node);
    }

    fn clear_style(&mut self, node: NodeId) {
        self.nodes[node.0].style.clear();
        self.sync_style_attribute(node);
    }

    fn has_native_property(&self, node: NodeId, name: &str) -> bool {
        self.nodes[node.0].is_element()
            && (NATIVE_PROPERTIES.contains(&name) || EVENT_HANDLERS.contains(&name))
    }

    fn property(&self, node: NodeId, name: &str) -> Value {
        let data = &self.nodes[node.0];
        match name {
            "tagName" | "nodeName" => match &data.kind {
                NodeKind::Element(tag) if data.namespace.is_none() => {
                    Value::from(tag.to_ascii_uppercase())
                }
                NodeKind::Element(tag) => Value::from(tag.as_str()),
                NodeKind::Text if name == "nodeName" => Value::from("#text"),
                NodeKind::Fragment if name == "nodeName" => Value::from("#document-fragment"),
                NodeKind::Document if name == "nodeName" => Value::from("#document"),
                _ => Value::Null,
            },
            "id" if data.is_element() => Value::from(data.attributes.get("id").cloned().unwrap_or_default()),
            "className" if data.is_element() => {
                Value::from(data.attributes.get("class").cloned().unwrap_or_default())
            }
            "textContent" => Value::from(self.text_content(node)),
            "innerHTML" => Value::from(self.inner_html(node)),
            "outerHTML" => Value::from(self.outer_html(node)),
            "childElementCount" => Value::from(
                data.children
                    .iter()
                    .filter(|c| self.nodes[c.0].is_element())
                    .count(),
            ),
            "style" if data.is_element() => Value::Object(
                data.style
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect(),
            ),
            "value" if data.is_element() => data
                .properties
                .get("value")
                .cloned()
                .or_else(|| data.attributes.get("value").map(|v| Value::from(v.as_str())))
                .unwrap_or_else(|| Value::from("")),
            _ if EVENT_HANDLERS.contains(&name) => data
                .handlers
                .get(name)
                .cloned()
                .map_or(Value::Null, Value::Function),
            _ => data.properties.get(name).cloned().unwrap_or_default(),
        }
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: Value) {
        match name {
            "id" => {
                let text = value.to_text();
                self.set_attribute(node, "id", &text);
            }
            "className" => {
                let text = value.to_text();
                self.set_attribute(node, "class", &text);
            }
            "textContent" => self.set_text_content(node, &value.to_text()),
            "innerHTML" => self.set_inner_html(node, &value.to_text()),
            "style" => match value {
                Value::Object(members) => {
                    self.clear_style(node);
                    for (property, v) in &members {
                        self.set_style(node, property, &v.to_text());
                    }
                }
                other => {
                    let text = other.to_text();
                    self.set_attribute(node, "style", &text);
                }
            },
            _ if EVENT_HANDLERS.contains(&name) => match value {
                Value::Function(handler) => self.set_handler(node, name, handler),
                _ => {
                    self.nodes[node.0].handlers.shift_remove(name);
                }
            },
            _ => {
                self.nodes[node.0].properties.insert(name.to_string(), value);
            }
        }
    }

    fn set_handler(&mut self, node: NodeId, name: &str, handler: Callable) {
        self.nodes[node.0].handlers.insert(name.to_string(), handler);
    }

    fn handler(&self, node: NodeId, name: &str) -> Option<Callable> {
        self.nodes[node.0].handlers.get(name).cloned()
    }

    fn allows_redefinition(&self, node: NodeId) -> bool {
        !self.nodes[node.0].frozen
    }

    fn head(&self) -> Option<NodeId> {
        Some(self.head)
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut found = None;
        self.walk(self.root, &mut |node, data| {
            if found.is_none()
                && data.is_element()
                && data.attributes.get("id").map(String::as_str) == Some(id)
            {
                found = Some(node);
            }
        });
        found
    }

    fn outer_html(&self, node: NodeId) -> String {
        let data = &self.nodes[node.0];
        match &data.kind {
            NodeKind::Element(tag) => {
                let mut out = format!("<{tag}");
                for (name, value) in &data.attributes {
                    out.push_str(&format!(" {name}=\"{}\"", escape(value, true)));
                }
                out.push('>');
                out.push_str(&self.inner_html(node));
                out.push_str(&format!("</{tag}>"));
                out
            }
            NodeKind::Text => escape(&data.data, false),
            NodeKind::Markup => data.data.clone(),
            NodeKind::Fragment | NodeKind::Document => self.inner_html(node),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// `backgroundColor` -> `background-color`.
fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for ch in property.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_style(text: &str) -> IndexMap<String, String> {
    text.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}
