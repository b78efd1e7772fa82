//! Structural Builder - kind selector to host node.
//!
//! Dedicated construction paths, checked in order:
//!
//! 1. `svg` - namespaced element in the SVG namespace
//! 2. any kind under an inherited namespace - namespaced element
//! 3. `fragment` - detached container
//! 4. `text` - text node carrying `$text`
//! 5. everything else - plain element of that kind (`div` when unnamed)

use crate::gene::{self as keys, DEFAULT_KIND, FRAGMENT_KIND, SVG_KIND, TEXT, TEXT_KIND};
use crate::host::{Host, NodeId, SVG_NAMESPACE};
use crate::value::{Gene, Value};

/// Construct the host node for a description. The node is not attached.
pub fn build_host(host: &mut dyn Host, gene: &Gene, namespace: Option<&str>) -> NodeId {
    let kind = keys::kind_of(gene);
    match (kind, namespace) {
        (Some(SVG_KIND), _) => host.create_element_ns(SVG_NAMESPACE, SVG_KIND),
        (kind, Some(namespace)) => host.create_element_ns(namespace, kind.unwrap_or(DEFAULT_KIND)),
        (Some(FRAGMENT_KIND), None) => host.create_fragment(),
        (Some(TEXT_KIND), None) => {
            let text = gene.get(TEXT).map(Value::to_text).unwrap_or_default();
            host.create_text(&text)
        }
        (kind, None) => host.create_element(kind.unwrap_or(DEFAULT_KIND)),
    }
}

/// Expand a callable `$text` on a text description into its block-comment body.
pub fn normalize_text(gene: &mut Gene) {
    if keys::kind_of(gene) != Some(TEXT_KIND) {
        return;
    }
    if let Some(Value::Function(f)) = gene.get(TEXT) {
        let text = f.multiline().unwrap_or_default();
        gene.insert(TEXT.to_string(), Value::from(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDocument, NodeKind};
    use crate::value::Callable;
    use crate::gene;

    #[test]
    fn test_default_kind_is_div() {
        let mut doc = MemoryDocument::new();
        let id = build_host(&mut doc, &gene! { "class" => "x" }, None);
        assert_eq!(doc.tag(id).as_deref(), Some("div"));
    }

    #[test]
    fn test_special_kinds() {
        let mut doc = MemoryDocument::new();
        let fragment = build_host(&mut doc, &gene! { "$type" => "fragment" }, None);
        assert_eq!(doc.kind(fragment), NodeKind::Fragment);

        let text = build_host(&mut doc, &gene! { "$type" => "text", "$text" => "hi" }, None);
        assert_eq!(doc.kind(text), NodeKind::Text);
        assert_eq!(doc.text_content(text), "hi");

        let svg = build_host(&mut doc, &gene! { "$type" => "svg" }, None);
        assert_eq!(doc.namespace(svg).as_deref(), Some(SVG_NAMESPACE));
    }

    #[test]
    fn test_namespace_propagates() {
        let mut doc = MemoryDocument::new();
        let circle = build_host(&mut doc, &gene! { "$type" => "circle" }, Some(SVG_NAMESPACE));
        assert_eq!(doc.namespace(circle).as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(doc.tag(circle).as_deref(), Some("circle"));
    }

    #[test]
    fn test_multiline_text() {
        let body = Callable::new("|| {/*\nline one\nline two\n*/}", |_, _| Value::Null);
        let mut g = gene! { "$type" => "text", "$text" => body };
        normalize_text(&mut g);
        assert_eq!(g["$text"], Value::from("line one\nline two"));
    }
}
