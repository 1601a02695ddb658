//! HTML parsing and serialisation for the headless document.
//!
//! Parsing goes through [`tl`]; the resulting nodes are created detached and
//! handed back in source order. Serialisation is the inverse used by tests,
//! diagnostics and SSR-style setups.

use super::document::{Document, NodeType};
use super::DomId;
use crate::types::{attribute_namespace, SVG_NS};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl Document {
    /// Parse an HTML fragment into detached nodes.
    ///
    /// Unparseable input becomes a single text node.
    pub fn parse_fragment(&self, html: &str) -> Vec<DomId> {
        let dom = match tl::parse(html, tl::ParserOptions::default()) {
            Ok(dom) => dom,
            Err(err) => {
                log::warn!("failed to parse HTML fragment ({err:?}); treating as text");
                return vec![self.create_text(html)];
            }
        };
        let parser = dom.parser();
        dom.children()
            .iter()
            .filter_map(|handle| self.import_tl_node(*handle, parser, false))
            .collect()
    }

    fn import_tl_node(&self, handle: tl::NodeHandle, parser: &tl::Parser, in_svg: bool) -> Option<DomId> {
        let node = handle.get(parser)?;
        match node {
            tl::Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_string();
                let svg = in_svg || name.eq_ignore_ascii_case("svg");
                let element = if svg {
                    self.create_element_ns(SVG_NS, &name)
                } else {
                    self.create_element(&name)
                };
                for (key, value) in tag.attributes().iter() {
                    let key: &str = key.as_ref();
                    let value = decode_entities(value.as_deref().unwrap_or(""));
                    match attribute_namespace(key) {
                        Some(ns) => self.set_attribute_ns(element, ns, key, &value),
                        None => self.set_attribute(element, key, &value),
                    }
                }
                let child_svg = svg && !name.eq_ignore_ascii_case("foreignObject");
                for child in tag.children().top().iter() {
                    if let Some(child) = self.import_tl_node(*child, parser, child_svg) {
                        self.append_child(element, child);
                    }
                }
                Some(element)
            }
            tl::Node::Raw(bytes) => Some(self.create_text(&decode_entities(&bytes.as_utf8_str()))),
            tl::Node::Comment(bytes) => {
                let raw = bytes.as_utf8_str();
                let data = raw
                    .trim_start_matches("<!--")
                    .trim_end_matches("-->")
                    .to_string();
                Some(self.create_comment(&data))
            }
        }
    }

    /// Replace all children of `parent` with parsed `html`.
    pub fn set_inner_html(&self, parent: DomId, html: &str) {
        self.clear_children(parent);
        for node in self.parse_fragment(html) {
            self.append_child(parent, node);
        }
    }

    /// Serialise the children of a node.
    pub fn inner_html(&self, id: DomId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialise a node including itself.
    pub fn outer_html(&self, id: DomId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: DomId, out: &mut String) {
        match self.node_type(id) {
            NodeType::Document => {
                for child in self.children(id) {
                    self.write_html(child, out);
                }
            }
            NodeType::Text => out.push_str(&escape_text(&self.text_data(id).unwrap_or_default())),
            NodeType::Comment => {
                out.push_str("<!--");
                out.push_str(&self.text_data(id).unwrap_or_default());
                out.push_str("-->");
            }
            NodeType::Element => {
                let tag = self.tag(id).unwrap_or_default();
                out.push('<');
                out.push_str(&tag);
                for attr in self.attributes(id) {
                    out.push(' ');
                    out.push_str(&attr.name);
                    if !attr.value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(&attr.value));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in self.children(id) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialise_roundtrip() {
        let doc = Document::new();
        let host = doc.create_element("div");
        doc.set_inner_html(host, r#"<p class="a">x &amp; y</p><!--note--><i></i>"#);

        assert_eq!(doc.children(host).len(), 3);
        assert_eq!(doc.inner_html(host), r#"<p class="a">x &amp; y</p><!--note--><i></i>"#);
        assert_eq!(doc.text_content(host), "x & y");
    }

    #[test]
    fn test_parsed_svg_uses_namespace() {
        let doc = Document::new();
        let nodes = doc.parse_fragment(r#"<svg><circle r="1"></circle></svg>"#);
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.namespace(nodes[0]).as_deref(), Some(SVG_NS));
        let circle = doc.first_child(nodes[0]).unwrap();
        assert_eq!(doc.namespace(circle).as_deref(), Some(SVG_NS));
    }

    #[test]
    fn test_parsed_nodes_are_detached() {
        let doc = Document::new();
        let nodes = doc.parse_fragment("<span>a</span>b");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|&n| doc.parent(n).is_none()));
        assert!(doc.is_text(nodes[1]));
    }
}
