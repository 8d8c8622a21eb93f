//! Flattened HTML element tree.
//!
//! The parsed DOM is walked once and every element is stored in document
//! (pre-order) order. An element's descendants are the contiguous slice
//! that follows it, so "find next" and "find inside" become index scans.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::ops::Range;

/// An HTML element with its attributes.
#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,

    /// Attributes in source order, names lowercased by the parser.
    pub attrs: Vec<(String, String)>,

    /// One past the index of the last descendant.
    end: usize,
}

impl Element {
    /// Get an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check the tag name.
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// All elements of a document in document order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    /// Parse HTML text. Parsing is lenient and never fails.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let mut elements = Vec::new();
        flatten(&dom.document, &mut elements);
        log::debug!("Parsed HTML into {} elements", elements.len());
        Self { elements }
    }

    /// All elements in document order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    /// Index range of the descendants of the element at `index`.
    pub fn descendants(&self, index: usize) -> Range<usize> {
        match self.elements.get(index) {
            Some(el) => index + 1..el.end,
            None => 0..0,
        }
    }

    /// Index of the first element matching `pred`.
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.elements.iter().position(pred)
    }

    /// Elements with the given tag inside the element at `index`.
    pub fn find_all_within<'a>(
        &'a self,
        index: usize,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements[self.descendants(index)]
            .iter()
            .filter(move |el| el.is(tag))
    }
}

fn flatten(node: &Handle, out: &mut Vec<Element>) {
    let index = match &node.data {
        NodeData::Element { name, attrs, .. } => {
            out.push(Element {
                tag: name.local.to_string().to_ascii_lowercase(),
                attrs: attrs
                    .borrow()
                    .iter()
                    .map(|a| (a.name.local.to_string(), a.value.to_string()))
                    .collect(),
                end: 0,
            });
            Some(out.len() - 1)
        }
        _ => None,
    };

    for child in node.children.borrow().iter() {
        flatten(child, out);
    }

    if let Some(i) = index {
        out[i].end = out.len();
    }
}
