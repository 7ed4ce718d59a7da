//! Minimal owned element tree built from an `xot` parse.
//!
//! Only local names, concatenated text and child elements are kept;
//! namespaces, attributes, comments and processing instructions are dropped.
//! That is all a POM reader needs.

use xot::{Node, Xot};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Child elements named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Trimmed text of the first child named `name`, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|child| child.text.trim())
            .filter(|text| !text.is_empty())
    }
}

/// Parse `text` and return its document element.
pub fn parse_document(text: &str) -> Result<XmlElement, String> {
    let mut xot = Xot::new();
    let document = xot.parse(text).map_err(|e| e.to_string())?;
    let root = xot
        .children(document)
        .find(|node| xot.is_element(*node))
        .ok_or_else(|| "document has no root element".to_string())?;
    Ok(convert(&xot, root))
}

fn convert(xot: &Xot, node: Node) -> XmlElement {
    let name = xot
        .element(node)
        .map(|element| xot.name_ns_str(element.name()).0.to_string())
        .unwrap_or_default();
    let mut element = XmlElement::new(name);
    for child in xot.children(node) {
        if xot.is_element(child) {
            element.children.push(convert(xot, child));
        } else if let Some(text) = xot.text_str(child) {
            element.text.push_str(text);
        }
    }
    element
}
