//! The read-only XML node boundary.
//!
//! The engine never builds documents itself; the transport collaborator hands
//! it nodes through the [`XmlNode`] trait. Two implementations ship here:
//! [`TextNode`], a synthetic text-only node, and an implementation for
//! [`roxmltree::Node`].

use crate::error::Result;

/// Boxed node handle returned by child lookups.
pub type NodeRef<'a> = Box<dyn XmlNode + 'a>;

/// A node of an already-parsed XML tree.
pub trait XmlNode {
    /// Tag name of an element; `None` for text pseudo-nodes.
    fn tag(&self) -> Option<&str>;

    /// Text content of the node (all descendant text for elements).
    fn text(&self) -> String;

    /// Attribute lookup by name.
    fn attribute(&self, name: &str) -> Option<String>;

    /// First child element with exactly this tag.
    fn child(&self, tag: &str) -> Option<NodeRef<'_>>;

    /// Every child node in document order, text pseudo-nodes included.
    fn children(&self) -> Vec<NodeRef<'_>>;

    /// Whether this is a whitespace-only text pseudo-node.
    ///
    /// Such nodes appear between sibling elements in some tree
    /// representations and carry no record.
    fn is_blank(&self) -> bool {
        self.tag().is_none() && self.text().trim().is_empty()
    }
}

impl<T: XmlNode + ?Sized> XmlNode for Box<T> {
    fn tag(&self) -> Option<&str> {
        (**self).tag()
    }

    fn text(&self) -> String {
        (**self).text()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        (**self).attribute(name)
    }

    fn child(&self, tag: &str) -> Option<NodeRef<'_>> {
        (**self).child(tag)
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        (**self).children()
    }

    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }
}

impl<T: XmlNode + ?Sized> XmlNode for &T {
    fn tag(&self) -> Option<&str> {
        (**self).tag()
    }

    fn text(&self) -> String {
        (**self).text()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        (**self).attribute(name)
    }

    fn child(&self, tag: &str) -> Option<NodeRef<'_>> {
        (**self).child(tag)
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        (**self).children()
    }

    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }
}

/// A text-only node with no tag, attributes or children.
///
/// Comma-list elements and attribute values are wrapped in a `TextNode`
/// before the scalar converter sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode(pub String);

impl TextNode {
    /// Wraps `text` as a node.
    pub fn new(text: impl Into<String>) -> Self {
        TextNode(text.into())
    }
}

impl XmlNode for TextNode {
    fn tag(&self) -> Option<&str> {
        None
    }

    fn text(&self) -> String {
        self.0.clone()
    }

    fn attribute(&self, _name: &str) -> Option<String> {
        None
    }

    fn child(&self, _tag: &str) -> Option<NodeRef<'_>> {
        None
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        Vec::new()
    }
}

impl<'a, 'input: 'a> XmlNode for roxmltree::Node<'a, 'input> {
    fn tag(&self) -> Option<&str> {
        if self.is_element() {
            Some(self.tag_name().name())
        } else {
            None
        }
    }

    fn text(&self) -> String {
        if self.is_text() {
            return roxmltree::Node::text(self).unwrap_or_default().to_string();
        }
        self.descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| roxmltree::Node::text(&n))
            .collect()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        roxmltree::Node::attribute(self, name).map(str::to_string)
    }

    fn child(&self, tag: &str) -> Option<NodeRef<'_>> {
        roxmltree::Node::children(self)
            .find(|n| n.is_element() && n.tag_name().name() == tag)
            .map(|n| Box::new(n) as NodeRef<'_>)
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        roxmltree::Node::children(self)
            .filter(|n| n.is_element() || n.is_text())
            .map(|n| Box::new(n) as NodeRef<'_>)
            .collect()
    }
}

/// Parses a response document.
///
/// Thin wrapper over [`roxmltree::Document::parse`] so callers get a
/// [`TypemapError`](crate::TypemapError) on malformed input.
pub fn parse_document(xml: &str) -> Result<roxmltree::Document<'_>> {
    Ok(roxmltree::Document::parse(xml)?)
}
