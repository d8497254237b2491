//! Virtual nodes.
//!
//! A [`VNode`] is the target tree a template produces. The reconciler compares
//! it against the live tree held by a [`Document`](super::Document) and mutates
//! the live tree until both agree.

use std::fmt;

use super::markup::{self, MarkupError};

/// Node name reported for text nodes, matching the DOM's `nodeName`.
pub const TEXT_NODE_NAME: &str = "#text";

/// An element in a virtual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VElement {
	/// Lower-case tag name.
	pub tag: String,
	/// Attributes in declaration order.
	pub attributes: Vec<(String, String)>,
	/// Child nodes in order.
	pub children: Vec<VNode>,
}

impl VElement {
	/// Returns the value of an attribute.
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v.as_str())
	}

	/// Returns true if the attribute is declared.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.attributes.iter().any(|(n, _)| n == name)
	}
}

/// A node of a virtual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNode {
	/// An element node.
	Element(VElement),
	/// A text node.
	Text(String),
}

impl VNode {
	/// Creates an element with no attributes or children.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::Element(VElement {
			tag: tag.into().to_ascii_lowercase(),
			attributes: Vec::new(),
			children: Vec::new(),
		})
	}

	/// Creates a text node.
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(text.into())
	}

	/// Parses a single-rooted markup fragment.
	///
	/// Whitespace-only text around the root is ignored.
	///
	/// # Errors
	///
	/// Returns [`MarkupError`] if the markup is malformed or does not have
	/// exactly one root node.
	pub fn parse(source: &str) -> Result<Self, MarkupError> {
		let mut nodes = markup::parse_fragment(source)?;
		nodes.retain(|node| !matches!(node, Self::Text(text) if text.trim().is_empty()));
		if nodes.len() != 1 {
			return Err(MarkupError::RootCount(nodes.len()));
		}
		Ok(nodes.remove(0))
	}

	/// Sets an attribute, replacing any previous value. No-op on text nodes.
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		if let Self::Element(element) = &mut self {
			let name = name.into();
			let value = value.into();
			match element.attributes.iter_mut().find(|(n, _)| *n == name) {
				Some(slot) => slot.1 = value,
				None => element.attributes.push((name, value)),
			}
		}
		self
	}

	/// Appends a child. No-op on text nodes.
	pub fn child(mut self, child: VNode) -> Self {
		if let Self::Element(element) = &mut self {
			element.children.push(child);
		}
		self
	}

	/// Appends several children. No-op on text nodes.
	pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
		if let Self::Element(element) = &mut self {
			element.children.extend(children);
		}
		self
	}

	/// Returns the identity used to decide between patching and replacing:
	/// the upper-case tag for elements, `#text` for text nodes.
	pub fn node_name(&self) -> String {
		match self {
			Self::Element(element) => element.tag.to_ascii_uppercase(),
			Self::Text(_) => TEXT_NODE_NAME.to_string(),
		}
	}

	/// Returns the child list (empty for text nodes).
	pub fn child_nodes(&self) -> &[VNode] {
		match self {
			Self::Element(element) => &element.children,
			Self::Text(_) => &[],
		}
	}

	/// Returns the concatenated text of this subtree.
	pub fn text_content(&self) -> String {
		match self {
			Self::Text(text) => text.clone(),
			Self::Element(element) => element.children.iter().map(VNode::text_content).collect(),
		}
	}

	/// Returns a copy with every attribute list sorted by name.
	///
	/// Reconciliation appends new attributes after existing ones, so two trees
	/// that agree in content may list attributes in different orders.
	pub fn normalized(&self) -> Self {
		match self {
			Self::Text(text) => Self::Text(text.clone()),
			Self::Element(element) => {
				let mut attributes = element.attributes.clone();
				attributes.sort();
				Self::Element(VElement {
					tag: element.tag.clone(),
					attributes,
					children: element.children.iter().map(VNode::normalized).collect(),
				})
			}
		}
	}

	/// Serializes the tree to markup.
	pub fn to_html(&self) -> String {
		let mut out = String::new();
		markup::write_vnode(&mut out, self);
		out
	}
}

impl fmt::Display for VNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_html())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_builder_produces_tree() {
		let node = VNode::element("DIV")
			.attr("class", "a")
			.attr("class", "b")
			.child(VNode::text("hi"));

		let VNode::Element(element) = &node else {
			panic!("expected element");
		};
		assert_eq!(element.tag, "div");
		assert_eq!(element.attribute("class"), Some("b"));
		assert_eq!(node.node_name(), "DIV");
		assert_eq!(node.text_content(), "hi");
	}

	#[rstest]
	fn test_text_node_ignores_builder_calls() {
		let node = VNode::text("x").attr("id", "1").child(VNode::element("p"));
		assert_eq!(node, VNode::text("x"));
		assert_eq!(node.node_name(), TEXT_NODE_NAME);
	}

	#[rstest]
	fn test_parse_single_root() {
		let node = VNode::parse("  <p class=\"x\">hello</p>\n").unwrap();
		assert_eq!(
			node,
			VNode::element("p").attr("class", "x").child(VNode::text("hello"))
		);
	}

	#[rstest]
	#[case("<p></p><p></p>", 2)]
	#[case("   ", 0)]
	fn test_parse_rejects_wrong_root_count(#[case] source: &str, #[case] count: usize) {
		assert_eq!(VNode::parse(source), Err(MarkupError::RootCount(count)));
	}

	#[rstest]
	fn test_normalized_sorts_attributes() {
		let node = VNode::element("a").attr("z", "1").attr("b", "2");
		let VNode::Element(element) = node.normalized() else {
			panic!("expected element");
		};
		assert_eq!(
			element.attributes,
			vec![
				("b".to_string(), "2".to_string()),
				("z".to_string(), "1".to_string())
			]
		);
	}
}
