//! Markup parsing and serialization.
//!
//! A small parser for well-formed HTML fragments, enough for templates that
//! hand back strings (the controller's wholesale-replacement path) and for
//! writing trees compactly in tests. It understands elements, quoted, unquoted
//! and boolean attributes, void elements, self-closing tags, comments (which
//! are dropped) and the five basic character entities.

use super::vnode::{VElement, VNode};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Errors produced while parsing markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
	/// The input ended inside a tag or comment.
	#[error("unexpected end of markup at byte {0}")]
	UnexpectedEof(usize),
	/// A closing tag did not match the open element.
	#[error("unexpected closing tag </{found}> at byte {position}, expected </{expected}>")]
	MismatchedClose {
		/// The tag that was open.
		expected: String,
		/// The closing tag that was found.
		found: String,
		/// Byte offset of the closing tag.
		position: usize,
	},
	/// An element was never closed.
	#[error("unclosed element <{0}>")]
	Unclosed(String),
	/// A tag name or attribute name was malformed.
	#[error("invalid tag syntax at byte {0}")]
	InvalidTag(usize),
	/// A single root node was required.
	#[error("expected exactly one root node, found {0}")]
	RootCount(usize),
}

/// Returns true for elements that cannot have children.
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

/// Parses a fragment into its top-level nodes.
pub fn parse_fragment(source: &str) -> Result<Vec<VNode>, MarkupError> {
	Parser { src: source, pos: 0 }.parse()
}

struct Parser<'a> {
	src: &'a str,
	pos: usize,
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}

	fn parse(mut self) -> Result<Vec<VNode>, MarkupError> {
		let mut roots = Vec::new();
		let mut stack: Vec<VElement> = Vec::new();

		while self.pos < self.src.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				let end = rest
					.find("-->")
					.ok_or(MarkupError::UnexpectedEof(self.src.len()))?;
				self.pos += end + 3;
			} else if rest.starts_with("</") {
				let position = self.pos;
				self.pos += 2;
				let found = self.name()?;
				self.skip_whitespace();
				self.expect('>')?;
				let element = stack.pop().ok_or_else(|| MarkupError::MismatchedClose {
					expected: String::new(),
					found: found.clone(),
					position,
				})?;
				if element.tag != found {
					return Err(MarkupError::MismatchedClose {
						expected: element.tag,
						found,
						position,
					});
				}
				push_node(&mut stack, &mut roots, VNode::Element(element));
			} else if rest.starts_with('<') {
				self.pos += 1;
				let (element, open) = self.open_tag()?;
				if open {
					stack.push(element);
				} else {
					push_node(&mut stack, &mut roots, VNode::Element(element));
				}
			} else {
				let end = rest.find('<').unwrap_or(rest.len());
				let text = decode_entities(&rest[..end]);
				self.pos += end;
				push_node(&mut stack, &mut roots, VNode::Text(text));
			}
		}

		match stack.pop() {
			Some(element) => Err(MarkupError::Unclosed(element.tag)),
			None => Ok(roots),
		}
	}

	// Returns the element and whether it stays open for children.
	fn open_tag(&mut self) -> Result<(VElement, bool), MarkupError> {
		let tag = self.name()?;
		let mut attributes: Vec<(String, String)> = Vec::new();

		loop {
			self.skip_whitespace();
			let rest = self.rest();
			if rest.starts_with("/>") {
				self.pos += 2;
				return Ok((element(tag, attributes), false));
			}
			if rest.starts_with('>') {
				self.pos += 1;
				let open = !is_void_element(&tag);
				return Ok((element(tag, attributes), open));
			}
			if rest.is_empty() {
				return Err(MarkupError::UnexpectedEof(self.pos));
			}

			let name = self.name()?;
			self.skip_whitespace();
			let value = if self.rest().starts_with('=') {
				self.pos += 1;
				self.skip_whitespace();
				self.attribute_value()?
			} else {
				String::new()
			};
			if !attributes.iter().any(|(n, _)| *n == name) {
				attributes.push((name, value));
			}
		}
	}

	fn attribute_value(&mut self) -> Result<String, MarkupError> {
		let rest = self.rest();
		let quote = rest.chars().next().ok_or(MarkupError::UnexpectedEof(self.pos))?;
		if quote == '"' || quote == '\'' {
			let body = &rest[1..];
			let end = body
				.find(quote)
				.ok_or(MarkupError::UnexpectedEof(self.src.len()))?;
			self.pos += end + 2;
			return Ok(decode_entities(&body[..end]));
		}

		let end = rest
			.find(|c: char| c.is_whitespace() || c == '>')
			.unwrap_or(rest.len());
		if end == 0 {
			return Err(MarkupError::InvalidTag(self.pos));
		}
		self.pos += end;
		Ok(decode_entities(&rest[..end]))
	}

	fn name(&mut self) -> Result<String, MarkupError> {
		let rest = self.rest();
		let end = rest
			.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@')))
			.unwrap_or(rest.len());
		if end == 0 {
			return Err(if rest.is_empty() {
				MarkupError::UnexpectedEof(self.pos)
			} else {
				MarkupError::InvalidTag(self.pos)
			});
		}
		self.pos += end;
		Ok(rest[..end].to_ascii_lowercase())
	}

	fn skip_whitespace(&mut self) {
		let rest = self.rest();
		self.pos += rest.len() - rest.trim_start().len();
	}

	fn expect(&mut self, c: char) -> Result<(), MarkupError> {
		if self.rest().starts_with(c) {
			self.pos += c.len_utf8();
			Ok(())
		} else if self.rest().is_empty() {
			Err(MarkupError::UnexpectedEof(self.pos))
		} else {
			Err(MarkupError::InvalidTag(self.pos))
		}
	}
}

fn element(tag: String, attributes: Vec<(String, String)>) -> VElement {
	VElement {
		tag,
		attributes,
		children: Vec::new(),
	}
}

fn push_node(stack: &mut [VElement], roots: &mut Vec<VNode>, node: VNode) {
	match stack.last_mut() {
		Some(parent) => parent.children.push(node),
		None => roots.push(node),
	}
}

fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}
	text.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&amp;", "&")
}

/// Escapes text content.
pub fn escape_text(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

/// Escapes an attribute value for a double-quoted context.
pub fn escape_attribute(value: &str) -> String {
	value.replace('&', "&amp;").replace('"', "&quot;")
}

pub(crate) fn write_open_tag<'a>(
	out: &mut String,
	tag: &str,
	attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
	out.push('<');
	out.push_str(tag);
	for (name, value) in attributes {
		out.push(' ');
		out.push_str(name);
		out.push_str("=\"");
		out.push_str(&escape_attribute(value));
		out.push('"');
	}
	out.push('>');
}

pub(crate) fn write_close_tag(out: &mut String, tag: &str) {
	if !is_void_element(tag) {
		out.push_str("</");
		out.push_str(tag);
		out.push('>');
	}
}

pub(crate) fn write_vnode(out: &mut String, node: &VNode) {
	match node {
		VNode::Text(text) => out.push_str(&escape_text(text)),
		VNode::Element(element) => {
			write_open_tag(
				out,
				&element.tag,
				element
					.attributes
					.iter()
					.map(|(n, v)| (n.as_str(), v.as_str())),
			);
			for child in &element.children {
				write_vnode(out, child);
			}
			write_close_tag(out, &element.tag);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_parse_nested_elements() {
		let nodes = parse_fragment("<ul id=main><li>a</li><li class='x y'>b</li></ul>").unwrap();
		assert_eq!(
			nodes,
			vec![
				VNode::element("ul")
					.attr("id", "main")
					.child(VNode::element("li").child(VNode::text("a")))
					.child(
						VNode::element("li")
							.attr("class", "x y")
							.child(VNode::text("b"))
					)
			]
		);
	}

	#[rstest]
	fn test_parse_void_and_self_closing() {
		let nodes = parse_fragment("<p>a<br>b<input disabled/></p>").unwrap();
		assert_eq!(
			nodes,
			vec![
				VNode::element("p")
					.child(VNode::text("a"))
					.child(VNode::element("br"))
					.child(VNode::text("b"))
					.child(VNode::element("input").attr("disabled", ""))
			]
		);
	}

	#[rstest]
	fn test_parse_drops_comments_and_decodes_entities() {
		let nodes = parse_fragment("<!-- note --><b title=\"&quot;q&quot;\">1 &lt; 2 &amp;&amp; 3</b>")
			.unwrap();
		assert_eq!(
			nodes,
			vec![
				VNode::element("b")
					.attr("title", "\"q\"")
					.child(VNode::text("1 < 2 && 3"))
			]
		);
	}

	#[rstest]
	#[case("<div><span></div>", "mismatched")]
	#[case("<div>", "unclosed")]
	#[case("<div", "eof")]
	#[case("< div>", "invalid")]
	fn test_parse_errors(#[case] source: &str, #[case] kind: &str) {
		let error = parse_fragment(source).unwrap_err();
		let matched = match kind {
			"mismatched" => matches!(error, MarkupError::MismatchedClose { .. }),
			"unclosed" => matches!(error, MarkupError::Unclosed(_)),
			"eof" => matches!(error, MarkupError::UnexpectedEof(_)),
			"invalid" => matches!(error, MarkupError::InvalidTag(_)),
			_ => false,
		};
		assert!(matched, "unexpected error for {:?}: {:?}", source, error);
	}

	#[rstest]
	fn test_serialize_escapes() {
		let node = VNode::element("a")
			.attr("title", "say \"hi\" & go")
			.child(VNode::text("<b>"));
		assert_eq!(
			node.to_html(),
			"<a title=\"say &quot;hi&quot; &amp; go\">&lt;b&gt;</a>"
		);
	}

	#[rstest]
	fn test_serialize_then_parse_is_stable() {
		let source = "<div class=\"c\"><img src=\"x.png\"><p>t</p></div>";
		let nodes = parse_fragment(source).unwrap();
		assert_eq!(nodes[0].to_html(), source);
	}
}
