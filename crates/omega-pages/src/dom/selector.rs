//! CSS selector subset used for scoping event bindings.
//!
//! Supported: type selectors, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`
//! (quoted or bare), compounds of these, and the descendant combinator
//! (whitespace). Anything else is rejected at parse time rather than silently
//! matching nothing.

use super::node::NodeId;

/// Read access to the tree needed to evaluate a selector.
pub(crate) trait ElementLookup {
	fn tag(&self, node: NodeId) -> Option<&str>;
	fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
	fn parent(&self, node: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatch {
	name: String,
	value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeMatch>,
}

impl Compound {
	fn matches<L: ElementLookup + ?Sized>(&self, lookup: &L, node: NodeId) -> bool {
		let Some(tag) = lookup.tag(node) else {
			return false;
		};
		if self.tag.as_deref().is_some_and(|t| t != tag) {
			return false;
		}
		if let Some(id) = &self.id {
			if lookup.attribute(node, "id") != Some(id.as_str()) {
				return false;
			}
		}
		if !self.classes.is_empty() {
			let class_list = lookup.attribute(node, "class").unwrap_or_default();
			let has_all = self
				.classes
				.iter()
				.all(|class| class_list.split_whitespace().any(|c| c == class));
			if !has_all {
				return false;
			}
		}
		self.attributes
			.iter()
			.all(|attr| match (lookup.attribute(node, &attr.name), &attr.value) {
				(Some(_), None) => true,
				(Some(actual), Some(expected)) => actual == expected,
				(None, _) => false,
			})
	}
}

/// A parsed selector: compounds joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
	source: String,
	compounds: Vec<Compound>,
}

impl Selector {
	/// Parses a selector.
	///
	/// # Errors
	///
	/// Returns a description of the problem if the selector is empty or uses
	/// syntax outside the supported subset.
	pub fn parse(source: &str) -> Result<Self, String> {
		let mut compounds = Vec::new();
		for part in split_compounds(source) {
			compounds.push(parse_compound(part)?);
		}
		if compounds.is_empty() {
			return Err("selector is empty".to_string());
		}
		Ok(Self {
			source: source.trim().to_string(),
			compounds,
		})
	}

	/// Returns the selector text.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub(crate) fn matches<L: ElementLookup + ?Sized>(&self, lookup: &L, node: NodeId) -> bool {
		let Some((last, ancestors)) = self.compounds.split_last() else {
			return false;
		};
		if !last.matches(lookup, node) {
			return false;
		}

		// Descendant-only chains are satisfied by matching each compound
		// against the nearest qualifying ancestor, right to left.
		let mut current = lookup.parent(node);
		for compound in ancestors.iter().rev() {
			loop {
				let Some(candidate) = current else {
					return false;
				};
				current = lookup.parent(candidate);
				if compound.matches(lookup, candidate) {
					break;
				}
			}
		}
		true
	}
}

// Splits on whitespace outside `[...]`, so quoted attribute values may
// contain spaces.
fn split_compounds(source: &str) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut start = None;
	let mut in_brackets = false;
	let mut quote = None;

	for (i, c) in source.char_indices() {
		match quote {
			Some(q) if c == q => quote = None,
			Some(_) => {}
			None if in_brackets && (c == '"' || c == '\'') => quote = Some(c),
			None if c == '[' => in_brackets = true,
			None if c == ']' => in_brackets = false,
			None if c.is_whitespace() && !in_brackets => {
				if let Some(begin) = start.take() {
					parts.push(&source[begin..i]);
				}
				continue;
			}
			None => {}
		}
		start.get_or_insert(i);
	}
	if let Some(begin) = start {
		parts.push(&source[begin..]);
	}
	parts
}

fn find_attribute_end(chars: &[char], open: usize) -> Result<usize, String> {
	let mut quote = None;
	for (offset, &c) in chars[open + 1..].iter().enumerate() {
		match quote {
			Some(q) if c == q => quote = None,
			Some(_) => {}
			None if c == '"' || c == '\'' => quote = Some(c),
			None if c == ']' => return Ok(open + 1 + offset),
			None => {}
		}
	}
	Err("unterminated attribute selector".to_string())
}

fn is_ident_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], mut i: usize) -> (String, usize) {
	let start = i;
	while i < chars.len() && is_ident_char(chars[i]) {
		i += 1;
	}
	(chars[start..i].iter().collect(), i)
}

fn parse_compound(part: &str) -> Result<Compound, String> {
	let chars: Vec<char> = part.chars().collect();
	let mut compound = Compound::default();
	let mut i = 0;

	while i < chars.len() {
		match chars[i] {
			'*' if i == 0 => i += 1,
			'#' | '.' => {
				let marker = chars[i];
				let (name, next) = take_ident(&chars, i + 1);
				if name.is_empty() {
					return Err(format!("expected a name after '{}'", marker));
				}
				if marker == '#' {
					compound.id = Some(name);
				} else {
					compound.classes.push(name);
				}
				i = next;
			}
			'[' => {
				let close = find_attribute_end(&chars, i)?;
				let body: String = chars[i + 1..close].iter().collect();
				compound.attributes.push(parse_attribute(&body)?);
				i = close + 1;
			}
			c if is_ident_char(c) && i == 0 => {
				let (name, next) = take_ident(&chars, i);
				compound.tag = Some(name.to_ascii_lowercase());
				i = next;
			}
			c => return Err(format!("unsupported selector syntax '{}'", c)),
		}
	}

	Ok(compound)
}

fn parse_attribute(body: &str) -> Result<AttributeMatch, String> {
	let (name, value) = match body.split_once('=') {
		Some((name, value)) => {
			let value = value.trim();
			let unquoted = value
				.strip_prefix('"')
				.and_then(|v| v.strip_suffix('"'))
				.or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
				.unwrap_or(value);
			(name.trim(), Some(unquoted.to_string()))
		}
		None => (body.trim(), None),
	};
	if name.is_empty() || !name.chars().all(is_ident_char) {
		return Err(format!("invalid attribute name '{}'", name));
	}
	Ok(AttributeMatch {
		name: name.to_ascii_lowercase(),
		value,
	})
}
