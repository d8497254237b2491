//! In-memory document.
//!
//! [`Document`] is the DOM boundary of the toolkit: the event bridge registers
//! listeners on it and the reconciler mutates it. It is an arena of nodes
//! behind a shared handle, which makes it usable both as the platform DOM in
//! tests and as a staging tree that a browser binding mirrors.
//!
//! Listeners run outside the internal borrow, so a callback may freely read
//! or mutate the document it was registered on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::event::{Event, Listener, ListenerId};
use super::markup::{self, MarkupError};
use super::node::{NodeId, NodeKind};
use super::selector::{ElementLookup, Selector};
use super::vnode::{TEXT_NODE_NAME, VElement, VNode};

/// Errors produced by document operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
	/// The node id does not belong to this document.
	#[error("unknown node {0}")]
	UnknownNode(NodeId),
	/// The operation requires an element.
	#[error("node {0} is not an element")]
	NotAnElement(NodeId),
	/// The insertion would create a cycle or attach to a text node.
	#[error("cannot insert {child} into {parent}: {reason}")]
	HierarchyRequest {
		/// The intended parent.
		parent: NodeId,
		/// The node being inserted.
		child: NodeId,
		/// Why the insertion is invalid.
		reason: &'static str,
	},
	/// The reference node is not a child of the parent.
	#[error("node {reference} is not a child of {parent}")]
	NotAChild {
		/// The parent that was searched.
		parent: NodeId,
		/// The node that was expected among its children.
		reference: NodeId,
	},
	/// The selector could not be parsed.
	#[error("invalid selector {selector:?}: {reason}")]
	InvalidSelector {
		/// The selector text.
		selector: String,
		/// The parse failure.
		reason: String,
	},
	/// Markup handed to `set_inner_html` was malformed.
	#[error(transparent)]
	Markup(#[from] MarkupError),
}

enum NodeData {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
	},
	Text(String),
}

struct ListenerEntry {
	id: ListenerId,
	event_type: String,
	callback: Listener,
}

struct NodeSlot {
	data: NodeData,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	listeners: Vec<ListenerEntry>,
}

struct Entry {
	generation: u32,
	slot: Option<NodeSlot>,
}

struct Tree {
	entries: Vec<Entry>,
	free: Vec<usize>,
	body: NodeId,
	next_listener: u64,
}

impl Tree {
	fn get(&self, node: NodeId) -> Option<&NodeSlot> {
		let entry = self.entries.get(node.index())?;
		if entry.generation != node.generation() {
			return None;
		}
		entry.slot.as_ref()
	}

	fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeSlot> {
		let entry = self.entries.get_mut(node.index())?;
		if entry.generation != node.generation() {
			return None;
		}
		entry.slot.as_mut()
	}

	fn slot(&self, node: NodeId) -> Result<&NodeSlot, DomError> {
		self.get(node).ok_or(DomError::UnknownNode(node))
	}

	fn slot_mut(&mut self, node: NodeId) -> Result<&mut NodeSlot, DomError> {
		self.get_mut(node).ok_or(DomError::UnknownNode(node))
	}

	fn live_count(&self) -> usize {
		self.entries.len() - self.free.len()
	}

	fn alloc(&mut self, data: NodeData) -> NodeId {
		let slot = NodeSlot {
			data,
			parent: None,
			children: Vec::new(),
			listeners: Vec::new(),
		};
		match self.free.pop() {
			Some(index) => {
				let entry = &mut self.entries[index];
				entry.slot = Some(slot);
				NodeId::new(index, entry.generation)
			}
			None => {
				self.entries.push(Entry {
					generation: 0,
					slot: Some(slot),
				});
				NodeId::new(self.entries.len() - 1, 0)
			}
		}
	}

	// Frees a node and its subtree. The caller detaches it first.
	fn release(&mut self, node: NodeId) -> usize {
		let Some(entry) = self.entries.get_mut(node.index()) else {
			return 0;
		};
		if entry.generation != node.generation() {
			return 0;
		}
		let Some(slot) = entry.slot.take() else {
			return 0;
		};
		entry.generation = entry.generation.wrapping_add(1);
		self.free.push(node.index());

		let mut released = 1;
		for child in slot.children {
			released += self.release(child);
		}
		released
	}

	fn push_child(&mut self, parent: NodeId, child: NodeId) {
		if let Some(slot) = self.get_mut(child) {
			slot.parent = Some(parent);
		}
		if let Some(slot) = self.get_mut(parent) {
			slot.children.push(child);
		}
	}

	fn alloc_vnode(&mut self, vnode: &VNode) -> NodeId {
		match vnode {
			VNode::Text(text) => self.alloc(NodeData::Text(text.clone())),
			VNode::Element(element) => {
				let id = self.alloc(NodeData::Element {
					tag: element.tag.clone(),
					attributes: element.attributes.clone(),
				});
				for child in &element.children {
					let child_id = self.alloc_vnode(child);
					self.push_child(id, child_id);
				}
				id
			}
		}
	}

	fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
		let Some(parent) = self.slot(node)?.parent else {
			return Ok(());
		};
		if let Some(slot) = self.get_mut(parent) {
			slot.children.retain(|&child| child != node);
		}
		self.slot_mut(node)?.parent = None;
		Ok(())
	}

	fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
		let mut current = Some(node);
		while let Some(id) = current {
			if id == ancestor {
				return true;
			}
			current = self.get(id).and_then(|slot| slot.parent);
		}
		false
	}

	fn text_content(&self, node: NodeId, out: &mut String) {
		let Some(slot) = self.get(node) else {
			return;
		};
		match &slot.data {
			NodeData::Text(text) => out.push_str(text),
			NodeData::Element { .. } => {
				for &child in &slot.children {
					self.text_content(child, out);
				}
			}
		}
	}

	fn snapshot(&self, node: NodeId) -> Result<VNode, DomError> {
		let slot = self.slot(node)?;
		Ok(match &slot.data {
			NodeData::Text(text) => VNode::Text(text.clone()),
			NodeData::Element { tag, attributes } => VNode::Element(VElement {
				tag: tag.clone(),
				attributes: attributes.clone(),
				children: slot
					.children
					.iter()
					.map(|&child| self.snapshot(child))
					.collect::<Result<_, _>>()?,
			}),
		})
	}

	fn write_html(&self, node: NodeId, out: &mut String) {
		let Some(slot) = self.get(node) else {
			return;
		};
		match &slot.data {
			NodeData::Text(text) => out.push_str(&markup::escape_text(text)),
			NodeData::Element { tag, attributes } => {
				markup::write_open_tag(
					out,
					tag,
					attributes.iter().map(|(n, v)| (n.as_str(), v.as_str())),
				);
				for &child in &slot.children {
					self.write_html(child, out);
				}
				markup::write_close_tag(out, tag);
			}
		}
	}

	fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
		if let Some(slot) = self.get(node) {
			for &child in &slot.children {
				out.push(child);
				self.collect_descendants(child, out);
			}
		}
	}
}

impl ElementLookup for Tree {
	fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.get(node)?.data {
			NodeData::Element { tag, .. } => Some(tag),
			NodeData::Text(_) => None,
		}
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.get(node)?.data {
			NodeData::Element { attributes, .. } => attributes
				.iter()
				.find(|(n, _)| n == name)
				.map(|(_, v)| v.as_str()),
			NodeData::Text(_) => None,
		}
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.parent
	}
}

/// Shared handle to an in-memory document.
#[derive(Clone)]
pub struct Document {
	tree: Rc<RefCell<Tree>>,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tree = self.tree.borrow();
		f.debug_struct("Document")
			.field("nodes", &tree.live_count())
			.field("body", &tree.body)
			.finish()
	}
}

impl Document {
	/// Creates a document containing an empty `<body>` element.
	pub fn new() -> Self {
		let mut tree = Tree {
			entries: Vec::new(),
			free: Vec::new(),
			body: NodeId::new(0, 0),
			next_listener: 1,
		};
		tree.body = tree.alloc(NodeData::Element {
			tag: "body".to_string(),
			attributes: Vec::new(),
		});
		Self {
			tree: Rc::new(RefCell::new(tree)),
		}
	}

	/// Returns the `<body>` element.
	pub fn body(&self) -> NodeId {
		self.tree.borrow().body
	}

	/// Returns true if both handles refer to the same document.
	pub fn same_document(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.tree, &other.tree)
	}

	/// Returns true if the id refers to a live node of this document.
	pub fn contains(&self, node: NodeId) -> bool {
		self.tree.borrow().get(node).is_some()
	}

	/// Returns the number of live nodes, attached or not.
	pub fn node_count(&self) -> usize {
		self.tree.borrow().live_count()
	}

	/// Creates a detached element.
	pub fn create_element(&self, tag: &str) -> NodeId {
		self.tree.borrow_mut().alloc(NodeData::Element {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
		})
	}

	/// Creates a detached text node.
	pub fn create_text(&self, text: &str) -> NodeId {
		self.tree
			.borrow_mut()
			.alloc(NodeData::Text(text.to_string()))
	}

	/// Builds a detached subtree from a virtual node.
	pub fn materialize(&self, vnode: &VNode) -> NodeId {
		self.tree.borrow_mut().alloc_vnode(vnode)
	}

	/// Converts a live subtree back into a virtual node.
	pub fn snapshot(&self, node: NodeId) -> Result<VNode, DomError> {
		self.tree.borrow().snapshot(node)
	}

	/// Returns the node kind.
	pub fn node_kind(&self, node: NodeId) -> Result<NodeKind, DomError> {
		Ok(match self.tree.borrow().slot(node)?.data {
			NodeData::Element { .. } => NodeKind::Element,
			NodeData::Text(_) => NodeKind::Text,
		})
	}

	/// Returns the DOM `nodeName`: the upper-case tag, or `#text`.
	pub fn node_name(&self, node: NodeId) -> Result<String, DomError> {
		Ok(match &self.tree.borrow().slot(node)?.data {
			NodeData::Element { tag, .. } => tag.to_ascii_uppercase(),
			NodeData::Text(_) => TEXT_NODE_NAME.to_string(),
		})
	}

	/// Returns the lower-case tag of an element.
	pub fn tag_name(&self, node: NodeId) -> Option<String> {
		self.tree.borrow().tag(node).map(str::to_string)
	}

	/// Returns the parent, if attached.
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		ElementLookup::parent(&*self.tree.borrow(), node)
	}

	/// Returns the children in order.
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.tree
			.borrow()
			.get(node)
			.map(|slot| slot.children.clone())
			.unwrap_or_default()
	}

	/// Returns the child at `index`.
	pub fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
		self.tree
			.borrow()
			.get(node)
			.and_then(|slot| slot.children.get(index).copied())
	}

	/// Returns the number of children.
	pub fn child_count(&self, node: NodeId) -> usize {
		self.tree
			.borrow()
			.get(node)
			.map_or(0, |slot| slot.children.len())
	}

	/// Appends `child` to `parent`, detaching it from any previous parent.
	pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
		self.insert_before(parent, child, None)
	}

	/// Inserts `child` before `reference` (or at the end when `None`),
	/// detaching it from any previous parent.
	///
	/// # Errors
	///
	/// Fails if either node is unknown, if `parent` is a text node, if the
	/// insertion would create a cycle, or if `reference` is not a child of
	/// `parent`.
	pub fn insert_before(
		&self,
		parent: NodeId,
		child: NodeId,
		reference: Option<NodeId>,
	) -> Result<(), DomError> {
		let mut tree = self.tree.borrow_mut();
		tree.slot(child)?;
		if !matches!(tree.slot(parent)?.data, NodeData::Element { .. }) {
			return Err(DomError::HierarchyRequest {
				parent,
				child,
				reason: "parent is not an element",
			});
		}
		if tree.is_inclusive_ancestor(child, parent) {
			return Err(DomError::HierarchyRequest {
				parent,
				child,
				reason: "node is an ancestor of the parent",
			});
		}
		if let Some(reference) = reference {
			if reference == child {
				return Ok(());
			}
			if tree.slot(reference)?.parent != Some(parent) {
				return Err(DomError::NotAChild { parent, reference });
			}
		}

		tree.detach(child)?;
		let siblings = &mut tree.slot_mut(parent)?.children;
		let index = reference
			.and_then(|reference| siblings.iter().position(|&c| c == reference))
			.unwrap_or(siblings.len());
		siblings.insert(index, child);
		tree.slot_mut(child)?.parent = Some(parent);
		Ok(())
	}

	/// Detaches a node from its parent. Detached nodes keep their subtree
	/// and listeners, and may be inserted again.
	pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
		self.tree.borrow_mut().detach(node)
	}

	/// Detaches a node and frees it together with its subtree and listeners.
	///
	/// Returns the number of nodes freed. Ids of freed nodes become stale:
	/// lookups through them fail or return nothing.
	///
	/// # Errors
	///
	/// Fails if the node is unknown or is the `<body>`.
	pub fn discard(&self, node: NodeId) -> Result<usize, DomError> {
		let mut tree = self.tree.borrow_mut();
		if node == tree.body {
			return Err(DomError::HierarchyRequest {
				parent: node,
				child: node,
				reason: "the body cannot be discarded",
			});
		}
		tree.detach(node)?;
		Ok(tree.release(node))
	}

	/// Returns an attribute value.
	pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
		self.tree
			.borrow()
			.attribute(node, name)
			.map(str::to_string)
	}

	/// Returns true if the attribute is present.
	pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
		self.tree.borrow().attribute(node, name).is_some()
	}

	/// Returns the attributes in order.
	pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
		match self.tree.borrow().get(node).map(|slot| &slot.data) {
			Some(NodeData::Element { attributes, .. }) => attributes.clone(),
			_ => Vec::new(),
		}
	}

	/// Returns the attribute names in order.
	pub fn attribute_names(&self, node: NodeId) -> Vec<String> {
		self.attributes(node).into_iter().map(|(n, _)| n).collect()
	}

	/// Sets an attribute, keeping its position if it already exists.
	pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
		let mut tree = self.tree.borrow_mut();
		match &mut tree.slot_mut(node)?.data {
			NodeData::Element { attributes, .. } => {
				match attributes.iter_mut().find(|(n, _)| n == name) {
					Some(slot) => slot.1 = value.to_string(),
					None => attributes.push((name.to_string(), value.to_string())),
				}
				Ok(())
			}
			NodeData::Text(_) => Err(DomError::NotAnElement(node)),
		}
	}

	/// Removes an attribute. Returns whether it was present.
	pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<bool, DomError> {
		let mut tree = self.tree.borrow_mut();
		match &mut tree.slot_mut(node)?.data {
			NodeData::Element { attributes, .. } => {
				let before = attributes.len();
				attributes.retain(|(n, _)| n != name);
				Ok(attributes.len() != before)
			}
			NodeData::Text(_) => Err(DomError::NotAnElement(node)),
		}
	}

	/// Returns the concatenated text of the subtree.
	pub fn text_content(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.tree.borrow().text_content(node, &mut out);
		out
	}

	/// Replaces the text of a text node, or replaces all children of an
	/// element with a single text node (none if `text` is empty). The
	/// replaced children are freed.
	pub fn set_text_content(&self, node: NodeId, text: &str) -> Result<(), DomError> {
		let mut tree = self.tree.borrow_mut();
		let is_element = match &mut tree.slot_mut(node)?.data {
			NodeData::Text(data) => {
				*data = text.to_string();
				false
			}
			NodeData::Element { .. } => true,
		};
		if is_element {
			for child in std::mem::take(&mut tree.slot_mut(node)?.children) {
				tree.release(child);
			}
			if !text.is_empty() {
				let text_node = tree.alloc(NodeData::Text(text.to_string()));
				tree.push_child(node, text_node);
			}
		}
		Ok(())
	}

	/// Serializes the children of a node.
	pub fn inner_html(&self, node: NodeId) -> String {
		let tree = self.tree.borrow();
		let mut out = String::new();
		if let Some(slot) = tree.get(node) {
			for &child in &slot.children {
				tree.write_html(child, &mut out);
			}
		}
		out
	}

	/// Serializes a node and its subtree.
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.tree.borrow().write_html(node, &mut out);
		out
	}

	/// Replaces the children of an element with parsed markup. The previous
	/// children are freed.
	///
	/// Returns the new top-level children.
	pub fn set_inner_html(&self, node: NodeId, source: &str) -> Result<Vec<NodeId>, DomError> {
		let nodes = markup::parse_fragment(source)?;
		if self.node_kind(node)? != NodeKind::Element {
			return Err(DomError::NotAnElement(node));
		}
		self.set_text_content(node, "")?;
		let mut inserted = Vec::with_capacity(nodes.len());
		for vnode in &nodes {
			let child = self.materialize(vnode);
			self.append_child(node, child)?;
			inserted.push(child);
		}
		Ok(inserted)
	}

	/// Registers a listener and returns its handle.
	pub fn add_event_listener<F>(
		&self,
		node: NodeId,
		event_type: &str,
		callback: F,
	) -> Result<ListenerId, DomError>
	where
		F: Fn(&Event) + 'static,
	{
		let mut tree = self.tree.borrow_mut();
		let id = ListenerId(tree.next_listener);
		tree.slot_mut(node)?.listeners.push(ListenerEntry {
			id,
			event_type: event_type.to_string(),
			callback: Rc::new(callback),
		});
		tree.next_listener += 1;
		Ok(id)
	}

	/// Removes a listener. Returns whether it was registered.
	pub fn remove_event_listener(&self, node: NodeId, event_type: &str, id: ListenerId) -> bool {
		let mut tree = self.tree.borrow_mut();
		let Some(slot) = tree.get_mut(node) else {
			return false;
		};
		let before = slot.listeners.len();
		slot.listeners
			.retain(|entry| !(entry.id == id && entry.event_type == event_type));
		slot.listeners.len() != before
	}

	/// Returns the number of listeners for `event_type` on a node.
	pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
		self.tree
			.borrow()
			.get(node)
			.map_or(0, |slot| {
				slot.listeners
					.iter()
					.filter(|entry| entry.event_type == event_type)
					.count()
			})
	}

	/// Returns the number of listeners registered anywhere in the document.
	pub fn total_listener_count(&self) -> usize {
		self.tree
			.borrow()
			.entries
			.iter()
			.filter_map(|entry| entry.slot.as_ref())
			.map(|slot| slot.listeners.len())
			.sum()
	}

	/// Dispatches a bubbling event of `event_type` at `target`.
	pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> Result<Event, DomError> {
		self.dispatch(Event::new(event_type, target))
	}

	/// Dispatches an event at its target, bubbling through the ancestors until
	/// a listener stops propagation. Returns the event so callers can inspect
	/// whether the default action was prevented.
	pub fn dispatch(&self, event: Event) -> Result<Event, DomError> {
		let path = {
			let tree = self.tree.borrow();
			tree.slot(event.target())?;
			let mut path = vec![event.target()];
			let mut current = tree.parent(event.target());
			while let Some(node) = current {
				path.push(node);
				current = tree.parent(node);
			}
			path
		};

		for node in path {
			// A listener may have discarded this node.
			let callbacks: Vec<Listener> = match self.tree.borrow().get(node) {
				Some(slot) => slot
					.listeners
					.iter()
					.filter(|entry| entry.event_type == event.event_type())
					.map(|entry| Rc::clone(&entry.callback))
					.collect(),
				None => continue,
			};
			event.set_current_target(node);
			for callback in callbacks {
				callback(&event);
			}
			if event.propagation_stopped() {
				break;
			}
		}

		Ok(event)
	}

	/// Returns the descendants of `root` matching `selector`, in document order.
	pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
		let parsed = Selector::parse(selector).map_err(|reason| DomError::InvalidSelector {
			selector: selector.to_string(),
			reason,
		})?;
		let tree = self.tree.borrow();
		tree.slot(root)?;
		let mut descendants = Vec::new();
		tree.collect_descendants(root, &mut descendants);
		Ok(descendants
			.into_iter()
			.filter(|&node| parsed.matches(&*tree, node))
			.collect())
	}

	/// Returns the first descendant of `root` matching `selector`.
	pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
		Ok(self.query_selector_all(root, selector)?.into_iter().next())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use std::cell::RefCell;

	#[fixture]
	fn document() -> Document {
		Document::new()
	}

	fn mount(document: &Document, source: &str) -> NodeId {
		let node = document.materialize(&VNode::parse(source).unwrap());
		document.append_child(document.body(), node).unwrap();
		node
	}

	#[rstest]
	fn test_materialize_and_serialize(document: Document) {
		let node = mount(&document, "<ul class=\"l\"><li>a</li><li>b</li></ul>");

		assert_eq!(document.child_count(node), 2);
		assert_eq!(document.node_name(node).unwrap(), "UL");
		assert_eq!(document.text_content(node), "ab");
		assert_eq!(
			document.outer_html(document.body()),
			"<body><ul class=\"l\"><li>a</li><li>b</li></ul></body>"
		);
	}

	#[rstest]
	fn test_insert_before_and_remove(document: Document) {
		let list = mount(&document, "<ul><li>a</li><li>c</li></ul>");
		let c = document.child_at(list, 1).unwrap();
		let b = document.materialize(&VNode::parse("<li>b</li>").unwrap());

		document.insert_before(list, b, Some(c)).unwrap();
		assert_eq!(document.inner_html(list), "<li>a</li><li>b</li><li>c</li>");

		document.remove(c).unwrap();
		assert_eq!(document.parent(c), None);
		assert_eq!(document.inner_html(list), "<li>a</li><li>b</li>");
	}

	#[rstest]
	fn test_insert_rejects_cycles_and_foreign_reference(document: Document) {
		let outer = mount(&document, "<div><p></p></div>");
		let inner = document.child_at(outer, 0).unwrap();
		let stranger = document.create_element("span");

		assert!(matches!(
			document.append_child(inner, outer),
			Err(DomError::HierarchyRequest { .. })
		));
		assert!(matches!(
			document.insert_before(outer, stranger, Some(stranger)),
			Ok(())
		));
		let other = document.create_element("em");
		assert_eq!(
			document.insert_before(outer, other, Some(document.body())),
			Err(DomError::NotAChild {
				parent: outer,
				reference: document.body()
			})
		);
	}

	#[rstest]
	fn test_attributes_keep_position(document: Document) {
		let node = mount(&document, "<a id=\"x\" href=\"/\"></a>");
		document.set_attribute(node, "id", "y").unwrap();
		document.set_attribute(node, "title", "t").unwrap();
		assert!(document.remove_attribute(node, "href").unwrap());
		assert!(!document.remove_attribute(node, "href").unwrap());

		assert_eq!(
			document.attributes(node),
			vec![
				("id".to_string(), "y".to_string()),
				("title".to_string(), "t".to_string())
			]
		);
	}

	#[rstest]
	fn test_text_node_rejects_attributes(document: Document) {
		let text = document.create_text("x");
		assert_eq!(
			document.set_attribute(text, "id", "1"),
			Err(DomError::NotAnElement(text))
		);
	}

	#[rstest]
	fn test_set_text_content_replaces_children(document: Document) {
		let node = mount(&document, "<p><b>x</b>y</p>");
		document.set_text_content(node, "plain").unwrap();
		assert_eq!(document.inner_html(node), "plain");

		document.set_text_content(node, "").unwrap();
		assert_eq!(document.child_count(node), 0);
	}

	#[rstest]
	fn test_set_inner_html(document: Document) {
		let node = mount(&document, "<div>old</div>");
		let inserted = document
			.set_inner_html(node, "<span>1</span><span>2</span>")
			.unwrap();

		assert_eq!(inserted.len(), 2);
		assert_eq!(document.inner_html(node), "<span>1</span><span>2</span>");
		assert!(document.set_inner_html(node, "<span>").is_err());
	}

	#[rstest]
	fn test_dispatch_bubbles_until_stopped(document: Document) {
		let outer = mount(&document, "<div><button>go</button></div>");
		let button = document.child_at(outer, 0).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));

		for (node, name) in [(button, "button"), (outer, "div"), (document.body(), "body")] {
			let log = Rc::clone(&log);
			document
				.add_event_listener(node, "click", move |event| {
					log.borrow_mut().push((name, event.current_target()));
					if name == "div" {
						event.stop_propagation();
					}
				})
				.unwrap();
		}

		let event = document.dispatch_event(button, "click").unwrap();
		assert_eq!(*log.borrow(), vec![("button", button), ("div", outer)]);
		assert!(event.propagation_stopped());
		assert!(!event.default_prevented());
	}

	#[rstest]
	fn test_remove_listener_exactly_once(document: Document) {
		let node = mount(&document, "<button></button>");
		let hits = Rc::new(RefCell::new(0));
		let id = document
			.add_event_listener(node, "click", {
				let hits = Rc::clone(&hits);
				move |_| *hits.borrow_mut() += 1
			})
			.unwrap();

		document.dispatch_event(node, "click").unwrap();
		assert!(!document.remove_event_listener(node, "input", id));
		assert!(document.remove_event_listener(node, "click", id));
		assert!(!document.remove_event_listener(node, "click", id));
		document.dispatch_event(node, "click").unwrap();

		assert_eq!(*hits.borrow(), 1);
		assert_eq!(document.total_listener_count(), 0);
	}

	#[rstest]
	fn test_listener_may_mutate_document(document: Document) {
		let node = mount(&document, "<button>0</button>");
		let doc = document.clone();
		document
			.add_event_listener(node, "click", move |event| {
				let target = event.target();
				let next = doc.text_content(target).parse::<u32>().unwrap() + 1;
				doc.set_text_content(target, &next.to_string()).unwrap();
			})
			.unwrap();

		document.dispatch_event(node, "click").unwrap();
		document.dispatch_event(node, "click").unwrap();
		assert_eq!(document.text_content(node), "2");
	}

	#[rstest]
	fn test_query_selector_all(document: Document) {
		let root = mount(
			&document,
			"<div><a class=\"btn\">1</a><p><a class=\"btn big\">2</a></p><a>3</a></div>",
		);

		let found = document.query_selector_all(root, "a.btn").unwrap();
		let texts: Vec<String> = found.iter().map(|&n| document.text_content(n)).collect();
		assert_eq!(texts, vec!["1", "2"]);

		let nested = document.query_selector(root, "p .big").unwrap();
		assert_eq!(nested, Some(found[1]));
		assert!(matches!(
			document.query_selector_all(root, "a > b"),
			Err(DomError::InvalidSelector { .. })
		));
	}

	#[rstest]
	fn test_repeated_inner_html_reuses_freed_slots(document: Document) {
		let node = mount(&document, "<div></div>");
		let first = document
			.set_inner_html(node, "<ul><li>a</li><li>b</li></ul>")
			.unwrap();

		for _ in 0..1000 {
			document
				.set_inner_html(node, "<ul><li>a</li><li>b</li></ul>")
				.unwrap();
		}

		assert_eq!(document.node_count(), 7);
		assert!(!document.contains(first[0]));
		assert_eq!(document.text_content(first[0]), "");
		let live = document.child_at(node, 0).unwrap();
		assert!(live.index() < 7);
		assert_ne!(live, first[0]);
	}

	#[rstest]
	fn test_stale_id_does_not_alias_reused_slot(document: Document) {
		let list = mount(&document, "<ul><li>a</li></ul>");
		let item = document.child_at(list, 0).unwrap();
		let hits = Rc::new(RefCell::new(0));
		document
			.add_event_listener(item, "click", {
				let hits = Rc::clone(&hits);
				move |_| *hits.borrow_mut() += 1
			})
			.unwrap();

		assert_eq!(document.discard(item).unwrap(), 2);
		let fresh = document.create_element("li");
		document.append_child(list, fresh).unwrap();

		assert_eq!(document.total_listener_count(), 0);
		assert!(!document.remove_event_listener(item, "click", ListenerId(1)));
		assert_eq!(document.parent(item), None);
		assert_eq!(
			document.append_child(list, item),
			Err(DomError::UnknownNode(item))
		);
		document.dispatch_event(fresh, "click").unwrap();
		assert_eq!(*hits.borrow(), 0);
		assert!(document.discard(document.body()).is_err());
	}

	#[rstest]
	fn test_set_text_content_frees_old_children(document: Document) {
		let node = mount(&document, "<p><b>x</b>y</p>");
		let bold = document.child_at(node, 0).unwrap();

		document.set_text_content(node, "z").unwrap();

		assert!(!document.contains(bold));
		assert_eq!(document.node_count(), 3);
	}

	#[rstest]
	fn test_query_selector_with_spaced_attribute_value(document: Document) {
		let root = mount(
			&document,
			"<div><p title=\"a b\">1</p><p title=\"a\">2</p></div>",
		);

		let found = document.query_selector(root, "p[title=\"a b\"]").unwrap();

		assert_eq!(found, document.child_at(root, 0));
	}

	#[rstest]
	fn test_snapshot_round_trips(document: Document) {
		let vnode = VNode::parse("<section id=\"s\"><h1>t</h1><p>b</p></section>").unwrap();
		let node = document.materialize(&vnode);
		assert_eq!(document.snapshot(node).unwrap(), vnode);
	}
}
