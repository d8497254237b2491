//! DOM Reconciliation
//!
//! [`reconcile`] mutates a live subtree in place until it matches a target
//! [`VNode`] tree. Nodes whose identity (node kind and tag) agrees are
//! patched: attributes are removed or rewritten, children are reconciled by
//! position, surplus trailing children are removed. Nodes whose identity
//! differs are replaced wholesale by a freshly materialized subtree.
//!
//! ## Characteristics
//!
//! - Children are compared by index only. There is no keyed or LCS matching,
//!   so inserting at the front of a list replaces every following sibling
//!   whose tag differs from its new neighbour.
//! - Text is never diffed character by character; a differing text node is
//!   rewritten whole, and an element whose target has no children loses all
//!   of its children.
//! - Patched nodes keep their [`NodeId`], so listeners registered on them
//!   survive the pass. Replaced and surplus nodes are freed and their ids go
//!   stale.
//! - Reconciling the result against the same target again changes nothing.

use std::fmt;

use crate::dom::{Document, DomError, NodeId, VElement, VNode};
use crate::{debug_log, warn_log};

/// What happened to the node passed to [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
	/// The live node was kept and patched in place.
	Patched,
	/// The live node was replaced by the returned node.
	Replaced(NodeId),
	/// Nothing was done: there was no target, or a detached root would have
	/// needed replacing.
	Skipped,
}

/// Mutation counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
	/// Attributes removed from live elements.
	pub attributes_removed: usize,
	/// Attributes added or rewritten.
	pub attributes_set: usize,
	/// Text payloads rewritten or element contents cleared.
	pub texts_set: usize,
	/// Subtrees replaced because their identity differed.
	pub replaced: usize,
	/// Target children appended past the end of a live child list.
	pub appended: usize,
	/// Surplus live children removed.
	pub removed: usize,
}

impl ReconcileStats {
	/// Returns the total number of mutations.
	pub fn total(&self) -> usize {
		self.attributes_removed
			+ self.attributes_set
			+ self.texts_set
			+ self.replaced
			+ self.appended
			+ self.removed
	}

	/// Returns true if the pass did not mutate anything.
	pub fn is_noop(&self) -> bool {
		self.total() == 0
	}
}

impl fmt::Display for ReconcileStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"-{} +{} attrs, {} texts, {} replaced, {} appended, {} removed",
			self.attributes_removed,
			self.attributes_set,
			self.texts_set,
			self.replaced,
			self.appended,
			self.removed
		)
	}
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
	/// What happened to the root of the pass.
	pub outcome: ReconcileOutcome,
	/// Mutations performed anywhere in the subtree.
	pub stats: ReconcileStats,
}

impl ReconcileReport {
	/// Returns the node that now stands where `live` stood.
	pub fn node(&self, live: NodeId) -> NodeId {
		match self.outcome {
			ReconcileOutcome::Replaced(node) => node,
			ReconcileOutcome::Patched | ReconcileOutcome::Skipped => live,
		}
	}
}

/// Brings the subtree at `live` in line with `target`.
///
/// A `None` target leaves the tree untouched and reports
/// [`ReconcileOutcome::Skipped`].
///
/// # Errors
///
/// Returns [`DomError`] if `live` is not part of `document`.
pub fn reconcile(
	document: &Document,
	live: NodeId,
	target: Option<&VNode>,
) -> Result<ReconcileReport, DomError> {
	let mut stats = ReconcileStats::default();
	let outcome = match target {
		Some(target) => patch(document, live, target, &mut stats)?,
		None => ReconcileOutcome::Skipped,
	};
	debug_log!("reconciled {}: {:?}, {}", live, outcome, stats);
	Ok(ReconcileReport { outcome, stats })
}

fn patch(
	document: &Document,
	live: NodeId,
	target: &VNode,
	stats: &mut ReconcileStats,
) -> Result<ReconcileOutcome, DomError> {
	if document.node_name(live)? != target.node_name() {
		return replace(document, live, target, stats);
	}

	match target {
		VNode::Text(text) => {
			if document.text_content(live) != *text {
				document.set_text_content(live, text)?;
				stats.texts_set += 1;
			}
		}
		VNode::Element(element) => {
			patch_attributes(document, live, element, stats)?;
			patch_children(document, live, element, stats)?;
		}
	}
	Ok(ReconcileOutcome::Patched)
}

fn replace(
	document: &Document,
	live: NodeId,
	target: &VNode,
	stats: &mut ReconcileStats,
) -> Result<ReconcileOutcome, DomError> {
	let Some(parent) = document.parent(live) else {
		warn_log!(
			"cannot replace detached node {} ({} with {})",
			live,
			document.node_name(live)?,
			target.node_name()
		);
		return Ok(ReconcileOutcome::Skipped);
	};

	let replacement = document.materialize(target);
	document.insert_before(parent, replacement, Some(live))?;
	document.discard(live)?;
	stats.replaced += 1;
	Ok(ReconcileOutcome::Replaced(replacement))
}

fn patch_attributes(
	document: &Document,
	live: NodeId,
	target: &VElement,
	stats: &mut ReconcileStats,
) -> Result<(), DomError> {
	for name in document.attribute_names(live) {
		if !target.has_attribute(&name) {
			document.remove_attribute(live, &name)?;
			stats.attributes_removed += 1;
		}
	}
	for (name, value) in &target.attributes {
		if document.get_attribute(live, name).as_deref() != Some(value.as_str()) {
			document.set_attribute(live, name, value)?;
			stats.attributes_set += 1;
		}
	}
	Ok(())
}

fn patch_children(
	document: &Document,
	live: NodeId,
	target: &VElement,
	stats: &mut ReconcileStats,
) -> Result<(), DomError> {
	if target.children.is_empty() {
		if document.child_count(live) > 0 {
			document.set_text_content(live, "")?;
			stats.texts_set += 1;
		}
		return Ok(());
	}

	// A replacement takes the index of the node it replaces, so live and
	// target positions stay aligned throughout the walk.
	for (index, child) in target.children.iter().enumerate() {
		match document.child_at(live, index) {
			Some(live_child) => {
				patch(document, live_child, child, stats)?;
			}
			None => {
				let node = document.materialize(child);
				document.append_child(live, node)?;
				stats.appended += 1;
			}
		}
	}

	for surplus in document
		.children(live)
		.into_iter()
		.skip(target.children.len())
	{
		document.discard(surplus)?;
		stats.removed += 1;
	}
	Ok(())
}
