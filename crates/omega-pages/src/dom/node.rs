//! Node identity and kind.

use std::fmt;

/// Identity of a node inside a [`Document`](super::Document).
///
/// An id stays valid while its node is alive. Discarding a node frees its
/// arena slot for reuse under a new generation, so a stale id never aliases
/// the node that later occupies the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	index: usize,
	generation: u32,
}

impl NodeId {
	pub(crate) const fn new(index: usize, generation: u32) -> Self {
		Self { index, generation }
	}

	/// Returns the raw arena index.
	pub fn index(self) -> usize {
		self.index
	}

	/// Returns how many times the arena slot had been freed when this id was
	/// issued.
	pub fn generation(self) -> u32 {
		self.generation
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.generation {
			0 => write!(f, "#{}", self.index),
			generation => write!(f, "#{}v{}", self.index, generation),
		}
	}
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// An element with a tag, attributes and children.
	Element,
	/// A text node carrying a string payload.
	Text,
}
