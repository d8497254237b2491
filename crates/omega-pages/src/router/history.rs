//! History provider.
//!
//! The router never touches the address bar itself. It records navigations
//! through a [`HistoryProvider`] taken from the platform context; in a
//! browser that is a thin wrapper over `history.pushState`, and everywhere
//! else [`MemoryHistory`] keeps the entries in memory.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

/// Error reported by a history provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("history operation failed: {0}")]
pub struct HistoryError(pub String);

/// One history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
	/// The URL of the entry.
	pub path: String,
	/// Opaque application state stored with the entry.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
}

impl HistoryState {
	/// Creates an entry without state.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			data: None,
		}
	}

	/// Attaches opaque state.
	pub fn with_data(mut self, data: serde_json::Value) -> Self {
		self.data = Some(data);
		self
	}
}

/// The operations the router needs from browser history.
pub trait HistoryProvider {
	/// Pushes a new entry.
	fn push_state(&self, state: HistoryState) -> Result<(), HistoryError>;

	/// Replaces the current entry.
	fn replace_state(&self, state: HistoryState) -> Result<(), HistoryError>;

	/// Returns the path of the current entry.
	fn current_path(&self) -> String;

	/// Moves one entry back.
	fn go_back(&self) -> Result<(), HistoryError>;
}

/// In-memory history.
#[derive(Debug)]
pub struct MemoryHistory {
	entries: RefCell<Vec<HistoryState>>,
	index: Cell<usize>,
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl MemoryHistory {
	/// Creates a history whose only entry is `initial_path`.
	pub fn new(initial_path: impl Into<String>) -> Self {
		Self {
			entries: RefCell::new(vec![HistoryState::new(initial_path)]),
			index: Cell::new(0),
		}
	}

	/// Returns all entries, oldest first.
	pub fn entries(&self) -> Vec<HistoryState> {
		self.entries.borrow().clone()
	}

	/// Returns the current entry.
	pub fn current_state(&self) -> Option<HistoryState> {
		self.entries.borrow().get(self.index.get()).cloned()
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Always false: a history has at least its initial entry.
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}
}

impl HistoryProvider for MemoryHistory {
	fn push_state(&self, state: HistoryState) -> Result<(), HistoryError> {
		let mut entries = self.entries.borrow_mut();
		// Pushing discards the forward entries.
		entries.truncate(self.index.get() + 1);
		entries.push(state);
		self.index.set(entries.len() - 1);
		Ok(())
	}

	fn replace_state(&self, state: HistoryState) -> Result<(), HistoryError> {
		let mut entries = self.entries.borrow_mut();
		match entries.get_mut(self.index.get()) {
			Some(entry) => *entry = state,
			None => entries.push(state),
		}
		Ok(())
	}

	fn current_path(&self) -> String {
		self.current_state()
			.map(|state| state.path)
			.unwrap_or_else(|| "/".to_string())
	}

	fn go_back(&self) -> Result<(), HistoryError> {
		match self.index.get() {
			0 => Err(HistoryError("no previous entry".to_string())),
			index => {
				self.index.set(index - 1);
				Ok(())
			}
		}
	}
}
