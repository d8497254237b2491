//! DOM events and listener handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::node::NodeId;

/// Handle identifying one listener registration.
///
/// Removal goes through this handle, so exactly the callback instance that
/// was registered is removed, and removing it a second time is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Callback invoked for a dispatched event.
pub type Listener = Rc<dyn Fn(&Event)>;

struct EventInner {
	event_type: String,
	target: NodeId,
	current_target: Cell<NodeId>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
	detail: Option<serde_json::Value>,
}

/// A dispatched event.
///
/// Cloning is cheap and every clone observes the same flags, so a listener
/// that forwards the event into a channel hands over the very event the
/// dispatcher is still processing.
#[derive(Clone)]
pub struct Event {
	inner: Rc<EventInner>,
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("type", &self.inner.event_type)
			.field("target", &self.inner.target)
			.field("current_target", &self.inner.current_target.get())
			.field("default_prevented", &self.inner.default_prevented.get())
			.field("propagation_stopped", &self.inner.propagation_stopped.get())
			.finish()
	}
}

impl Event {
	/// Creates an event aimed at `target`.
	pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
		Self::build(event_type.into(), target, None)
	}

	/// Creates an event carrying an arbitrary payload.
	pub fn with_detail(
		event_type: impl Into<String>,
		target: NodeId,
		detail: serde_json::Value,
	) -> Self {
		Self::build(event_type.into(), target, Some(detail))
	}

	fn build(event_type: String, target: NodeId, detail: Option<serde_json::Value>) -> Self {
		Self {
			inner: Rc::new(EventInner {
				event_type,
				target,
				current_target: Cell::new(target),
				default_prevented: Cell::new(false),
				propagation_stopped: Cell::new(false),
				detail,
			}),
		}
	}

	/// Returns the event name, e.g. `click`.
	pub fn event_type(&self) -> &str {
		&self.inner.event_type
	}

	/// Returns the node the event was dispatched at.
	pub fn target(&self) -> NodeId {
		self.inner.target
	}

	/// Returns the node whose listeners are currently running.
	pub fn current_target(&self) -> NodeId {
		self.inner.current_target.get()
	}

	pub(crate) fn set_current_target(&self, node: NodeId) {
		self.inner.current_target.set(node);
	}

	/// Returns the payload, if any.
	pub fn detail(&self) -> Option<&serde_json::Value> {
		self.inner.detail.as_ref()
	}

	/// Suppresses the platform's default action.
	pub fn prevent_default(&self) {
		self.inner.default_prevented.set(true);
	}

	/// Returns true once [`prevent_default`](Self::prevent_default) was called.
	pub fn default_prevented(&self) -> bool {
		self.inner.default_prevented.get()
	}

	/// Stops the event from bubbling past the current node.
	pub fn stop_propagation(&self) {
		self.inner.propagation_stopped.set(true);
	}

	/// Returns true once [`stop_propagation`](Self::stop_propagation) was called.
	pub fn propagation_stopped(&self) -> bool {
		self.inner.propagation_stopped.get()
	}

	/// Returns true if both handles refer to the same dispatched event.
	pub fn same_event(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}
