//! Event Channel Bridge
//!
//! [`EventChannelBridge`] turns DOM events on one or more elements into a
//! single [`Channel`] of [`Event`]s. Each bound element gets its own listener,
//! and all of them feed the same channel (fan-in). The bridge owns exactly the
//! registrations it created and removes each of them once, either through
//! [`EventChannelBridge::teardown_all`] or when the bridge is dropped.
//!
//! Listeners never suspend: they hand events over with
//! [`Channel::try_send`], so a slow consumer cannot stall event dispatch.
//! Events that do not fit into the pending-put queue are dropped with a
//! warning.
//!
//! ## Example
//!
//! ```ignore
//! let mut bridge = EventChannelBridge::new(document.clone(), BridgeOptions::default());
//! let clicks = bridge.bridge_selector(root, "click .button")?;
//!
//! spawner.spawn(async move {
//!     while let Some(event) = clicks.recv().await {
//!         info_log!("clicked {}", event.target());
//!     }
//! })?;
//!
//! // On re-render:
//! bridge.teardown_all()?;
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelConfig, ChannelError};
use crate::dom::{Document, DomError, Event, ListenerId, NodeId};
use crate::{debug_log, info_log, warn_log};

/// Errors produced by the event bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
	/// The bridge has already released its registrations.
	#[error("event bridge was already torn down")]
	AlreadyTornDown,
	/// An event spec did not have the form `"event [selector]"`.
	#[error("invalid event spec {0:?}")]
	InvalidEventSpec(String),
	/// A DOM operation failed.
	#[error(transparent)]
	Dom(#[from] DomError),
	/// Closing a bridged channel failed.
	#[error(transparent)]
	Channel(#[from] ChannelError),
}

/// What a bridge listener does to an event before forwarding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
	/// Call `prevent_default` on every forwarded event.
	pub prevent_default: bool,
	/// Call `stop_propagation` on every forwarded event.
	pub stop_propagation: bool,
}

impl Default for BridgeOptions {
	fn default() -> Self {
		Self {
			prevent_default: true,
			stop_propagation: true,
		}
	}
}

impl BridgeOptions {
	/// Sets the prevent_default option.
	pub fn prevent_default(mut self, prevent: bool) -> Self {
		self.prevent_default = prevent;
		self
	}

	/// Sets the stop_propagation option.
	pub fn stop_propagation(mut self, stop: bool) -> Self {
		self.stop_propagation = stop;
		self
	}
}

/// The elements a bridge binds: a single node or a collection of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets(Vec<NodeId>);

impl Targets {
	/// Returns the bound nodes in binding order.
	pub fn nodes(&self) -> &[NodeId] {
		&self.0
	}
}

impl From<NodeId> for Targets {
	fn from(node: NodeId) -> Self {
		Self(vec![node])
	}
}

impl From<Vec<NodeId>> for Targets {
	fn from(nodes: Vec<NodeId>) -> Self {
		Self(nodes)
	}
}

impl From<&[NodeId]> for Targets {
	fn from(nodes: &[NodeId]) -> Self {
		Self(nodes.to_vec())
	}
}

impl<const N: usize> From<[NodeId; N]> for Targets {
	fn from(nodes: [NodeId; N]) -> Self {
		Self(nodes.to_vec())
	}
}

impl From<Option<NodeId>> for Targets {
	fn from(node: Option<NodeId>) -> Self {
		Self(node.into_iter().collect())
	}
}

/// One listener registration owned by a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRegistration {
	node: NodeId,
	event_type: String,
	listener: ListenerId,
}

impl EventRegistration {
	/// Returns the element the listener is attached to.
	pub fn node(&self) -> NodeId {
		self.node
	}

	/// Returns the event name.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// Returns the listener handle.
	pub fn listener(&self) -> ListenerId {
		self.listener
	}
}

/// Splits an event spec such as `"click .button"` into the event name and
/// the (possibly empty) selector.
pub fn parse_event_spec(spec: &str) -> Result<(&str, &str), BridgeError> {
	static SPEC: OnceLock<Regex> = OnceLock::new();
	let pattern =
		SPEC.get_or_init(|| Regex::new(r"^(\S+)\s*(.*)$").expect("Invalid regex pattern"));

	let captures = pattern
		.captures(spec.trim())
		.ok_or_else(|| BridgeError::InvalidEventSpec(spec.to_string()))?;
	let event = captures.get(1).map_or("", |m| m.as_str());
	let selector = captures.get(2).map_or("", |m| m.as_str());
	Ok((event, selector.trim_end()))
}

/// Fans DOM events from many elements into channels and owns the listeners.
pub struct EventChannelBridge {
	document: Document,
	options: BridgeOptions,
	channel_config: ChannelConfig,
	registrations: Vec<EventRegistration>,
	channels: Vec<Channel<Event>>,
	torn_down: bool,
}

impl std::fmt::Debug for EventChannelBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventChannelBridge")
			.field("options", &self.options)
			.field("registrations", &self.registrations.len())
			.field("channels", &self.channels.len())
			.field("torn_down", &self.torn_down)
			.finish()
	}
}

impl EventChannelBridge {
	/// Creates a bridge whose channels are unbuffered.
	pub fn new(document: Document, options: BridgeOptions) -> Self {
		Self::with_channel_config(document, options, ChannelConfig::default())
	}

	/// Creates a bridge whose channels use `channel_config`.
	pub fn with_channel_config(
		document: Document,
		options: BridgeOptions,
		channel_config: ChannelConfig,
	) -> Self {
		Self {
			document,
			options,
			channel_config,
			registrations: Vec::new(),
			channels: Vec::new(),
			torn_down: false,
		}
	}

	/// Returns the listener options.
	pub fn options(&self) -> BridgeOptions {
		self.options
	}

	/// Returns the registrations currently owned by this bridge.
	pub fn registrations(&self) -> &[EventRegistration] {
		&self.registrations
	}

	/// Returns the number of channels produced so far.
	pub fn channel_count(&self) -> usize {
		self.channels.len()
	}

	/// Returns true once the bridge has released its registrations.
	pub fn is_torn_down(&self) -> bool {
		self.torn_down
	}

	/// Binds `event_type` on every target to one new channel.
	///
	/// An empty target set still yields a channel; it simply never fires.
	///
	/// # Errors
	///
	/// Fails with [`BridgeError::AlreadyTornDown`] after
	/// [`teardown_all`](Self::teardown_all), or with [`DomError::UnknownNode`]
	/// if a target is not part of the document. Nothing is registered when an
	/// error is returned.
	pub fn bridge(
		&mut self,
		targets: impl Into<Targets>,
		event_type: &str,
	) -> Result<Channel<Event>, BridgeError> {
		if self.torn_down {
			return Err(BridgeError::AlreadyTornDown);
		}
		let targets = targets.into();
		if let Some(&unknown) = targets.nodes().iter().find(|&&n| !self.document.contains(n)) {
			return Err(DomError::UnknownNode(unknown).into());
		}

		let channel = Channel::with_config(self.channel_config);
		for &node in targets.nodes() {
			let listener = self.document.add_event_listener(
				node,
				event_type,
				forwarder(channel.clone(), self.options),
			)?;
			self.registrations.push(EventRegistration {
				node,
				event_type: event_type.to_string(),
				listener,
			});
		}
		debug_log!(
			"bridged '{}' on {} element(s)",
			event_type,
			targets.nodes().len()
		);

		self.channels.push(channel.clone());
		Ok(channel)
	}

	/// Binds an event spec of the form `"event selector"`.
	///
	/// The selector is evaluated against the descendants of `root` at call
	/// time. An empty selector binds `root` itself.
	pub fn bridge_selector(&mut self, root: NodeId, spec: &str) -> Result<Channel<Event>, BridgeError> {
		let (event_type, selector) = parse_event_spec(spec)?;
		let targets = if selector.is_empty() {
			vec![root]
		} else {
			self.document.query_selector_all(root, selector)?
		};
		self.bridge(targets, event_type)
	}

	/// Removes every registration and closes every channel this bridge made.
	///
	/// Returns the number of listeners removed. Channels already closed by
	/// their consumer are left as they are.
	///
	/// # Errors
	///
	/// Returns [`BridgeError::AlreadyTornDown`] on a second call.
	pub fn teardown_all(&mut self) -> Result<usize, BridgeError> {
		if self.torn_down {
			return Err(BridgeError::AlreadyTornDown);
		}
		self.torn_down = true;

		let mut removed = 0;
		for registration in self.registrations.drain(..) {
			if self.document.remove_event_listener(
				registration.node,
				&registration.event_type,
				registration.listener,
			) {
				removed += 1;
			}
		}
		for channel in self.channels.drain(..) {
			if !channel.is_closed() {
				channel.close()?;
			}
		}

		info_log!("event bridge torn down, {} listener(s) removed", removed);
		Ok(removed)
	}
}

impl Drop for EventChannelBridge {
	fn drop(&mut self) {
		if !self.torn_down {
			if let Err(error) = self.teardown_all() {
				warn_log!("event bridge teardown on drop failed: {}", error);
			}
		}
	}
}

fn forwarder(channel: Channel<Event>, options: BridgeOptions) -> impl Fn(&Event) + 'static {
	move |event: &Event| {
		if options.prevent_default {
			event.prevent_default();
		}
		if options.stop_propagation {
			event.stop_propagation();
		}
		match channel.try_send(event.clone()) {
			Ok(()) => {}
			Err(ChannelError::Full(pending)) => {
				warn_log!(
					"dropping '{}' event: {} puts already pending",
					event.event_type(),
					pending
				);
			}
			Err(error) => {
				debug_log!("'{}' event not forwarded: {}", event.event_type(), error);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::VNode;
	use futures::executor::block_on;
	use rstest::{fixture, rstest};

	struct Page {
		document: Document,
		root: NodeId,
		buttons: Vec<NodeId>,
	}

	#[fixture]
	fn page() -> Page {
		let document = Document::new();
		let root = document.materialize(
			&VNode::parse(
				"<div><button class=\"button\">a</button><p><button class=\"button\">b</button></p><a>c</a></div>",
			)
			.unwrap(),
		);
		document.append_child(document.body(), root).unwrap();
		let buttons = document.query_selector_all(root, ".button").unwrap();
		Page {
			document,
			root,
			buttons,
		}
	}

	#[rstest]
	#[case("click .button", "click", ".button")]
	#[case("submit", "submit", "")]
	#[case("  keyup   input[name=q] ", "keyup", "input[name=q]")]
	fn test_parse_event_spec(#[case] spec: &str, #[case] event: &str, #[case] selector: &str) {
		assert_eq!(parse_event_spec(spec).unwrap(), (event, selector));
	}

	#[rstest]
	fn test_parse_event_spec_rejects_blank() {
		assert!(matches!(
			parse_event_spec("   "),
			Err(BridgeError::InvalidEventSpec(_))
		));
	}

	#[rstest]
	fn test_bridge_fans_in_and_suppresses_default(page: Page) {
		let mut bridge = EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
		let channel = bridge.bridge(page.buttons.clone(), "click").unwrap();

		let first = page.document.dispatch_event(page.buttons[1], "click").unwrap();
		page.document.dispatch_event(page.buttons[0], "click").unwrap();

		assert!(first.default_prevented());
		assert!(first.propagation_stopped());
		assert_eq!(channel.len(), 2);
		let received = block_on(channel.recv()).unwrap();
		assert!(received.same_event(&first));
		assert_eq!(block_on(channel.recv()).unwrap().target(), page.buttons[0]);
	}

	#[rstest]
	fn test_options_can_disable_suppression(page: Page) {
		let options = BridgeOptions::default()
			.prevent_default(false)
			.stop_propagation(false);
		let mut bridge = EventChannelBridge::new(page.document.clone(), options);
		let _channel = bridge.bridge(page.buttons[0], "click").unwrap();

		let event = page.document.dispatch_event(page.buttons[0], "click").unwrap();
		assert!(!event.default_prevented());
		assert!(!event.propagation_stopped());
	}

	#[rstest]
	fn test_empty_targets_yield_silent_channel(page: Page) {
		let mut bridge = EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
		let channel = bridge.bridge(Vec::new(), "click").unwrap();

		assert!(bridge.registrations().is_empty());
		assert!(channel.is_empty());
		assert!(!channel.is_closed());
	}

	#[rstest]
	fn test_bridge_selector(page: Page) {
		let mut bridge = EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
		let buttons = bridge.bridge_selector(page.root, "click .button").unwrap();
		let whole = bridge.bridge_selector(page.root, "submit").unwrap();

		assert_eq!(bridge.registrations().len(), 3);
		assert_eq!(bridge.registrations()[2].node(), page.root);
		page.document.dispatch_event(page.root, "submit").unwrap();
		assert_eq!(whole.len(), 1);
		assert!(buttons.is_empty());
	}

	#[rstest]
	fn test_unknown_target_registers_nothing(page: Page) {
		let mut bridge = EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
		let result = bridge.bridge(vec![page.buttons[0], NodeId::new(9999, 0)], "click");

		assert_eq!(
			result.unwrap_err(),
			BridgeError::Dom(DomError::UnknownNode(NodeId::new(9999, 0)))
		);
		assert_eq!(page.document.total_listener_count(), 0);
	}

	#[rstest]
	fn test_teardown_removes_each_listener_once(page: Page) {
		let mut bridge = EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
		let clicks = bridge.bridge(page.buttons.clone(), "click").unwrap();
		let _links = bridge.bridge_selector(page.root, "mouseover a").unwrap();

		assert_eq!(page.document.total_listener_count(), 3);
		assert_eq!(bridge.teardown_all().unwrap(), 3);
		assert_eq!(page.document.total_listener_count(), 0);
		assert!(clicks.is_closed());
		assert_eq!(bridge.teardown_all(), Err(BridgeError::AlreadyTornDown));
		assert_eq!(
			bridge.bridge(page.root, "click").unwrap_err(),
			BridgeError::AlreadyTornDown
		);
	}

	#[rstest]
	fn test_teardown_tolerates_consumer_closed_channel(page: Page) {
		let mut bridge = EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
		let channel = bridge.bridge(page.buttons[0], "click").unwrap();
		channel.close().unwrap();

		page.document.dispatch_event(page.buttons[0], "click").unwrap();
		assert_eq!(bridge.teardown_all().unwrap(), 1);
	}

	#[rstest]
	fn test_drop_tears_down(page: Page) {
		let channel = {
			let mut bridge =
				EventChannelBridge::new(page.document.clone(), BridgeOptions::default());
			bridge.bridge(page.buttons.clone(), "click").unwrap()
		};

		assert!(channel.is_closed());
		assert_eq!(page.document.total_listener_count(), 0);
	}

	#[rstest]
	fn test_full_channel_drops_without_panicking(page: Page) {
		let config = ChannelConfig {
			capacity: 1,
			max_pending: 1,
		};
		let mut bridge = EventChannelBridge::with_channel_config(
			page.document.clone(),
			BridgeOptions::default(),
			config,
		);
		let channel = bridge.bridge(page.buttons[0], "click").unwrap();

		for _ in 0..4 {
			page.document.dispatch_event(page.buttons[0], "click").unwrap();
		}
		assert_eq!(channel.len(), 2);
	}
}
