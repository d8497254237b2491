//! Controllers
//!
//! A [`Controller`] owns one root element and keeps it in sync with a
//! template. Rendering takes one of two paths:
//!
//! - [`Rendered::Markup`]: the root's children are replaced wholesale with
//!   the parsed markup.
//! - [`Rendered::Tree`]: the root is reconciled against the tree, keeping
//!   every node whose identity did not change.
//!
//! After either path, every event-channel binding is rebuilt against the
//! current tree: the previous [`EventChannelBridge`] is torn down (closing
//! its channels) and each binding's method receives fresh channels. Nodes
//! inserted by reconciliation are therefore bound like any other. Plain
//! callbacks registered with [`Controller::on_events`] are re-attached the
//! same way, without touching the event's default action or propagation.
//!
//! ## Example
//!
//! ```ignore
//! let mut controller = Controller::new(platform.clone(), root, move || {
//!     Rendered::Tree(VNode::element("div").child(VNode::element("button").attr("class", "save")))
//! });
//! controller.on_channels(&["click .save"], move |mut channels| {
//!     let clicks = channels.remove(0);
//!     let _ = spawner.spawn(async move {
//!         while let Some(event) = clicks.recv().await {
//!             info_log!("save clicked on {}", event.target());
//!         }
//!     });
//! });
//! controller.render()?;
//! ```

use std::fmt;
use std::rc::Rc;

use crate::channel::Channel;
use crate::dom::{Document, DomError, Event, ListenerId, NodeId, VNode};
use crate::events::{BridgeError, EventChannelBridge, parse_event_spec};
use crate::platform::Platform;
use crate::reconcile::{ReconcileReport, reconcile};
use crate::{debug_log, info_log};

/// Errors produced by a controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
	/// The controller was closed.
	#[error("controller is closed")]
	Closed,
	/// Binding event channels failed.
	#[error(transparent)]
	Bridge(#[from] BridgeError),
	/// A DOM operation failed.
	#[error(transparent)]
	Dom(#[from] DomError),
}

/// Output of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
	/// Markup installed wholesale as the root's children.
	Markup(String),
	/// A tree the root is reconciled against.
	Tree(VNode),
}

impl From<String> for Rendered {
	fn from(markup: String) -> Self {
		Self::Markup(markup)
	}
}

impl From<&str> for Rendered {
	fn from(markup: &str) -> Self {
		Self::Markup(markup.to_string())
	}
}

impl From<VNode> for Rendered {
	fn from(tree: VNode) -> Self {
		Self::Tree(tree)
	}
}

type Hook = Box<dyn FnMut()>;
type ChannelMethod = Rc<dyn Fn(Vec<Channel<Event>>)>;
type EventCallback = Rc<dyn Fn(&Event)>;

struct ChannelBinding {
	specs: Vec<String>,
	method: ChannelMethod,
}

struct EventBinding {
	spec: String,
	callback: EventCallback,
}

struct Delegated {
	node: NodeId,
	event_type: String,
	listener: ListenerId,
}

/// Renders a template into a root element and binds event channels.
pub struct Controller {
	platform: Platform,
	root: NodeId,
	template: Box<dyn Fn() -> Rendered>,
	bindings: Vec<ChannelBinding>,
	bridge: Option<EventChannelBridge>,
	events: Vec<EventBinding>,
	delegated: Vec<Delegated>,
	before_render: Option<Hook>,
	after_render: Option<Hook>,
	before_close: Option<Hook>,
	renders: usize,
	closed: bool,
}

impl fmt::Debug for Controller {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Controller")
			.field("root", &self.root)
			.field("bindings", &self.bindings.len())
			.field("bridge", &self.bridge)
			.field("events", &self.events.len())
			.field("delegated", &self.delegated.len())
			.field("renders", &self.renders)
			.field("closed", &self.closed)
			.finish()
	}
}

impl Controller {
	/// Creates a controller for `root`. Nothing is rendered until
	/// [`render`](Self::render) is called.
	pub fn new<F, R>(platform: Platform, root: NodeId, template: F) -> Self
	where
		F: Fn() -> R + 'static,
		R: Into<Rendered>,
	{
		Self {
			platform,
			root,
			template: Box::new(move || template().into()),
			bindings: Vec::new(),
			bridge: None,
			events: Vec::new(),
			delegated: Vec::new(),
			before_render: None,
			after_render: None,
			before_close: None,
			renders: 0,
			closed: false,
		}
	}

	/// Creates a controller for a new detached `tag` element carrying the
	/// given id and classes. The caller inserts [`root`](Self::root) where it
	/// belongs.
	///
	/// # Errors
	///
	/// Returns [`ControllerError::Dom`] if the attributes cannot be set.
	pub fn with_element<F, R>(
		platform: Platform,
		tag: &str,
		id: Option<&str>,
		classes: &[&str],
		template: F,
	) -> Result<Self, ControllerError>
	where
		F: Fn() -> R + 'static,
		R: Into<Rendered>,
	{
		let document = platform.document().clone();
		let root = document.create_element(if tag.is_empty() { "div" } else { tag });
		if let Some(id) = id {
			document.set_attribute(root, "id", id)?;
		}
		if !classes.is_empty() {
			document.set_attribute(root, "class", &classes.join(" "))?;
		}
		Ok(Self::new(platform, root, template))
	}

	/// Returns the root element. It changes when reconciliation replaces the
	/// root.
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Returns the platform context.
	pub fn platform(&self) -> &Platform {
		&self.platform
	}

	/// Returns how many times the controller has rendered.
	pub fn render_count(&self) -> usize {
		self.renders
	}

	/// Returns true once [`close`](Self::close) has been called.
	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Returns the bridge holding the current event bindings.
	pub fn bridge(&self) -> Option<&EventChannelBridge> {
		self.bridge.as_ref()
	}

	/// Registers a method that receives one channel per event spec
	/// (`"click .button"`, or just `"submit"` for the root) after every
	/// render.
	pub fn on_channels<F>(&mut self, specs: &[&str], method: F) -> &mut Self
	where
		F: Fn(Vec<Channel<Event>>) + 'static,
	{
		self.bindings.push(ChannelBinding {
			specs: specs.iter().map(|spec| spec.to_string()).collect(),
			method: Rc::new(method),
		});
		self
	}

	/// Registers a plain callback for an event spec such as `"click .save"`.
	///
	/// The callback is attached to every matching element after each render
	/// and detached on the next render and on close.
	pub fn on_events<F>(&mut self, spec: &str, callback: F) -> &mut Self
	where
		F: Fn(&Event) + 'static,
	{
		self.events.push(EventBinding {
			spec: spec.to_string(),
			callback: Rc::new(callback),
		});
		self
	}

	/// Returns the number of plain callbacks currently attached.
	pub fn delegated_count(&self) -> usize {
		self.delegated.len()
	}

	/// Sets a hook run before the template.
	pub fn on_before_render(&mut self, hook: impl FnMut() + 'static) -> &mut Self {
		self.before_render = Some(Box::new(hook));
		self
	}

	/// Sets a hook run after markup is installed and channels are bound.
	pub fn on_after_render(&mut self, hook: impl FnMut() + 'static) -> &mut Self {
		self.after_render = Some(Box::new(hook));
		self
	}

	/// Sets a hook run at the start of [`close`](Self::close).
	pub fn on_before_close(&mut self, hook: impl FnMut() + 'static) -> &mut Self {
		self.before_close = Some(Box::new(hook));
		self
	}

	/// Renders the template and rebinds every event channel.
	///
	/// Returns the reconciliation report for tree templates and `None` for
	/// markup templates.
	///
	/// # Errors
	///
	/// Returns [`ControllerError::Closed`] after [`close`](Self::close), or
	/// the DOM or bridge error that interrupted the render.
	pub fn render(&mut self) -> Result<Option<ReconcileReport>, ControllerError> {
		if self.closed {
			return Err(ControllerError::Closed);
		}
		if let Some(hook) = self.before_render.as_mut() {
			hook();
		}

		let document = self.platform.document().clone();
		let report = match (self.template)() {
			Rendered::Markup(markup) => {
				document.set_inner_html(self.root, &markup)?;
				None
			}
			Rendered::Tree(tree) => {
				let report = reconcile(&document, self.root, Some(&tree))?;
				self.root = report.node(self.root);
				Some(report)
			}
		};

		self.delegate_events()?;
		self.bind_channels()?;
		self.renders += 1;
		debug_log!("controller {} rendered ({} time(s))", self.root, self.renders);

		if let Some(hook) = self.after_render.as_mut() {
			hook();
		}
		Ok(report)
	}

	fn bind_channels(&mut self) -> Result<(), ControllerError> {
		self.close_channels()?;
		if self.bindings.is_empty() {
			return Ok(());
		}

		let settings = self.platform.settings();
		let mut bridge = EventChannelBridge::with_channel_config(
			self.platform.document().clone(),
			settings.bridge,
			settings.channel,
		);
		let mut calls = Vec::with_capacity(self.bindings.len());
		for binding in &self.bindings {
			let channels = binding
				.specs
				.iter()
				.map(|spec| bridge.bridge_selector(self.root, spec))
				.collect::<Result<Vec<_>, _>>()?;
			calls.push((Rc::clone(&binding.method), channels));
		}
		self.bridge = Some(bridge);

		for (method, channels) in calls {
			method(channels);
		}
		Ok(())
	}

	fn delegate_events(&mut self) -> Result<(), ControllerError> {
		let document = self.platform.document().clone();
		self.undelegate_events(&document);

		for binding in &self.events {
			let (event_type, selector) = parse_event_spec(&binding.spec)?;
			let targets = if selector.is_empty() {
				vec![self.root]
			} else {
				document.query_selector_all(self.root, selector)?
			};
			for node in targets {
				let callback = Rc::clone(&binding.callback);
				let listener = document.add_event_listener(node, event_type, move |event| callback(event))?;
				self.delegated.push(Delegated {
					node,
					event_type: event_type.to_string(),
					listener,
				});
			}
		}
		debug_log!("controller {} attached {} callback(s)", self.root, self.delegated.len());
		Ok(())
	}

	fn undelegate_events(&mut self, document: &Document) -> usize {
		self.delegated
			.drain(..)
			.filter(|entry| document.remove_event_listener(entry.node, &entry.event_type, entry.listener))
			.count()
	}

	fn close_channels(&mut self) -> Result<usize, ControllerError> {
		match self.bridge.take() {
			Some(mut bridge) if !bridge.is_torn_down() => Ok(bridge.teardown_all()?),
			_ => Ok(0),
		}
	}

	/// Tears down every event binding. The rendered markup stays in place.
	///
	/// # Errors
	///
	/// Returns [`ControllerError::Closed`] on a second call.
	pub fn close(&mut self) -> Result<(), ControllerError> {
		if self.closed {
			return Err(ControllerError::Closed);
		}
		if let Some(hook) = self.before_close.as_mut() {
			hook();
		}
		let document = self.platform.document().clone();
		let removed = self.undelegate_events(&document) + self.close_channels()?;
		self.closed = true;
		info_log!("controller {} closed, {} listener(s) removed", self.root, removed);
		Ok(())
	}
}
