//! Core Router Implementation.
//!
//! A [`Router`] owns one main channel of navigation values and a dispatch
//! task that forwards each value to the first registered route whose pattern
//! accepts it. Routes are scanned in registration order; once a route takes
//! a value, later routes never see it. Values no route accepts are dropped.
//!
//! Each [`Route`] has its own channel. [`Route::load`] attaches a
//! [`RouteConsumer`] that services that channel with a handler until the
//! router is stopped.
//!
//! Route channels are unbuffered by default, so the dispatch task waits for
//! a route's consumer before it looks at the next navigation. A route that
//! is never loaded (or drained by hand) stalls dispatch once it matches.
//!
//! Dropping a router that was not stopped stops it, which ends the dispatch
//! task and every consumer.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::RouterError;
use super::handler::{Handler, ModuleRegistry, ResolvedHandler};
use super::history::HistoryState;
use super::pattern::{RouteMatch, RoutePattern};
use crate::channel::{Channel, ChannelConfig};
use crate::platform::Platform;
use crate::spawn::Spawner;
use crate::{debug_log, error_log, info_log, warn_log};

/// Channel sizes used by a router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
	/// Buffer capacity of each route channel.
	pub route_capacity: usize,
	/// Buffer capacity of the main navigation channel.
	pub main_capacity: usize,
}

/// Options for [`Router::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
	/// Do not dispatch the current location.
	pub silent: bool,
}

impl StartOptions {
	/// Start without dispatching the current location.
	pub fn silent() -> Self {
		Self { silent: true }
	}
}

/// Options for [`Router::navigate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOptions {
	/// Replace the current history entry instead of pushing a new one.
	pub replace: bool,
	/// Opaque state stored with the history entry.
	pub state: Option<serde_json::Value>,
	/// Record the entry without dispatching it.
	pub silent: bool,
}

impl NavigateOptions {
	/// Sets the replace option.
	pub fn replace(mut self, replace: bool) -> Self {
		self.replace = replace;
		self
	}

	/// Sets the history state.
	pub fn state(mut self, state: serde_json::Value) -> Self {
		self.state = Some(state);
		self
	}

	/// Sets the silent option.
	pub fn silent(mut self, silent: bool) -> Self {
		self.silent = silent;
		self
	}
}

struct RouteEntry {
	pattern: RoutePattern,
	channel: Channel<RouteMatch>,
}

type RouteTable = Rc<RefCell<Vec<RouteEntry>>>;

/// Dispatches navigation values to routes.
pub struct Router {
	platform: Platform,
	config: RouterConfig,
	main: Channel<String>,
	routes: RouteTable,
	modules: ModuleRegistry,
	stopped: Cell<bool>,
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field(
				"routes",
				&self
					.routes
					.borrow()
					.iter()
					.map(|entry| entry.pattern.source().to_string())
					.collect::<Vec<_>>(),
			)
			.field("config", &self.config)
			.field("stopped", &self.stopped.get())
			.finish()
	}
}

impl Router {
	/// Creates a router configured from the platform settings and spawns its
	/// dispatch task.
	pub fn new(platform: Platform) -> Result<Self, RouterError> {
		let config = platform.settings().router;
		Self::with_config(platform, config)
	}

	/// Creates a router with explicit channel sizes.
	///
	/// # Errors
	///
	/// Returns [`RouterError::Spawn`] if the dispatch task cannot be spawned.
	pub fn with_config(platform: Platform, config: RouterConfig) -> Result<Self, RouterError> {
		let main = Channel::with_config(ChannelConfig {
			capacity: config.main_capacity,
			..platform.settings().channel
		});
		let routes: RouteTable = Rc::new(RefCell::new(Vec::new()));

		platform
			.spawner()
			.spawn(dispatch(main.clone(), Rc::clone(&routes)))?;

		Ok(Self {
			platform,
			config,
			main,
			routes,
			modules: ModuleRegistry::new(),
			stopped: Cell::new(false),
		})
	}

	/// Returns the module registry used to resolve deferred handlers.
	pub fn modules(&self) -> &ModuleRegistry {
		&self.modules
	}

	/// Returns the platform context.
	pub fn platform(&self) -> &Platform {
		&self.platform
	}

	/// Returns the number of registered routes.
	pub fn route_count(&self) -> usize {
		self.routes.borrow().len()
	}

	/// Returns true once [`stop`](Self::stop) has been called.
	pub fn is_stopped(&self) -> bool {
		self.stopped.get()
	}

	/// Appends a compiled pattern to the route table and returns its channel.
	pub fn register_route(&self, pattern: RoutePattern) -> Result<Channel<RouteMatch>, RouterError> {
		if self.stopped.get() {
			return Err(RouterError::Stopped);
		}
		let channel = Channel::with_config(ChannelConfig {
			capacity: self.config.route_capacity,
			..self.platform.settings().channel
		});
		debug_log!("registered route {:?}", pattern.source());
		self.routes.borrow_mut().push(RouteEntry {
			pattern,
			channel: channel.clone(),
		});
		Ok(channel)
	}

	/// Registers a route spec such as `users/:id`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MalformedPattern`] if the spec does not compile.
	pub fn route(&self, spec: &str) -> Result<Route, RouterError> {
		self.register(RoutePattern::compile(spec)?)
	}

	/// Registers a precompiled expression.
	pub fn route_regex(&self, regex: Regex) -> Result<Route, RouterError> {
		self.register(RoutePattern::from_regex(regex))
	}

	/// Registers the catch-all route.
	pub fn default_route(&self) -> Result<Route, RouterError> {
		self.register(RoutePattern::any())
	}

	/// Registers the route matching exactly `/`.
	pub fn root(&self) -> Result<Route, RouterError> {
		self.register(RoutePattern::root())
	}

	fn register(&self, pattern: RoutePattern) -> Result<Route, RouterError> {
		let source = pattern.source().to_string();
		let channel = self.register_route(pattern)?;
		Ok(Route {
			source,
			channel,
			spawner: self.platform.spawner().clone(),
			modules: self.modules.clone(),
			loaded: Rc::new(Cell::new(false)),
		})
	}

	/// Starts routing. Unless `silent`, the current location is dispatched
	/// once.
	pub fn start(&self, options: StartOptions) -> Result<&Self, RouterError> {
		if self.stopped.get() {
			return Err(RouterError::Stopped);
		}
		if !options.silent {
			let path = self.platform.history().current_path();
			info_log!("router started at '{}'", path);
			self.main.try_send(path)?;
		}
		Ok(self)
	}

	/// Records a navigation in history and, unless `silent`, dispatches it.
	///
	/// Dispatch never suspends the caller: the value is queued on the main
	/// channel and picked up by the dispatch task.
	///
	/// # Errors
	///
	/// Fails with [`RouterError::Stopped`] after [`stop`](Self::stop), with
	/// [`RouterError::History`] if the provider rejects the entry, or with a
	/// channel error if too many navigations are already queued.
	pub fn navigate(&self, url: &str, options: NavigateOptions) -> Result<&Self, RouterError> {
		if self.stopped.get() {
			return Err(RouterError::Stopped);
		}

		let mut state = HistoryState::new(url);
		state.data = options.state;
		let history = self.platform.history();
		if options.replace {
			history.replace_state(state)?;
		} else {
			history.push_state(state)?;
		}

		if !options.silent {
			self.main.try_send(url.to_string())?;
		}
		Ok(self)
	}

	/// Dispatches the history's current path, as after a browser back or
	/// forward navigation.
	pub fn handle_pop_state(&self) -> Result<&Self, RouterError> {
		if self.stopped.get() {
			return Err(RouterError::Stopped);
		}
		self.main
			.try_send(self.platform.history().current_path())?;
		Ok(self)
	}

	/// Closes the main channel and every route channel, ending the dispatch
	/// task and all route consumers.
	///
	/// # Errors
	///
	/// Returns [`RouterError::Stopped`] on a second call.
	pub fn stop(&self) -> Result<(), RouterError> {
		if self.stopped.replace(true) {
			return Err(RouterError::Stopped);
		}
		self.main.close()?;
		let routes = self.routes.borrow();
		for entry in routes.iter().filter(|entry| !entry.channel.is_closed()) {
			entry.channel.close()?;
		}
		info_log!("router stopped, {} route(s) closed", routes.len());
		Ok(())
	}
}

impl Drop for Router {
	fn drop(&mut self) {
		if !self.stopped.get() {
			if let Err(error) = self.stop() {
				warn_log!("router stop on drop failed: {}", error);
			}
		}
	}
}

async fn dispatch(main: Channel<String>, routes: RouteTable) {
	while let Some(path) = main.recv().await {
		let target = routes
			.borrow()
			.iter()
			.enumerate()
			.find_map(|(index, entry)| {
				entry
					.pattern
					.matches(&path)
					.map(|matched| (index, matched, entry.channel.clone()))
			});

		let Some((index, matched, channel)) = target else {
			debug_log!("no route matches '{}', dropped", path);
			continue;
		};

		debug_log!("dispatching '{}' to route {}", path, index);
		if let Err(error) = channel.send(matched).await {
			debug_log!("route {} did not take '{}': {}", index, path, error);
		}
	}
	debug_log!("dispatch task finished");
}

/// Handle to one registered route.
#[derive(Clone)]
pub struct Route {
	source: String,
	channel: Channel<RouteMatch>,
	spawner: Spawner,
	modules: ModuleRegistry,
	loaded: Rc<Cell<bool>>,
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("source", &self.source)
			.field("loaded", &self.loaded.get())
			.finish()
	}
}

impl Route {
	/// Returns the spec the route was registered with.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Returns the route's channel.
	///
	/// Reading it directly competes with a loaded consumer; use it only for
	/// routes without a handler.
	pub fn channel(&self) -> &Channel<RouteMatch> {
		&self.channel
	}

	/// Returns true once a handler is attached.
	pub fn is_loaded(&self) -> bool {
		self.loaded.get()
	}

	/// Attaches a handler and starts its consumer task.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidHandler`] for an unknown deferred
	/// module, [`RouterError::AlreadyLoaded`] if the route already has a
	/// consumer, or [`RouterError::Spawn`] if the task cannot be started.
	pub fn load(self, handler: Handler) -> Result<Self, RouterError> {
		if self.loaded.get() {
			return Err(RouterError::AlreadyLoaded(self.source.clone()));
		}
		let handler = handler.resolve(&self.modules)?;
		let consumer = RouteConsumer::new(self.source.clone(), self.channel.clone(), handler);
		self.spawner.spawn(async move {
			consumer.run().await;
		})?;
		self.loaded.set(true);
		Ok(self)
	}
}

/// Services one route channel with a handler.
pub struct RouteConsumer {
	label: String,
	channel: Channel<RouteMatch>,
	handler: ResolvedHandler,
}

impl fmt::Debug for RouteConsumer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteConsumer")
			.field("label", &self.label)
			.field("handler", &self.handler)
			.finish()
	}
}

impl RouteConsumer {
	/// Creates a consumer; nothing runs until [`run`](Self::run) is polled.
	pub fn new(label: impl Into<String>, channel: Channel<RouteMatch>, handler: ResolvedHandler) -> Self {
		Self {
			label: label.into(),
			channel,
			handler,
		}
	}

	/// Takes matches until the channel closes. A failing invocation is
	/// logged and the loop moves on to the next match.
	///
	/// Returns the number of successful invocations.
	pub async fn run(self) -> usize {
		let mut handled = 0;
		while let Some(matched) = self.channel.recv().await {
			match self.handler.invoke(&matched) {
				Ok(()) => handled += 1,
				Err(error) => {
					error_log!(
						"{} handler for route '{}' failed on '{}': {}",
						self.handler.describe(),
						self.label,
						matched.path,
						error
					);
				}
			}
		}
		debug_log!("consumer for route '{}' finished after {} navigation(s)", self.label, handled);
		handled
	}
}
