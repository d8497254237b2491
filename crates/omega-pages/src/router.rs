//! Client-side router.
//!
//! Navigation values flow through channels:
//!
//! ```text
//! navigate()/start()/handle_pop_state()
//!         │
//!         ▼
//!   main channel ──► dispatch task ──► first matching route channel ──► RouteConsumer ──► handler
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use omega_pages::router::{Handler, NavigateOptions, Router, StartOptions};
//!
//! let router = Router::new(platform)?;
//! router.route("users/:id")?.load(Handler::callable(|route| {
//!     info_log!("user {}", route.values()[0]);
//!     Ok(())
//! }))?;
//! router.default_route()?.load(Handler::deferred("pages/not_found"))?;
//!
//! router.start(StartOptions::default())?;
//! router.navigate("/users/42", NavigateOptions::default())?;
//! ```

pub mod core;
pub mod handler;
pub mod history;
pub mod pattern;

pub use self::core::{NavigateOptions, Route, RouteConsumer, Router, RouterConfig, StartOptions};
pub use handler::{
	Callback, Handler, HandlerError, Load, ModuleRegistry, ResolvedHandler, View, ViewFactory,
};
pub use history::{HistoryError, HistoryProvider, HistoryState, MemoryHistory};
pub use pattern::{RouteMatch, RoutePattern};

use futures::task::SpawnError;

use crate::channel::ChannelError;

/// Errors produced by the router.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
	/// A route spec did not compile.
	#[error("malformed route pattern {pattern:?}: {source}")]
	MalformedPattern {
		/// The spec as written.
		pattern: String,
		/// The regular-expression error.
		source: regex::Error,
	},
	/// A deferred handler names a module that is not registered.
	#[error("invalid handler: no module named {0:?}")]
	InvalidHandler(String),
	/// The route already has a consumer.
	#[error("route {0:?} already has a handler")]
	AlreadyLoaded(String),
	/// The router was stopped.
	#[error("router is stopped")]
	Stopped,
	/// The history provider rejected an entry.
	#[error(transparent)]
	History(#[from] HistoryError),
	/// A navigation could not be queued.
	#[error(transparent)]
	Channel(#[from] ChannelError),
	/// A task could not be spawned.
	#[error("failed to spawn router task: {0}")]
	Spawn(#[from] SpawnError),
}
