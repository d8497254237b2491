//! # Omega
//!
//! A tiny MVC-style client-side toolkit built on cooperative channels.
//!
//! DOM events, navigations and route matches all travel through
//! single-threaded channels. Controllers render templates into a root
//! element, reconciling the live tree in place, and hand their event handlers
//! channels instead of callbacks.
//!
//! ## Feature Flags
//!
//! - `pages` (default) - Channel core, router, DOM reconciler and controllers
//! - `debug-hooks` - Verbose per-event logging (debug builds only)
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use omega::prelude::*;
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let platform = Platform::in_memory(Spawner::from_local(pool.spawner()));
//! let router = Router::new(platform)?;
//!
//! router.route("inbox/:id")?.load(Handler::callable(|route| {
//!     println!("message {:?}", route.get(0));
//!     Ok(())
//! }))?;
//! router.default_route()?.load(Handler::callable(|_| Ok(())))?;
//!
//! router.start(StartOptions::default())?;
//! router.navigate("/inbox/7", NavigateOptions::default())?;
//! pool.run_until_stalled();
//! ```

#![warn(missing_docs)]

#[cfg(feature = "pages")]
pub mod pages;

#[cfg(feature = "pages")]
pub use omega_pages::{
	Channel, ChannelError, Controller, ControllerError, Document, Event, EventChannelBridge, Handler,
	NavigateOptions, NodeId, PagesSettings, Platform, Rendered, Router, RouterError, Spawner,
	StartOptions, VNode, reconcile,
};

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```rust,ignore
/// use omega::prelude::*;
/// ```
pub mod prelude {
	#[cfg(feature = "pages")]
	pub use crate::{
		Channel, Controller, Document, Event, EventChannelBridge, Handler, NavigateOptions, NodeId,
		Platform, Rendered, Router, Spawner, StartOptions, VNode,
	};

	#[cfg(feature = "pages")]
	pub use omega_pages::{debug_log, error_log, info_log, warn_log};
}
