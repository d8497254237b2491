//! omega-pages - Channel-based client-side toolkit core
//!
//! Everything that moves through an omega application moves through a
//! [`Channel`]: DOM events are bridged into channels, navigations are sent to
//! the router's main channel and forwarded to the first matching route, and
//! route consumers drive handlers one value at a time.
//!
//! ## Architecture
//!
//! - [`channel`]: Cooperative single-threaded channel (buffered or rendezvous)
//! - [`spawn`]: Task spawning over `futures` or tokio local executors
//! - [`dom`]: In-memory document, virtual nodes, markup and selectors
//! - [`events`]: Bridges DOM events into channels
//! - [`router`]: Route patterns, history and channel-based dispatch
//! - [`reconcile`]: Patches a live tree to match a virtual tree
//! - [`controller`]: Renders a template into a root and rebinds event channels
//! - [`platform`]: Capability object carrying document, history and spawner
//! - [`settings`]: TOML/JSON configuration
//! - [`logging`]: Logging macros forwarding to `tracing`
//!
//! ## Example
//!
//! ```ignore
//! use futures::executor::LocalPool;
//! use omega_pages::{Handler, NavigateOptions, Platform, Router, Spawner, StartOptions};
//!
//! let mut pool = LocalPool::new();
//! let platform = Platform::in_memory(Spawner::from_local(pool.spawner()));
//! let router = Router::new(platform)?;
//!
//! router.route(":user/:id")?.load(Handler::callable(|route| {
//!     println!("{:?}", route.values());
//!     Ok(())
//! }))?;
//! router.start(StartOptions::default())?;
//! router.navigate("/alice/42", NavigateOptions::default())?;
//! pool.run_until_stalled();
//! ```

#![warn(missing_docs)]

// Core modules
pub mod channel;
pub mod logging;
pub mod spawn;

// DOM and rendering
pub mod controller;
pub mod dom;
pub mod events;
pub mod reconcile;

// Routing
pub mod router;

// Configuration and capabilities
pub mod platform;
pub mod settings;

// Re-export commonly used types
pub use channel::{Channel, ChannelConfig, ChannelError};
pub use controller::{Controller, ControllerError, Rendered};
pub use dom::{Document, DomError, Event, NodeId, NodeKind, VNode};
pub use events::{BridgeError, BridgeOptions, EventChannelBridge, parse_event_spec};
pub use platform::Platform;
pub use reconcile::{ReconcileOutcome, ReconcileReport, ReconcileStats, reconcile};
pub use router::{
	Handler, HandlerError, HistoryProvider, MemoryHistory, ModuleRegistry, NavigateOptions, Route,
	RouteConsumer, RouteMatch, RoutePattern, Router, RouterConfig, RouterError, StartOptions,
};
pub use settings::{PagesSettings, SettingsError};
pub use spawn::Spawner;

#[doc(hidden)]
pub use tracing as __tracing;
