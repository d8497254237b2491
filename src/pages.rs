//! Channel-based client-side toolkit
//!
//! This module provides access to omega-pages: the cooperative channel,
//! the event-to-channel bridge, the client-side router, the DOM reconciler
//! and the controllers that tie them together.
//!
//! ## Architecture
//!
//! - **Channels**: Rendezvous or buffered single-threaded channels
//! - **Events**: DOM listeners that forward into channels
//! - **Routing**: History-driven dispatch to the first matching route
//! - **Reconciliation**: In-place patching of the live tree
//!
//! ## Example
//!
//! ```rust,ignore
//! use omega::pages::{Controller, Rendered, VNode};
//!
//! let mut controller = Controller::new(platform, root, || {
//!     Rendered::Tree(VNode::element("div").child(VNode::text("hello")))
//! });
//! controller.render()?;
//! ```

// Re-export all omega-pages functionality
pub use omega_pages::*;
