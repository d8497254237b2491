//! DOM model.
//!
//! The toolkit never touches ambient globals; everything that reads or
//! mutates nodes goes through a [`Document`] handle injected via the
//! platform context.

pub mod document;
pub mod event;
pub mod markup;
pub mod node;
pub mod selector;
pub mod vnode;

pub use document::{Document, DomError};
pub use event::{Event, Listener, ListenerId};
pub use markup::MarkupError;
pub use node::{NodeId, NodeKind};
pub use selector::Selector;
pub use vnode::{VElement, VNode};
