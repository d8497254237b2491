//! Route handlers.
//!
//! A route can be serviced by three kinds of handler:
//!
//! - a callable invoked with each [`RouteMatch`],
//! - an object implementing [`Load`],
//! - a module name looked up in a [`ModuleRegistry`], whose factory builds a
//!   fresh [`View`] for every navigation.
//!
//! The shape is resolved once, when the handler is attached to a route, so
//! an unknown module fails at `load` time instead of on the first
//! navigation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::RouterError;
use super::pattern::RouteMatch;

/// Error returned by a handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
	/// The handler failed.
	#[error("{0}")]
	Failed(String),
	/// A capture the handler relies on did not participate in the match.
	#[error("route capture {0} is missing")]
	MissingCapture(usize),
}

impl HandlerError {
	/// Creates a [`HandlerError::Failed`].
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}
}

/// Objects that can be loaded with a route match.
pub trait Load {
	/// Handles one navigation.
	fn load(&self, route: &RouteMatch) -> Result<(), HandlerError>;
}

/// A page built by a module factory.
pub trait View {
	/// Renders the page for one navigation.
	fn render(&mut self, route: &RouteMatch) -> Result<(), HandlerError>;
}

/// Callable handler.
pub type Callback = Rc<dyn Fn(&RouteMatch) -> Result<(), HandlerError>>;

/// Builds a view from the options passed to [`Handler::deferred_with`].
pub type ViewFactory = Rc<dyn Fn(&serde_json::Value) -> Result<Box<dyn View>, HandlerError>>;

/// Named view factories used to resolve deferred handlers.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
	modules: Rc<RefCell<HashMap<String, ViewFactory>>>,
}

impl fmt::Debug for ModuleRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let modules = self.modules.borrow();
		let mut names: Vec<&String> = modules.keys().collect();
		names.sort();
		f.debug_struct("ModuleRegistry")
			.field("modules", &names)
			.finish()
	}
}

impl ModuleRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a factory under `name`, replacing any previous one.
	pub fn register<F>(&self, name: impl Into<String>, factory: F)
	where
		F: Fn(&serde_json::Value) -> Result<Box<dyn View>, HandlerError> + 'static,
	{
		self.modules
			.borrow_mut()
			.insert(name.into(), Rc::new(factory));
	}

	/// Looks up a factory.
	pub fn resolve(&self, name: &str) -> Option<ViewFactory> {
		self.modules.borrow().get(name).cloned()
	}

	/// Returns true if a factory is registered under `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.modules.borrow().contains_key(name)
	}
}

/// A handler as supplied by the application.
#[derive(Clone)]
pub enum Handler {
	/// Invoked directly with each match.
	Callable(Callback),
	/// Loaded with each match.
	Loadable(Rc<dyn Load>),
	/// Resolved through the module registry.
	Deferred {
		/// Registered module name.
		module: String,
		/// Options handed to the factory.
		options: serde_json::Value,
	},
}

impl fmt::Debug for Handler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Callable(_) => f.write_str("Handler::Callable"),
			Self::Loadable(_) => f.write_str("Handler::Loadable"),
			Self::Deferred { module, .. } => write!(f, "Handler::Deferred({})", module),
		}
	}
}

impl Handler {
	/// Wraps a closure.
	pub fn callable<F>(f: F) -> Self
	where
		F: Fn(&RouteMatch) -> Result<(), HandlerError> + 'static,
	{
		Self::Callable(Rc::new(f))
	}

	/// Wraps a [`Load`] implementation.
	pub fn loadable<L>(target: L) -> Self
	where
		L: Load + 'static,
	{
		Self::Loadable(Rc::new(target))
	}

	/// Refers to a registered module.
	pub fn deferred(module: impl Into<String>) -> Self {
		Self::deferred_with(module, serde_json::Value::Null)
	}

	/// Refers to a registered module, passing `options` to its factory.
	pub fn deferred_with(module: impl Into<String>, options: serde_json::Value) -> Self {
		Self::Deferred {
			module: module.into(),
			options,
		}
	}

	/// Resolves the handler shape.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidHandler`] if a deferred module is not
	/// registered.
	pub fn resolve(self, modules: &ModuleRegistry) -> Result<ResolvedHandler, RouterError> {
		Ok(match self {
			Self::Callable(callback) => ResolvedHandler::Callable(callback),
			Self::Loadable(target) => ResolvedHandler::Loadable(target),
			Self::Deferred { module, options } => {
				let factory = modules
					.resolve(&module)
					.ok_or_else(|| RouterError::InvalidHandler(module.clone()))?;
				ResolvedHandler::Deferred {
					module,
					factory,
					options,
				}
			}
		})
	}
}

/// A handler whose shape has been checked.
#[derive(Clone)]
pub enum ResolvedHandler {
	/// A closure.
	Callable(Callback),
	/// A [`Load`] implementation.
	Loadable(Rc<dyn Load>),
	/// A module factory.
	Deferred {
		/// Module name, for diagnostics.
		module: String,
		/// Factory building one view per navigation.
		factory: ViewFactory,
		/// Options handed to the factory.
		options: serde_json::Value,
	},
}

impl fmt::Debug for ResolvedHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.describe())
	}
}

impl ResolvedHandler {
	/// Invokes the handler with one match.
	pub fn invoke(&self, route: &RouteMatch) -> Result<(), HandlerError> {
		match self {
			Self::Callable(callback) => callback(route),
			Self::Loadable(target) => target.load(route),
			Self::Deferred {
				factory, options, ..
			} => factory(options)?.render(route),
		}
	}

	/// Returns a short description for log messages.
	pub fn describe(&self) -> String {
		match self {
			Self::Callable(_) => "callable".to_string(),
			Self::Loadable(_) => "loadable".to_string(),
			Self::Deferred { module, .. } => format!("module '{}'", module),
		}
	}
}
