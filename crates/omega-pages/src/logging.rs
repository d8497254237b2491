//! Logging abstraction layer for omega-pages
//!
//! The core logs through these macros rather than calling `tracing` directly,
//! so that the chatty per-event diagnostics can be compiled out of release
//! builds while applications still install their own `tracing` subscriber.
//! Warnings and errors (dropped events, failed handlers) are always emitted;
//! the subscriber decides whether they are shown.
//!
//! ## Macro Overview
//!
//! | Macro | Debug Assertions | Feature Required | Backend |
//! |-------|------------------|------------------|---------|
//! | `debug_log!` | Required | `debug-hooks` | `tracing::debug!` |
//! | `info_log!` | Required | None | `tracing::info!` |
//! | `warn_log!` | Not required | None | `tracing::warn!` |
//! | `error_log!` | Not required | None | `tracing::error!` |
//!
//! Every event is emitted with the `omega_pages` target.
//!
//! ## Example
//!
//! ```ignore
//! use omega_pages::{debug_log, info_log, warn_log, error_log};
//!
//! // Only logged when both `debug-hooks` feature and `debug_assertions` are enabled
//! debug_log!("event delivered: {:?}", event);
//!
//! info_log!("router started");
//! warn_log!("dropping event: {} pending sends", pending);
//! error_log!("handler failed: {}", error);
//! ```

/// Logs a debug message (requires `debug-hooks` feature + `debug_assertions`)
///
/// Used for per-event tracing inside the dispatch loops. It compiles to a
/// no-op when conditions are not met.
///
/// # Example
///
/// ```ignore
/// debug_log!("Dispatching {} to route {}", path, index);
/// ```
#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__tracing::debug!(target: "omega_pages", "{}", format!($($arg)*));
	}};
}

/// No-op debug_log when conditions are not met
#[macro_export]
#[cfg(not(all(debug_assertions, feature = "debug-hooks")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs an info message (requires `debug_assertions`)
///
/// # Example
///
/// ```ignore
/// info_log!("Router stopped, {} routes closed", count);
/// ```
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__tracing::info!(target: "omega_pages", "{}", format!($($arg)*));
	}};
}

/// No-op info_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs a warning message in every build
#[macro_export]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__tracing::warn!(target: "omega_pages", "{}", format!($($arg)*));
	}};
}

/// Logs an error message in every build
///
/// Handler failures inside route consumers are reported here; they are not
/// propagated past the consumer loop.
#[macro_export]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__tracing::error!(target: "omega_pages", "{}", format!($($arg)*));
	}};
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	#[rstest]
	fn test_logging_macros_compile() {
		debug_log!("Debug message: {}", 42);
		info_log!("Info message: {}", "route");
		warn_log!("Warning message: {:?}", vec![1, 2, 3]);
		error_log!("Error message: {}", "handler");
	}

	#[rstest]
	fn test_logging_macros_no_args() {
		debug_log!("Simple debug");
		info_log!("Simple info");
		warn_log!("Simple warning");
		error_log!("Simple error");
	}
}
