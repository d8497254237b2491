//! Route patterns.
//!
//! Route specs are compiled into anchored regular expressions:
//!
//! | Token | Meaning | Compiles to |
//! |---|---|---|
//! | `:name` | named segment | `([^/?]+)` |
//! | `*name` | splat segment | `([^?]*?)` |
//! | `(expr)` | optional segment | `(?:expr)?` |
//! | literal text | matched verbatim | escaped literal |
//!
//! The compiled expression is `^/<pattern>` with no trailing anchor, so
//! `users/:id` also accepts `/users/7/edit`.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, NoExpand, Regex};

use super::RouterError;

struct Rules {
	escape: Regex,
	optional: Regex,
	named: Regex,
	splat: Regex,
}

fn rules() -> &'static Rules {
	static RULES: OnceLock<Rules> = OnceLock::new();
	RULES.get_or_init(|| Rules {
		escape: Regex::new(r"[\-{}\[\]+?.\\^$|#]").expect("Invalid regex pattern"),
		optional: Regex::new(r"\((.*?)\)").expect("Invalid regex pattern"),
		named: Regex::new(r"(\(\?)?:\w+").expect("Invalid regex pattern"),
		splat: Regex::new(r"\*\w+").expect("Invalid regex pattern"),
	})
}

/// Translates a route spec into regular-expression source.
///
/// Returns the expression without compiling it, so callers can inspect what
/// a spec turns into.
pub fn translate(spec: &str) -> String {
	let rules = rules();
	let escaped = rules.escape.replace_all(spec, r"\$0");
	let optional = rules.optional.replace_all(&escaped, "(?:${1})?");
	let named = rules.named.replace_all(&optional, |caps: &Captures<'_>| {
		// `(?:` left behind by an optional group is not a parameter.
		if caps.get(1).is_some() {
			caps[0].to_string()
		} else {
			"([^/?]+)".to_string()
		}
	});
	let splat = rules.splat.replace_all(&named, NoExpand("([^?]*?)"));
	format!("^/{}", splat)
}

#[derive(Clone)]
enum Matcher {
	Any,
	Root,
	Compiled(Regex),
	Custom(Regex),
}

/// A compiled route matcher.
#[derive(Clone)]
pub struct RoutePattern {
	source: String,
	matcher: Matcher,
}

impl fmt::Debug for RoutePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoutePattern")
			.field("source", &self.source)
			.field("regex", &self.as_str())
			.finish()
	}
}

impl RoutePattern {
	/// Compiles a route spec.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MalformedPattern`] if the translated expression
	/// is not a valid regular expression, e.g. for an unbalanced `(`.
	pub fn compile(spec: &str) -> Result<Self, RouterError> {
		let regex = Regex::new(&translate(spec)).map_err(|source| RouterError::MalformedPattern {
			pattern: spec.to_string(),
			source,
		})?;
		Ok(Self {
			source: spec.to_string(),
			matcher: Matcher::Compiled(regex),
		})
	}

	/// Wraps an already compiled expression. It is tested against navigation
	/// values exactly as given.
	pub fn from_regex(regex: Regex) -> Self {
		Self {
			source: regex.as_str().to_string(),
			matcher: Matcher::Custom(regex),
		}
	}

	/// The catch-all pattern.
	pub fn any() -> Self {
		Self {
			source: "default".to_string(),
			matcher: Matcher::Any,
		}
	}

	/// The pattern matching exactly `/`.
	pub fn root() -> Self {
		Self {
			source: "root".to_string(),
			matcher: Matcher::Root,
		}
	}

	/// Returns the spec this pattern was built from.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Returns the regular expression this pattern evaluates.
	pub fn as_str(&self) -> &str {
		match &self.matcher {
			Matcher::Any => ".*",
			Matcher::Root => "^/$",
			Matcher::Compiled(regex) | Matcher::Custom(regex) => regex.as_str(),
		}
	}

	/// Returns the number of capture groups.
	pub fn capture_count(&self) -> usize {
		match &self.matcher {
			Matcher::Any | Matcher::Root => 0,
			Matcher::Compiled(regex) | Matcher::Custom(regex) => regex.captures_len() - 1,
		}
	}

	/// Returns true if the pattern accepts `path`.
	pub fn is_match(&self, path: &str) -> bool {
		match &self.matcher {
			Matcher::Any => true,
			Matcher::Root => path == "/",
			Matcher::Compiled(regex) => regex.is_match(&rooted(path)),
			Matcher::Custom(regex) => regex.is_match(path),
		}
	}

	/// Matches `path` and extracts the captures in positional order.
	pub fn matches(&self, path: &str) -> Option<RouteMatch> {
		let captures = match &self.matcher {
			Matcher::Any => Vec::new(),
			Matcher::Root if path == "/" => Vec::new(),
			Matcher::Root => return None,
			Matcher::Compiled(regex) => collect(regex.captures(&rooted(path))?),
			Matcher::Custom(regex) => collect(regex.captures(path)?),
		};
		Some(RouteMatch {
			path: path.to_string(),
			captures,
		})
	}
}

// Compiled patterns are anchored at `^/`; values such as `alice/42` are
// matched as `/alice/42`.
fn rooted(path: &str) -> std::borrow::Cow<'_, str> {
	if path.starts_with('/') {
		path.into()
	} else {
		format!("/{}", path).into()
	}
}

fn collect(captures: Captures<'_>) -> Vec<Option<String>> {
	captures
		.iter()
		.skip(1)
		.map(|group| group.map(|m| m.as_str().to_string()))
		.collect()
}

/// A navigation value accepted by a route, with its captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
	/// The navigated value as it was sent.
	pub path: String,
	/// One entry per capture group; `None` where an optional group did not
	/// participate.
	pub captures: Vec<Option<String>>,
}

impl RouteMatch {
	/// Returns the participating captures in positional order.
	pub fn values(&self) -> Vec<&str> {
		self.captures.iter().flatten().map(String::as_str).collect()
	}

	/// Returns the capture at `index`, if it participated.
	pub fn get(&self, index: usize) -> Option<&str> {
		self.captures.get(index).and_then(|c| c.as_deref())
	}
}
