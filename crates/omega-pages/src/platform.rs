//! Platform access.
//!
//! [`Platform`] bundles everything the toolkit would otherwise reach for
//! through globals: the document, the history, the task spawner and the
//! settings. Routers and controllers take it at construction, so tests can
//! run them against an in-memory document and history.

use std::fmt;
use std::rc::Rc;

use crate::dom::Document;
use crate::router::{HistoryProvider, MemoryHistory};
use crate::settings::PagesSettings;
use crate::spawn::Spawner;

/// Capability object handed to routers and controllers.
#[derive(Clone)]
pub struct Platform {
	document: Document,
	history: Rc<dyn HistoryProvider>,
	spawner: Spawner,
	settings: PagesSettings,
}

impl fmt::Debug for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Platform")
			.field("document", &self.document)
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

impl Platform {
	/// Creates a platform from its parts, with default settings.
	pub fn new(document: Document, history: Rc<dyn HistoryProvider>, spawner: Spawner) -> Self {
		Self {
			document,
			history,
			spawner,
			settings: PagesSettings::default(),
		}
	}

	/// Creates a platform with a fresh document and a [`MemoryHistory`]
	/// positioned at `/`.
	pub fn in_memory(spawner: Spawner) -> Self {
		Self::new(Document::new(), Rc::new(MemoryHistory::default()), spawner)
	}

	/// Replaces the settings.
	pub fn with_settings(mut self, settings: PagesSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Returns the document.
	pub fn document(&self) -> &Document {
		&self.document
	}

	/// Returns the history provider.
	pub fn history(&self) -> &Rc<dyn HistoryProvider> {
		&self.history
	}

	/// Returns the spawner.
	pub fn spawner(&self) -> &Spawner {
		&self.spawner
	}

	/// Returns the settings.
	pub fn settings(&self) -> &PagesSettings {
		&self.settings
	}
}
