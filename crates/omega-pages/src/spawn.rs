//! Cooperative task spawning.
//!
//! The dispatch loops of the router and the route consumers run as local
//! (non-`Send`) tasks on the UI thread. [`Spawner`] hides which executor
//! drives them:
//!
//! - [`Spawner::tokio`] spawns onto the current [`tokio::task::LocalSet`].
//! - [`Spawner::from_local`] wraps any [`LocalSpawn`] implementation, such as
//!   `futures::executor::LocalPool::spawner()`, which tests use to step tasks
//!   deterministically with `run_until_stalled`.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};

/// Handle used to start cooperative tasks.
#[derive(Clone)]
pub struct Spawner {
	inner: Rc<dyn LocalSpawn>,
}

impl fmt::Debug for Spawner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Spawner").finish_non_exhaustive()
	}
}

impl Spawner {
	/// Wraps a local spawner.
	pub fn from_local<S>(spawner: S) -> Self
	where
		S: LocalSpawn + 'static,
	{
		Self {
			inner: Rc::new(spawner),
		}
	}

	/// Creates a spawner backed by `tokio::task::spawn_local`.
	///
	/// Tasks are spawned onto the `LocalSet` that is current when
	/// [`spawn`](Self::spawn) is called; spawning outside a `LocalSet` panics
	/// inside tokio.
	pub fn tokio() -> Self {
		Self::from_local(TokioLocalSpawner)
	}

	/// Spawns a task.
	///
	/// # Errors
	///
	/// Returns [`SpawnError`] if the executor has shut down.
	pub fn spawn<F>(&self, future: F) -> Result<(), SpawnError>
	where
		F: Future<Output = ()> + 'static,
	{
		self.inner.spawn_local(future)
	}
}

/// [`LocalSpawn`] adapter for tokio's local task set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLocalSpawner;

impl LocalSpawn for TokioLocalSpawner {
	fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		tokio::task::spawn_local(future);
		Ok(())
	}
}
