//! Cooperative Channel
//!
//! [`Channel<T>`] is the only concurrency primitive of the toolkit: a closable,
//! single-threaded message queue shared by cheap clones of one handle.
//!
//! ## Semantics
//!
//! - **Rendezvous by default**: with a capacity of zero, [`Channel::send`]
//!   suspends until a receiver takes the value.
//! - **Buffered on demand**: with a capacity of `n`, up to `n` values are
//!   accepted without suspending.
//! - **Non-suspending puts**: [`Channel::try_send`] never suspends. When there
//!   is no room the value is queued as a pending put (up to
//!   [`ChannelConfig::max_pending`]), otherwise it is rejected with
//!   [`ChannelError::Full`].
//! - **Closing**: buffered values stay receivable until drained, pending puts
//!   fail with [`ChannelError::Closed`], and receivers observe `None` once
//!   nothing is left. Closing twice is [`ChannelError::AlreadyClosed`].
//!
//! ## Example
//!
//! ```ignore
//! use omega_pages::channel::Channel;
//!
//! let ch = Channel::new();
//! spawner.spawn({
//!     let ch = ch.clone();
//!     async move {
//!         while let Some(value) = ch.recv().await {
//!             println!("got {}", value);
//!         }
//!     }
//! })?;
//!
//! ch.send(1).await?;
//! ch.close()?;
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

/// Maximum number of pending puts a channel accepts by default.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Errors produced by channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
	/// The channel is closed and accepts no further values.
	#[error("channel is closed")]
	Closed,
	/// `close` was called on a channel that was already closed.
	#[error("channel was already closed")]
	AlreadyClosed,
	/// Too many puts are waiting for a receiver; the value was dropped.
	#[error("channel has {0} pending puts, value dropped")]
	Full(usize),
}

/// Capacity settings for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
	/// Number of values buffered without a receiver. Zero means rendezvous.
	pub capacity: usize,
	/// Number of puts allowed to wait for room before new ones are rejected.
	pub max_pending: usize,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			capacity: 0,
			max_pending: DEFAULT_MAX_PENDING,
		}
	}
}

impl ChannelConfig {
	/// Creates a configuration with the given buffer capacity.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			capacity,
			..Self::default()
		}
	}
}

struct PendingPut<T> {
	value: Option<T>,
	outcome: Option<Result<(), ChannelError>>,
	waker: Option<Waker>,
}

type PutSlot<T> = Rc<RefCell<PendingPut<T>>>;

impl<T> PendingPut<T> {
	fn complete(&mut self, outcome: Result<(), ChannelError>) {
		self.outcome = Some(outcome);
		if let Some(waker) = self.waker.take() {
			waker.wake();
		}
	}
}

struct Shared<T> {
	buffer: VecDeque<T>,
	puts: VecDeque<PutSlot<T>>,
	takers: Vec<(u64, Waker)>,
	next_taker: u64,
	config: ChannelConfig,
	closed: bool,
}

impl<T> Shared<T> {
	fn has_room(&self) -> bool {
		self.puts.is_empty() && self.buffer.len() < self.config.capacity
	}

	fn wake_takers(&mut self) {
		for (_, waker) in self.takers.drain(..) {
			waker.wake();
		}
	}

	// One slot per receive future, kept across re-polls.
	fn register_taker(&mut self, key: &mut Option<u64>, waker: &Waker) {
		if let Some(id) = *key {
			if let Some((_, current)) = self.takers.iter_mut().find(|(k, _)| *k == id) {
				if !current.will_wake(waker) {
					*current = waker.clone();
				}
				return;
			}
		}
		let id = *key.get_or_insert_with(|| {
			let id = self.next_taker;
			self.next_taker += 1;
			id
		});
		self.takers.push((id, waker.clone()));
	}

	fn remove_taker(&mut self, key: Option<u64>) {
		if let Some(id) = key {
			self.takers.retain(|(k, _)| *k != id);
		}
	}

	// Buffered values first, then pending puts in arrival order.
	fn take(&mut self) -> Option<T> {
		if let Some(value) = self.buffer.pop_front() {
			self.promote_pending();
			return Some(value);
		}

		while let Some(slot) = self.puts.pop_front() {
			let mut put = slot.borrow_mut();
			if let Some(value) = put.value.take() {
				put.complete(Ok(()));
				return Some(value);
			}
		}

		None
	}

	fn promote_pending(&mut self) {
		while self.buffer.len() < self.config.capacity {
			let Some(slot) = self.puts.pop_front() else {
				break;
			};
			let mut put = slot.borrow_mut();
			if let Some(value) = put.value.take() {
				self.buffer.push_back(value);
				put.complete(Ok(()));
			}
		}
	}
}

/// A cooperative, closable message queue.
///
/// Every clone refers to the same queue; any clone may send, receive or
/// close. The handle is `!Send`: channels live on the UI thread.
pub struct Channel<T> {
	shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Clone for Channel<T> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<T> Default for Channel<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for Channel<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let shared = self.shared.borrow();
		f.debug_struct("Channel")
			.field("buffered", &shared.buffer.len())
			.field("pending_puts", &shared.puts.len())
			.field("capacity", &shared.config.capacity)
			.field("closed", &shared.closed)
			.finish()
	}
}

impl<T> Channel<T> {
	/// Creates an unbuffered (rendezvous) channel.
	pub fn new() -> Self {
		Self::with_config(ChannelConfig::default())
	}

	/// Creates a channel buffering up to `capacity` values.
	pub fn with_capacity(capacity: usize) -> Self {
		Self::with_config(ChannelConfig::with_capacity(capacity))
	}

	/// Creates a channel from an explicit configuration.
	pub fn with_config(config: ChannelConfig) -> Self {
		Self {
			shared: Rc::new(RefCell::new(Shared {
				buffer: VecDeque::with_capacity(config.capacity),
				puts: VecDeque::new(),
				takers: Vec::new(),
				next_taker: 0,
				config,
				closed: false,
			})),
		}
	}

	/// Sends a value, suspending until it is accepted.
	///
	/// The returned future resolves with [`ChannelError::Closed`] if the
	/// channel is closed before or while the value waits. Dropping the future
	/// before it resolves withdraws the value.
	pub fn send(&self, value: T) -> SendFuture<T> {
		SendFuture {
			shared: Rc::clone(&self.shared),
			state: SendState::Start(value),
		}
	}

	/// Puts a value without suspending the caller.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::Closed`] if the channel is closed, or
	/// [`ChannelError::Full`] if `max_pending` puts are already waiting.
	pub fn try_send(&self, value: T) -> Result<(), ChannelError> {
		let mut shared = self.shared.borrow_mut();
		if shared.closed {
			return Err(ChannelError::Closed);
		}

		if shared.has_room() {
			shared.buffer.push_back(value);
		} else {
			if shared.puts.len() >= shared.config.max_pending {
				return Err(ChannelError::Full(shared.puts.len()));
			}
			shared.puts.push_back(Rc::new(RefCell::new(PendingPut {
				value: Some(value),
				outcome: None,
				waker: None,
			})));
		}

		shared.wake_takers();
		Ok(())
	}

	/// Receives the next value.
	///
	/// Resolves to `None` once the channel is closed and drained.
	pub fn recv(&self) -> RecvFuture<T> {
		RecvFuture {
			shared: Rc::clone(&self.shared),
			key: None,
		}
	}

	/// Closes the channel.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::AlreadyClosed`] on a second call.
	pub fn close(&self) -> Result<(), ChannelError> {
		let puts: Vec<PutSlot<T>> = {
			let mut shared = self.shared.borrow_mut();
			if shared.closed {
				return Err(ChannelError::AlreadyClosed);
			}
			shared.closed = true;
			shared.wake_takers();
			shared.puts.drain(..).collect()
		};

		for slot in puts {
			let mut put = slot.borrow_mut();
			put.value = None;
			put.complete(Err(ChannelError::Closed));
		}

		Ok(())
	}

	/// Returns true once [`close`](Self::close) has been called.
	pub fn is_closed(&self) -> bool {
		self.shared.borrow().closed
	}

	/// Returns the number of values waiting to be received.
	pub fn len(&self) -> usize {
		let shared = self.shared.borrow();
		shared.buffer.len() + shared.puts.len()
	}

	/// Returns true if no value is waiting to be received.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the buffer capacity.
	pub fn capacity(&self) -> usize {
		self.shared.borrow().config.capacity
	}

	#[cfg(test)]
	fn taker_count(&self) -> usize {
		self.shared.borrow().takers.len()
	}

	/// Returns true if both handles refer to the same channel.
	pub fn same_channel(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.shared, &other.shared)
	}

	/// Adapts this channel into a stream that ends when the channel closes.
	pub fn into_stream(self) -> impl Stream<Item = T>
	where
		T: 'static,
	{
		stream::unfold(self, |channel| async move {
			let value = channel.recv().await?;
			Some((value, channel))
		})
	}
}

enum SendState<T> {
	Start(T),
	Waiting(PutSlot<T>),
	Done,
}

/// Future returned by [`Channel::send`].
#[must_use = "futures do nothing unless polled"]
pub struct SendFuture<T> {
	shared: Rc<RefCell<Shared<T>>>,
	state: SendState<T>,
}

// The value is moved, never pinned.
impl<T> Unpin for SendFuture<T> {}

impl<T> Future for SendFuture<T> {
	type Output = Result<(), ChannelError>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();

		match std::mem::replace(&mut this.state, SendState::Done) {
			SendState::Start(value) => {
				let mut shared = this.shared.borrow_mut();
				if shared.closed {
					return Poll::Ready(Err(ChannelError::Closed));
				}

				if shared.has_room() {
					shared.buffer.push_back(value);
					shared.wake_takers();
					return Poll::Ready(Ok(()));
				}

				if shared.puts.len() >= shared.config.max_pending {
					return Poll::Ready(Err(ChannelError::Full(shared.puts.len())));
				}

				let slot = Rc::new(RefCell::new(PendingPut {
					value: Some(value),
					outcome: None,
					waker: Some(cx.waker().clone()),
				}));
				shared.puts.push_back(Rc::clone(&slot));
				shared.wake_takers();
				drop(shared);

				this.state = SendState::Waiting(slot);
				Poll::Pending
			}
			SendState::Waiting(slot) => {
				let outcome = {
					let mut put = slot.borrow_mut();
					let outcome = put.outcome.take();
					if outcome.is_none() {
						put.waker = Some(cx.waker().clone());
					}
					outcome
				};

				match outcome {
					Some(outcome) => Poll::Ready(outcome),
					None => {
						this.state = SendState::Waiting(slot);
						Poll::Pending
					}
				}
			}
			SendState::Done => Poll::Ready(Ok(())),
		}
	}
}

impl<T> Drop for SendFuture<T> {
	fn drop(&mut self) {
		if let SendState::Waiting(slot) = &self.state {
			if slot.borrow().outcome.is_some() {
				return;
			}
			if let Ok(mut shared) = self.shared.try_borrow_mut() {
				shared.puts.retain(|put| !Rc::ptr_eq(put, slot));
			}
		}
	}
}

/// Future returned by [`Channel::recv`].
///
/// Dropping the future before it resolves withdraws its waker.
#[must_use = "futures do nothing unless polled"]
pub struct RecvFuture<T> {
	shared: Rc<RefCell<Shared<T>>>,
	key: Option<u64>,
}

impl<T> Future for RecvFuture<T> {
	type Output = Option<T>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();
		let mut shared = this.shared.borrow_mut();
		if let Some(value) = shared.take() {
			shared.remove_taker(this.key.take());
			return Poll::Ready(Some(value));
		}
		if shared.closed {
			shared.remove_taker(this.key.take());
			return Poll::Ready(None);
		}
		shared.register_taker(&mut this.key, cx.waker());
		Poll::Pending
	}
}

impl<T> Drop for RecvFuture<T> {
	fn drop(&mut self) {
		if self.key.is_none() {
			return;
		}
		if let Ok(mut shared) = self.shared.try_borrow_mut() {
			shared.remove_taker(self.key);
		}
	}
}
