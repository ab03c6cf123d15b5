use std::{
	pin::pin,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use tokio::sync::Notify;

use crate::{Error, Result};

/// Cloneable cancellation signal. Every clone observes the same flag.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
	inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	cancelled: AtomicBool,
	notify: Notify,
}

impl Cancellation {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
			self.inner.notify.notify_waiters();
		}
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::SeqCst)
	}

	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
	}

	/// Resolves once [`Cancellation::cancel`] has been called on any clone.
	pub async fn cancelled(&self) {
		let mut notified = pin!(self.inner.notify.notified());

		// Register before checking the flag so a concurrent `cancel` cannot slip in between.
		notified.as_mut().enable();

		if self.is_cancelled() {
			return;
		}

		notified.await;
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn clones_share_the_signal() {
		let cancel = Cancellation::new();
		let observer = cancel.clone();

		assert!(observer.check().is_ok());

		cancel.cancel();

		assert!(observer.is_cancelled());
		assert!(matches!(observer.check(), Err(Error::Cancelled)));
	}

	#[tokio::test]
	async fn cancelled_wakes_waiters() {
		let cancel = Cancellation::new();
		let waiter = cancel.clone();
		let handle = tokio::spawn(async move { waiter.cancelled().await });

		tokio::time::sleep(Duration::from_millis(10)).await;
		cancel.cancel();

		tokio::time::timeout(Duration::from_secs(1), handle)
			.await
			.expect("Waiter must wake after cancel.")
			.expect("Waiter task panicked.");
	}

	#[tokio::test]
	async fn cancelled_returns_immediately_when_already_set() {
		let cancel = Cancellation::new();

		cancel.cancel();

		tokio::time::timeout(Duration::from_millis(100), cancel.cancelled())
			.await
			.expect("Already-cancelled signal must resolve.");
	}
}
