use std::{
	collections::VecDeque,
	sync::{Mutex, MutexGuard},
	thread,
	time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sliding-window admission control: at most `max_requests` admissions within any trailing
/// `window`.
///
/// Timestamps older than the window are pruned lazily on every call, so an admission becomes
/// available again exactly `window` after the oldest one.
#[derive(Debug)]
pub struct RateLimiter {
	max_requests: usize,
	window: Duration,
	admitted: Mutex<VecDeque<Instant>>,
}
impl RateLimiter {
	pub fn new(max_requests: u32, window: Duration) -> Self {
		Self {
			max_requests: max_requests as usize,
			window,
			admitted: Mutex::new(VecDeque::with_capacity(max_requests as usize)),
		}
	}

	pub fn from_config(cfg: &precedent_config::RateLimit) -> Self {
		Self::new(cfg.max_requests, Duration::from_secs_f64(cfg.window_seconds))
	}

	pub fn try_acquire(&self) -> bool {
		self.try_acquire_at(Instant::now())
	}

	pub fn try_acquire_at(&self, now: Instant) -> bool {
		let mut admitted = self.lock();

		prune(&mut admitted, now, self.window);

		if admitted.len() >= self.max_requests {
			return false;
		}

		admitted.push_back(now);

		true
	}

	/// Polls until a slot frees up or `timeout` elapses. Blocks the calling thread. A timeout too
	/// large to represent as an `Instant` waits without a deadline.
	pub fn acquire_blocking(&self, timeout: Duration) -> bool {
		let deadline = Instant::now().checked_add(timeout);

		loop {
			let now = Instant::now();

			if self.try_acquire_at(now) {
				return true;
			}

			let Some(remaining) = remaining(deadline, now) else {
				return false;
			};

			thread::sleep(POLL_INTERVAL.min(remaining));
		}
	}

	/// Async counterpart of [`RateLimiter::acquire_blocking`]. Sleeps until the next slot is due
	/// instead of polling.
	pub async fn acquire(&self, timeout: Duration) -> bool {
		let deadline = Instant::now().checked_add(timeout);

		loop {
			let now = Instant::now();

			if self.try_acquire_at(now) {
				return true;
			}

			let Some(remaining) = remaining(deadline, now) else {
				return false;
			};
			let wait = self
				.time_until_next_slot_at(now)
				.clamp(Duration::from_millis(1), POLL_INTERVAL)
				.min(remaining);

			tokio::time::sleep(wait).await;
		}
	}

	pub fn time_until_next_slot(&self) -> Duration {
		self.time_until_next_slot_at(Instant::now())
	}

	pub fn time_until_next_slot_at(&self, now: Instant) -> Duration {
		let mut admitted = self.lock();

		prune(&mut admitted, now, self.window);

		if admitted.len() < self.max_requests {
			return Duration::ZERO;
		}

		admitted
			.front()
			.map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
			.unwrap_or(Duration::ZERO)
	}

	pub fn current_count(&self) -> usize {
		self.current_count_at(Instant::now())
	}

	pub fn current_count_at(&self, now: Instant) -> usize {
		let mut admitted = self.lock();

		prune(&mut admitted, now, self.window);

		admitted.len()
	}

	fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
		self.admitted.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// `None` once the deadline has passed; unbounded when there is no deadline.
fn remaining(deadline: Option<Instant>, now: Instant) -> Option<Duration> {
	match deadline {
		Some(deadline) if now >= deadline => None,
		Some(deadline) => Some(deadline - now),
		None => Some(Duration::MAX),
	}
}

fn prune(admitted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
	while let Some(oldest) = admitted.front() {
		if now.saturating_duration_since(*oldest) < window {
			break;
		}

		admitted.pop_front();
	}
}
