use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use precedent_domain::text;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CacheStats {
	pub entries: usize,
	pub total_hits: u64,
	pub max_entries: usize,
}

#[derive(Debug)]
struct CacheEntry<T> {
	value: T,
	created_at: OffsetDateTime,
	hit_count: u64,
}

/// Time-boxed memo keyed by normalized query text.
///
/// Lookups try the exact key first, then fall back to the live key whose character-set Jaccard
/// similarity with the query is highest and at least `similarity_threshold`. Entries older than the
/// TTL are deleted as soon as a lookup touches them.
#[derive(Debug)]
pub struct ResponseCache<T> {
	similarity_threshold: f64,
	ttl: Duration,
	max_entries: usize,
	entries: Mutex<HashMap<String, CacheEntry<T>>>,
}
impl<T> ResponseCache<T>
where
	T: Clone,
{
	pub fn new(similarity_threshold: f64, ttl: Duration, max_entries: usize) -> Self {
		Self {
			similarity_threshold,
			ttl,
			max_entries: max_entries.max(1),
			entries: Mutex::new(HashMap::new()),
		}
	}

	pub fn from_config(cfg: &precedent_config::Cache) -> Self {
		Self::new(cfg.similarity_threshold, Duration::seconds(cfg.ttl_seconds), cfg.max_entries)
	}

	pub fn get(&self, query: &str) -> Option<T> {
		self.get_at(query, OffsetDateTime::now_utc())
	}

	pub fn get_at(&self, query: &str, now: OffsetDateTime) -> Option<T> {
		let key = text::normalize_query(query);
		let mut entries = self.lock();

		if let Some(value) = self.take_exact(&mut entries, &key, now) {
			return Some(value);
		}

		let mut expired = Vec::new();
		let mut best: Option<(f64, OffsetDateTime, &String)> = None;

		for (candidate, entry) in entries.iter() {
			if self.is_expired(entry, now) {
				expired.push(candidate.clone());

				continue;
			}

			let similarity = text::char_jaccard(&key, candidate);

			if similarity < self.similarity_threshold {
				continue;
			}

			let replace = match best {
				None => true,
				Some((best_similarity, best_created_at, best_key)) =>
					similarity > best_similarity
						|| (similarity == best_similarity
							&& (entry.created_at > best_created_at
								|| (entry.created_at == best_created_at
									&& candidate < best_key))),
			};

			if replace {
				best = Some((similarity, entry.created_at, candidate));
			}
		}

		let best_key = best.map(|(_, _, candidate)| candidate.clone());

		for candidate in expired {
			entries.remove(&candidate);
		}

		let entry = entries.get_mut(&best_key?)?;

		entry.hit_count += 1;

		Some(entry.value.clone())
	}

	/// Exact-key lookup with no similarity fallback. Values derived from the query text itself,
	/// such as embeddings, must only be served for the same normalized text.
	pub fn get_exact(&self, query: &str) -> Option<T> {
		self.get_exact_at(query, OffsetDateTime::now_utc())
	}

	pub fn get_exact_at(&self, query: &str, now: OffsetDateTime) -> Option<T> {
		let key = text::normalize_query(query);
		let mut entries = self.lock();

		self.take_exact(&mut entries, &key, now)
	}

	pub fn set(&self, query: &str, value: T) {
		self.set_at(query, value, OffsetDateTime::now_utc());
	}

	/// Replaces an existing key in place; otherwise evicts the oldest entry when full.
	pub fn set_at(&self, query: &str, value: T, now: OffsetDateTime) {
		let key = text::normalize_query(query);

		if key.is_empty() {
			return;
		}

		let mut entries = self.lock();

		if let Some(entry) = entries.get_mut(&key) {
			*entry = CacheEntry { value, created_at: now, hit_count: 0 };

			return;
		}

		while entries.len() >= self.max_entries {
			let Some(oldest) = entries
				.iter()
				.min_by(|(a_key, a), (b_key, b)| {
					a.created_at.cmp(&b.created_at).then_with(|| a_key.cmp(b_key))
				})
				.map(|(key, _)| key.clone())
			else {
				break;
			};

			entries.remove(&oldest);
		}

		entries.insert(key, CacheEntry { value, created_at: now, hit_count: 0 });
	}

	pub fn clear(&self) {
		self.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	pub fn stats(&self) -> CacheStats {
		let entries = self.lock();

		CacheStats {
			entries: entries.len(),
			total_hits: entries.values().map(|entry| entry.hit_count).sum(),
			max_entries: self.max_entries,
		}
	}

	fn take_exact(
		&self,
		entries: &mut HashMap<String, CacheEntry<T>>,
		key: &str,
		now: OffsetDateTime,
	) -> Option<T> {
		let entry = entries.get_mut(key)?;

		if self.is_expired(entry, now) {
			entries.remove(key);

			return None;
		}

		entry.hit_count += 1;

		Some(entry.value.clone())
	}

	fn is_expired(&self, entry: &CacheEntry<T>, now: OffsetDateTime) -> bool {
		now - entry.created_at > self.ttl
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner())
	}
}
