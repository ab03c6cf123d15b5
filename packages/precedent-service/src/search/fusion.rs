use std::{cmp::Ordering, collections::HashMap};

use uuid::Uuid;

use crate::{LexicalHit, SearchResult, SearchWeights, VectorHit};

/// Weighted sum per record id: `v * w_v + l * w_t`, with an absent signal contributing zero.
///
/// Duplicate ids within one signal keep their best score.
pub fn fuse(
	vector: &[VectorHit],
	lexical: &[LexicalHit],
	weights: SearchWeights,
) -> Vec<SearchResult> {
	let mut merged: HashMap<Uuid, SearchResult> = HashMap::new();

	for hit in vector {
		let score = unit_score(hit.score);
		let entry =
			merged.entry(hit.record_id).or_insert_with(|| SearchResult::empty(hit.record_id));

		entry.vector_score = entry.vector_score.max(score);
	}
	for hit in lexical {
		let score = unit_score(hit.score);
		let entry =
			merged.entry(hit.record_id).or_insert_with(|| SearchResult::empty(hit.record_id));

		entry.lexical_score = entry.lexical_score.max(score);

		if !hit.snippet.trim().is_empty() && !entry.snippets.contains(&hit.snippet) {
			entry.snippets.push(hit.snippet.clone());
		}
	}

	merged
		.into_values()
		.map(|mut result| {
			result.score =
				result.vector_score * weights.vector + result.lexical_score * weights.text;

			result
		})
		.collect()
}

/// Score descending, then record id ascending, then truncate.
pub fn rerank(mut results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
	results.sort_by(|a, b| {
		cmp_f64_desc(a.score, b.score).then_with(|| a.record_id.cmp(&b.record_id))
	});
	results.truncate(limit);

	results
}

pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

fn unit_score(raw: f32) -> f64 {
	if raw.is_nan() {
		return 0.0;
	}

	f64::from(raw).clamp(0.0, 1.0)
}
