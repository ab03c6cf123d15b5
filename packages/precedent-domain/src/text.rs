use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// NFKC, lowercase, single spaces.
pub fn normalize_query(input: &str) -> String {
	let folded: String = input.nfkc().collect::<String>().to_lowercase();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity over the sets of characters in each string.
///
/// Two empty strings are identical (1.0); one empty string shares nothing (0.0).
pub fn char_jaccard(a: &str, b: &str) -> f64 {
	let left: HashSet<char> = a.chars().collect();
	let right: HashSet<char> = b.chars().collect();

	if left.is_empty() && right.is_empty() {
		return 1.0;
	}

	let intersection = left.intersection(&right).count();
	let union = left.union(&right).count();

	intersection as f64 / union as f64
}

/// Cuts at a grapheme boundary and appends an ellipsis when anything was dropped.
pub fn truncate_graphemes(input: &str, max_graphemes: usize) -> String {
	let mut graphemes = input.graphemes(true);
	let kept: String = graphemes.by_ref().take(max_graphemes).collect();

	if graphemes.next().is_some() { format!("{kept}…") } else { kept }
}
