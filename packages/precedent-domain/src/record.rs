use std::{
	fmt::{self, Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_BODY_CHARS: usize = 20_000;
pub const MAX_TAGS: usize = 32;
pub const MAX_TAG_CHARS: usize = 100;

/// Outcome of the decision a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Adopted,
	Rejected,
	Withdrawn,
	Cancelled,
}
impl Category {
	pub const ALL: [Self; 4] = [Self::Adopted, Self::Rejected, Self::Withdrawn, Self::Cancelled];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Adopted => "adopted",
			Self::Rejected => "rejected",
			Self::Withdrawn => "withdrawn",
			Self::Cancelled => "cancelled",
		}
	}
}
impl Display for Category {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Category {
	type Err = RecordRejectCode;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|category| category.as_str() == raw.trim())
			.ok_or(RecordRejectCode::UnknownCategory)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordRejectCode {
	#[error("title must be non-empty.")]
	EmptyTitle,
	#[error("title must be at most 255 characters.")]
	TitleTooLong,
	#[error("body must be non-empty.")]
	EmptyBody,
	#[error("body must be at most 20000 characters.")]
	BodyTooLong,
	#[error("category must be one of adopted, rejected, withdrawn, or cancelled.")]
	UnknownCategory,
	#[error("tags must be non-empty strings of at most 100 characters.")]
	InvalidTag,
	#[error("a record may carry at most 32 tags.")]
	TooManyTags,
}

pub fn validate_title(title: &str) -> Result<(), RecordRejectCode> {
	if title.trim().is_empty() {
		return Err(RecordRejectCode::EmptyTitle);
	}
	if title.chars().count() > MAX_TITLE_CHARS {
		return Err(RecordRejectCode::TitleTooLong);
	}

	Ok(())
}

pub fn validate_body(body: &str) -> Result<(), RecordRejectCode> {
	if body.trim().is_empty() {
		return Err(RecordRejectCode::EmptyBody);
	}
	if body.chars().count() > MAX_BODY_CHARS {
		return Err(RecordRejectCode::BodyTooLong);
	}

	Ok(())
}

/// Trims, lowercases and dedups tags, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Result<Vec<String>, RecordRejectCode>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut out: Vec<String> = Vec::new();

	for tag in tags {
		let tag = normalize_tag(tag.as_ref())?;

		if !out.contains(&tag) {
			out.push(tag);
		}
	}

	if out.len() > MAX_TAGS {
		return Err(RecordRejectCode::TooManyTags);
	}

	Ok(out)
}

pub fn normalize_tag(raw: &str) -> Result<String, RecordRejectCode> {
	let tag = raw.trim().to_lowercase();

	if tag.is_empty() || tag.chars().count() > MAX_TAG_CHARS {
		return Err(RecordRejectCode::InvalidTag);
	}

	Ok(tag)
}

/// Text sent to the embedding provider for a record.
pub fn embedding_text(title: &str, body: &str) -> String {
	format!("{} {}", title.trim(), body.trim())
}
