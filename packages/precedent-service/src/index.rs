pub mod lexical;
pub mod vector;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use precedent_domain::{Category, TenantId};

/// Facet constraints shared by both indexes. Each non-empty list is an "any of" match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
	pub categories: Vec<Category>,
	pub tags: Vec<String>,
}
impl SearchFilter {
	pub fn category_names(&self) -> Vec<String> {
		self.categories.iter().map(|category| category.as_str().to_string()).collect()
	}
}

#[derive(Clone, Debug)]
pub struct VectorPoint {
	pub record_id: Uuid,
	pub tenant: TenantId,
	pub vector: Vec<f32>,
	pub category: Category,
	pub tags: Vec<String>,
	pub embedding_version: String,
}

#[derive(Clone, Debug)]
pub struct VectorQuery {
	pub tenant: TenantId,
	pub vector: Vec<f32>,
	pub limit: u32,
	pub filter: SearchFilter,
}

/// `score` is cosine similarity; the engine clamps it into 0.0-1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorHit {
	pub record_id: Uuid,
	pub score: f32,
}

#[derive(Clone, Debug)]
pub struct LexicalQuery {
	pub tenant: TenantId,
	pub text: String,
	pub limit: u32,
	pub filter: SearchFilter,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LexicalHit {
	pub record_id: Uuid,
	pub score: f32,
	pub snippet: String,
}
