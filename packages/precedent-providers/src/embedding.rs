use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{Error, Result};

/// Vectors in input order plus what the provider reported about the call.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingBatch {
	pub vectors: Vec<Vec<f32>>,
	pub model: String,
	pub total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
	#[serde(default)]
	model: Option<String>,
	#[serde(default)]
	usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: usize,
	embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
	total_tokens: u64,
}

pub async fn embed(
	cfg: &precedent_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<EmbeddingBatch> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();
	let raw = res.text().await?;

	if status == StatusCode::TOO_MANY_REQUESTS {
		return Err(Error::Throttled { body: raw });
	}
	if !status.is_success() {
		return Err(Error::Status { status: status.as_u16(), body: raw });
	}

	parse_embedding_response(&raw, texts.len(), cfg.dimensions as usize, &cfg.model)
}

fn parse_embedding_response(
	raw: &str,
	expected_count: usize,
	expected_dim: usize,
	requested_model: &str,
) -> Result<EmbeddingBatch> {
	let response: EmbeddingResponse = serde_json::from_str(raw).map_err(|err| {
		Error::invalid_response(format!("Embedding response is not valid JSON: {err}."))
	})?;

	if response.data.len() != expected_count {
		return Err(Error::invalid_response(format!(
			"Embedding response returned {} vectors for {expected_count} inputs.",
			response.data.len()
		)));
	}

	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected_count];

	for item in response.data {
		let Some(slot) = slots.get_mut(item.index) else {
			return Err(Error::invalid_response(format!(
				"Embedding index {} is out of range.",
				item.index
			)));
		};

		if slot.is_some() {
			return Err(Error::invalid_response(format!(
				"Embedding index {} appears more than once.",
				item.index
			)));
		}
		if item.embedding.len() != expected_dim {
			return Err(Error::invalid_response(format!(
				"Embedding dimension mismatch: expected {expected_dim}, got {}.",
				item.embedding.len()
			)));
		}
		if item.embedding.iter().any(|value| !value.is_finite()) {
			return Err(Error::invalid_response("Embedding contains non-finite values."));
		}

		*slot = Some(item.embedding);
	}

	let vectors = slots
		.into_iter()
		.collect::<Option<Vec<_>>>()
		.ok_or_else(|| Error::invalid_response("Embedding response is missing an index."))?;
	let model = response
		.model
		.filter(|model| !model.trim().is_empty())
		.unwrap_or_else(|| requested_model.to_string());
	let total_tokens = response.usage.map(|usage| usage.total_tokens).unwrap_or(0);

	Ok(EmbeddingBatch { vectors, model, total_tokens })
}
