use std::sync::{Arc, atomic::Ordering};

use precedent_domain::Category;
use precedent_service::{
	AddTagRequest, Cancellation, Error, FindSimilarRequest, SearchFilter, SearchStatus,
	UpdateTextRequest,
};

use super::{create, harness, harness_with};
use crate::support::FailingEmbedding;

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn create_read_update_delete_round_trip() {
	let Some(harness) = harness("create_read_update_delete_round_trip").await else {
		return;
	};
	let service = &harness.service;
	let created = create(
		service,
		"acme",
		"  Fintech payments platform ",
		"Card processing for small merchants",
		Category::Rejected,
	)
	.await;

	assert_eq!(created.title, "Fintech payments platform");
	assert_eq!(created.embedding_version.as_deref(), Some("test:hash:256"));
	assert!(created.embedded_at.is_some());
	assert_eq!(harness.provider.count(), 1);

	let fetched =
		service.get_by_id("acme", created.record_id).await.expect("Record must be readable.");

	assert_eq!(fetched.record_id, created.record_id);
	assert_eq!(fetched.category, Category::Rejected);
	assert_eq!(fetched.embedding_version, created.embedding_version);

	let other_tenant = service.get_by_id("globex", created.record_id).await;

	assert!(matches!(other_tenant, Err(Error::NotFound { .. })));

	let updated = service
		.update_text(UpdateTextRequest {
			tenant_id: "acme".to_string(),
			record_id: created.record_id,
			title: None,
			body: Some("Card processing for enterprise merchants".to_string()),
			reembed: true,
		})
		.await
		.expect("Update must succeed.");

	assert_eq!(updated.title, "Fintech payments platform");
	assert_eq!(updated.body, "Card processing for enterprise merchants");
	assert_eq!(harness.provider.count(), 2);

	for _ in 0..2 {
		service
			.add_tag(AddTagRequest {
				tenant_id: "acme".to_string(),
				record_id: created.record_id,
				tag: "Compliance".to_string(),
			})
			.await
			.expect("Tagging must succeed.");
	}

	let tagged =
		service.get_by_id("acme", created.record_id).await.expect("Record must be readable.");

	assert_eq!(tagged.tags, vec!["compliance".to_string()]);

	service.delete("acme", created.record_id).await.expect("Delete must succeed.");

	assert!(matches!(
		service.get_by_id("acme", created.record_id).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		service.delete("acme", created.record_id).await,
		Err(Error::NotFound { .. })
	));

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn update_without_reembed_keeps_the_previous_vector() {
	let Some(harness) = harness("update_without_reembed_keeps_the_previous_vector").await else {
		return;
	};
	let service = &harness.service;
	let created =
		create(service, "acme", "Queue rewrite", "Replace the queue", Category::Withdrawn).await;
	let updated = service
		.update_text(UpdateTextRequest {
			tenant_id: "acme".to_string(),
			record_id: created.record_id,
			title: Some("Queue rewrite v2".to_string()),
			body: None,
			reembed: false,
		})
		.await
		.expect("Update must succeed.");

	assert_eq!(updated.title, "Queue rewrite v2");
	assert_eq!(updated.embedding_version, created.embedding_version);
	assert_eq!(harness.provider.count(), 1);

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn create_keeps_the_row_when_embedding_fails() {
	let Some(harness) = harness_with(
		"create_keeps_the_row_when_embedding_fails",
		Arc::new(FailingEmbedding::default()),
	)
	.await
	else {
		return;
	};
	let service = &harness.service;
	let created = create(
		service,
		"acme",
		"Fintech payments platform",
		"Card processing for small merchants",
		Category::Rejected,
	)
	.await;

	assert_eq!(created.embedding_version, None);
	assert_eq!(created.embedded_at, None);
	assert_eq!(harness.provider.calls.load(Ordering::SeqCst), 1);

	let fetched =
		service.get_by_id("acme", created.record_id).await.expect("Record must be readable.");

	assert_eq!(fetched, created);

	let response = service
		.find_similar(
			FindSimilarRequest {
				tenant_id: "acme".to_string(),
				query: "fintech payments".to_string(),
				limit: Some(5),
				filter: SearchFilter::default(),
				weights: None,
			},
			&Cancellation::new(),
		)
		.await
		.expect("Search must succeed.");

	assert_eq!(response.status, SearchStatus::LexicalOnly);
	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].record.record_id, created.record_id);

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}
