use precedent_domain::Category;
use precedent_service::{Cancellation, FindSimilarRequest, SearchFilter, SearchStatus};

use super::{create, harness};

fn request(tenant_id: &str, query: &str) -> FindSimilarRequest {
	FindSimilarRequest {
		tenant_id: tenant_id.to_string(),
		query: query.to_string(),
		limit: Some(5),
		filter: SearchFilter::default(),
		weights: None,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn fintech_query_prefers_the_fintech_record() {
	let Some(harness) = harness("fintech_query_prefers_the_fintech_record").await else {
		return;
	};
	let service = &harness.service;
	let fintech = create(
		service,
		"acme",
		"Fintech payments platform",
		"Card processing for small merchants",
		Category::Rejected,
	)
	.await;
	let grooming = create(
		service,
		"acme",
		"Pet grooming marketplace",
		"Booking app for independent groomers",
		Category::Adopted,
	)
	.await;

	assert!(fintech.embedding_version.is_some());

	let response = service
		.find_similar(request("acme", "fintech payments"), &Cancellation::new())
		.await
		.expect("Search must succeed.");

	assert_eq!(response.status, SearchStatus::Complete);
	assert_eq!(response.items[0].record.record_id, fintech.record_id);
	assert!(response.items[0].score > 0.0);
	assert!(response.items[0].lexical_score > 0.0);

	if let Some(other) =
		response.items.iter().find(|item| item.record.record_id == grooming.record_id)
	{
		assert!(other.score < response.items[0].score);
	}

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn tenants_never_see_each_other() {
	let Some(harness) = harness("tenants_never_see_each_other").await else {
		return;
	};
	let service = &harness.service;
	let theirs = create(
		service,
		"globex",
		"Fintech payments platform",
		"Card processing for small merchants",
		Category::Rejected,
	)
	.await;
	let response = service
		.find_similar(request("acme", "fintech payments"), &Cancellation::new())
		.await
		.expect("Search must succeed.");

	assert!(response.items.iter().all(|item| item.record.record_id != theirs.record_id));
	assert!(response.items.is_empty());

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn stale_index_entries_are_dropped_on_hydration() {
	let Some(harness) = harness("stale_index_entries_are_dropped_on_hydration").await else {
		return;
	};
	let service = &harness.service;
	let kept = create(
		service,
		"acme",
		"Ledger migration",
		"Move ledgers to Postgres",
		Category::Adopted,
	)
	.await;
	let stale = create(
		service,
		"acme",
		"Ledger migration rollback",
		"Move ledgers back to MySQL",
		Category::Withdrawn,
	)
	.await;

	// Leave the vector point behind so only the row is gone.
	sqlx::query("DELETE FROM records WHERE record_id = $1")
		.bind(stale.record_id)
		.execute(&service.db.pool)
		.await
		.expect("Failed to delete row.");

	let response = service
		.find_similar(request("acme", "ledger migration"), &Cancellation::new())
		.await
		.expect("Search must succeed.");
	let ids = response.items.iter().map(|item| item.record.record_id).collect::<Vec<_>>();

	assert_eq!(ids, vec![kept.record_id]);

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PRECEDENT_PG_DSN and PRECEDENT_QDRANT_URL to run."]
async fn tag_filter_narrows_results() {
	let Some(harness) = harness("tag_filter_narrows_results").await else {
		return;
	};
	let service = &harness.service;
	let tagged = create(
		service,
		"acme",
		"Queue rewrite",
		"Replace the job queue with Kafka",
		Category::Rejected,
	)
	.await;
	let untagged = create(
		service,
		"acme",
		"Queue rewrite again",
		"Replace the job queue with SQS",
		Category::Rejected,
	)
	.await;

	service
		.add_tag(precedent_service::AddTagRequest {
			tenant_id: "acme".to_string(),
			record_id: tagged.record_id,
			tag: "Scope-Creep".to_string(),
		})
		.await
		.expect("Failed to add tag.");

	let mut req = request("acme", "queue rewrite");

	req.filter.tags = vec!["scope-creep".to_string()];

	let response =
		service.find_similar(req, &Cancellation::new()).await.expect("Search must succeed.");
	let ids = response.items.iter().map(|item| item.record.record_id).collect::<Vec<_>>();

	assert_eq!(ids, vec![tagged.record_id]);
	assert!(!ids.contains(&untagged.record_id));
	assert_eq!(response.items[0].record.tags, vec!["scope-creep".to_string()]);

	harness.test_db.cleanup().await.expect("Failed to cleanup test database.");
}
