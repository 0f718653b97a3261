use std::sync::Arc;

use capmap_core::store::{EffectiveBusinessDomainStore, RealizationStore};
use capmap_projectors::{ProjectionPipeline, StaleInheritancePolicy};
use capmap_store_sqlite::SqliteStore;
use serde_json::json;
use uuid::Uuid;

use crate::{Error, ReplayConfig, replay};

const A: &str = "6f1c1b2e-0000-4000-8000-00000000000a";
const B: &str = "6f1c1b2e-0000-4000-8000-00000000000b";
const FINANCE: &str = "6f1c1b2e-0000-4000-8000-0000000000f1";
const LINK: &str = "6f1c1b2e-0000-4000-8000-0000000000c1";
const LEDGER: &str = "6f1c1b2e-0000-4000-8000-0000000000c2";

fn stream() -> String {
  [
    json!({"eventType": "BusinessDomainCreated", "eventData": {"id": FINANCE, "name": "Finance"}}),
    json!({"eventType": "CapabilityCreated", "eventData": {"id": A, "name": "A", "level": "L1"}}),
    json!({"eventType": "CapabilityCreated",
           "eventData": {"id": B, "name": "B", "parentId": A, "level": "L2"}}),
    json!({"eventType": "CapabilityAssignedToDomain",
           "eventData": {"id": LINK, "businessDomainId": FINANCE, "capabilityId": A}}),
    json!({"eventType": "CapabilityDependencyAdded", "eventData": {"id": A}}),
    json!({"eventType": "SystemLinkedToCapability",
           "eventData": {"id": LINK, "capabilityId": B, "componentId": LEDGER,
                         "componentName": "Ledger", "realizationLevel": "Partial",
                         "linkedAt": "2024-03-01T09:00:00Z"}}),
  ]
  .iter()
  .map(|v| v.to_string())
  .collect::<Vec<_>>()
  .join("\n\n")
}

fn id(s: &str) -> Uuid { s.parse().unwrap() }

async fn pipeline() -> (Arc<SqliteStore>, ProjectionPipeline<SqliteStore>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let pipeline = ProjectionPipeline::new(Arc::clone(&store), &Default::default());
  (store, pipeline)
}

#[tokio::test]
async fn replays_stream_into_views() {
  let (store, pipeline) = pipeline().await;

  let summary = replay(&pipeline, stream().as_bytes(), true).await.unwrap();
  assert_eq!(summary.applied, 5);
  assert_eq!(summary.skipped, 1);
  assert_eq!(summary.failed, 0);

  let b = id(B);
  let domain = store.get_effective_domain(b).await.unwrap().unwrap();
  assert_eq!(domain.l1_capability_id, id(A));
  assert_eq!(domain.business_domain_name.as_deref(), Some("Finance"));

  let on_a = store.list_realizations_for_capability(id(A)).await.unwrap();
  assert_eq!(on_a.len(), 1);
  assert_eq!(on_a[0].source_capability_id, Some(b));

  // A second pass over the same stream converges on the same views.
  let again = replay(&pipeline, stream().as_bytes(), true).await.unwrap();
  assert_eq!(again, summary);
  assert_eq!(store.get_effective_domain(b).await.unwrap(), Some(domain));
}

#[tokio::test]
async fn stops_at_first_bad_line_by_default() {
  let (_, pipeline) = pipeline().await;
  let input = format!(
    "{}\nnot json\n{}",
    json!({"eventType": "CapabilityCreated", "eventData": {"id": A, "name": "A", "level": "L1"}}),
    json!({"eventType": "CapabilityCreated", "eventData": {"id": B, "name": "B", "level": "L1"}}),
  );

  let err = replay(&pipeline, input.as_bytes(), true).await.unwrap_err();
  assert!(matches!(err, Error::Record { line: 2, .. }), "got {err:?}");
}

#[tokio::test]
async fn counts_failures_when_told_to_continue() {
  let (store, pipeline) = pipeline().await;
  let input = [
    "not json".to_owned(),
    json!({"eventType": "CapabilityCreated", "eventData": {"id": A, "level": "L1"}}).to_string(),
    json!({"eventType": "CapabilityCreated", "eventData": {"id": B, "name": "B", "level": "L1"}})
      .to_string(),
  ]
  .join("\n");

  let summary = replay(&pipeline, input.as_bytes(), false).await.unwrap();
  assert_eq!(summary.applied, 1);
  assert_eq!(summary.failed, 2);
  assert!(store.get_effective_domain(id(B)).await.unwrap().is_some());
}

#[tokio::test]
async fn malformed_payload_reports_its_line() {
  let (_, pipeline) = pipeline().await;
  let input =
    json!({"eventType": "CapabilityCreated", "eventData": {"id": "nope", "name": "A", "level": "L1"}})
      .to_string();

  let err = replay(&pipeline, input.as_bytes(), true).await.unwrap_err();
  assert!(
    matches!(&err, Error::Projection { line: 1, event_type, .. } if event_type == "CapabilityCreated"),
    "got {err:?}"
  );
}

#[test]
fn config_defaults_and_overrides() {
  let empty: ReplayConfig = config::Config::builder()
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap();
  assert_eq!(empty.store_path.to_str(), Some("capmap.db"));
  assert_eq!(empty.stale_inheritance, StaleInheritancePolicy::Retain);
  assert!(empty.stop_on_error);

  let toml = r#"
    store_path = "~/capmap/views.db"
    stale_inheritance = "prune"
    stop_on_error = false
  "#;
  let set: ReplayConfig = config::Config::builder()
    .add_source(config::File::from_str(toml, config::FileFormat::Toml))
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap();
  assert_eq!(set.store_path.to_str(), Some("~/capmap/views.db"));
  assert_eq!(set.propagation().stale_inheritance, StaleInheritancePolicy::Prune);
  assert!(!set.stop_on_error);
}
