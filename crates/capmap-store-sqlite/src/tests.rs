//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use capmap_core::{
  capability::{CapabilityLevel, CapabilityNode},
  domain::{DomainLineage, EffectiveBusinessDomain},
  event::{
    CapabilityCreated, CapabilityEvent, DomainAssignment, ImportanceRated, ParentChanged, Renamed,
    SystemLinked,
  },
  importance::{EffectiveImportance, ExplicitImportance, Importance, StrategyPillar},
  realization::{InheritanceSource, Realization, RealizationLevel, RealizationOrigin},
  store::{
    BusinessDomainNameProvider, DomainAssignmentChecker, EffectiveBusinessDomainStore,
    EffectiveImportanceStore, FactStore, HierarchyIndex, ImportanceRatings, RealizationStore,
    StrategyPillarsGateway,
  },
};
use capmap_projectors::{ProjectionPipeline, Projector, PropagationSettings};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn node(
  capability_id: Uuid,
  parent_id: Option<Uuid>,
  level: CapabilityLevel,
  name: &str,
) -> CapabilityNode {
  CapabilityNode {
    capability_id,
    parent_id,
    level,
    name: name.into(),
  }
}

/// Records A → B → C and returns their ids.
async fn chain(s: &SqliteStore) -> [Uuid; 3] {
  let [a, b, c] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
  s.upsert_capability(node(a, None, CapabilityLevel::L1, "A")).await.unwrap();
  s.upsert_capability(node(b, Some(a), CapabilityLevel::L2, "B")).await.unwrap();
  s.upsert_capability(node(c, Some(b), CapabilityLevel::L3, "C")).await.unwrap();
  [a, b, c]
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn capability_round_trips_and_moves() {
  let s = store().await;
  let [a, b, c] = chain(&s).await;

  let fetched = s.get_by_id(c).await.unwrap().unwrap();
  assert_eq!(fetched, node(c, Some(b), CapabilityLevel::L3, "C"));
  assert!(s.get_by_id(Uuid::new_v4()).await.unwrap().is_none());

  s.rename_capability(c, "C2".into()).await.unwrap();
  s.move_capability(c, Some(a), CapabilityLevel::L2).await.unwrap();
  let moved = s.get_by_id(c).await.unwrap().unwrap();
  assert_eq!(moved, node(c, Some(a), CapabilityLevel::L2, "C2"));

  s.set_capability_level(c, CapabilityLevel::L4).await.unwrap();
  assert_eq!(s.get_by_id(c).await.unwrap().unwrap().level, CapabilityLevel::L4);

  s.delete_capability(c).await.unwrap();
  assert!(s.get_by_id(c).await.unwrap().is_none());
}

#[tokio::test]
async fn children_and_descendants() {
  let s = store().await;
  let [a, b, c] = chain(&s).await;
  let sibling = Uuid::new_v4();
  s.upsert_capability(node(sibling, Some(a), CapabilityLevel::L2, "S"))
    .await
    .unwrap();

  let mut children = s.get_children(a).await.unwrap();
  children.sort();
  let mut expected = vec![b, sibling];
  expected.sort();
  assert_eq!(children, expected);

  let mut descendants = s.get_descendants(a).await.unwrap();
  descendants.sort();
  let mut expected = vec![b, c, sibling];
  expected.sort();
  assert_eq!(descendants, expected);

  assert!(s.get_descendants(c).await.unwrap().is_empty());
}

#[tokio::test]
async fn descendants_terminate_on_cycle() {
  let s = store().await;
  let [a, b, c] = chain(&s).await;
  s.move_capability(a, Some(c), CapabilityLevel::L1).await.unwrap();

  let mut descendants = s.get_descendants(a).await.unwrap();
  descendants.sort();
  let mut expected = vec![b, c];
  expected.sort();
  assert_eq!(descendants, expected);
}

// ─── Reference facts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn business_domains_and_assignments() {
  let s = store().await;
  let domain = Uuid::new_v4();
  let capability = Uuid::new_v4();

  assert!(s.get_business_domain_name(domain).await.unwrap().is_none());
  s.upsert_business_domain(domain, "Finance".into()).await.unwrap();
  s.upsert_business_domain(domain, "Finance & Risk".into()).await.unwrap();
  assert_eq!(
    s.get_business_domain_name(domain).await.unwrap().as_deref(),
    Some("Finance & Risk")
  );

  s.insert_assignment(domain, capability).await.unwrap();
  s.insert_assignment(domain, capability).await.unwrap();
  assert!(s.assignment_exists(domain, capability).await.unwrap());
  s.delete_assignment(domain, capability).await.unwrap();
  assert!(!s.assignment_exists(domain, capability).await.unwrap());

  s.delete_business_domain(domain).await.unwrap();
  assert!(s.get_business_domain_name(domain).await.unwrap().is_none());
}

#[tokio::test]
async fn inactive_pillars_are_hidden_from_active_lookup() {
  let s = store().await;
  let on = Uuid::new_v4();
  let off = Uuid::new_v4();
  s.upsert_pillar(StrategyPillar { pillar_id: on, name: "Always On".into(), active: true })
    .await
    .unwrap();
  s.upsert_pillar(StrategyPillar { pillar_id: off, name: "Legacy".into(), active: true })
    .await
    .unwrap();
  s.deactivate_pillar(off).await.unwrap();

  assert_eq!(s.get_active_pillar(on).await.unwrap().unwrap().name, "Always On");
  assert!(s.get_active_pillar(off).await.unwrap().is_none());

  let all = s.get_strategy_pillars().await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().any(|p| p.pillar_id == off && !p.active));
}

#[tokio::test]
async fn explicit_ratings_upsert_and_delete() {
  let s = store().await;
  let rating = ExplicitImportance {
    capability_id:      Uuid::new_v4(),
    pillar_id:          Uuid::new_v4(),
    business_domain_id: Uuid::new_v4(),
    importance:         Importance::new(3).unwrap(),
    rationale:          Some("core ledger".into()),
    pillar_name:        Some("Always On".into()),
  };
  let key = (rating.capability_id, rating.pillar_id, rating.business_domain_id);

  s.upsert_explicit_importance(rating.clone()).await.unwrap();
  let raised = ExplicitImportance { importance: Importance::new(5).unwrap(), ..rating.clone() };
  s.upsert_explicit_importance(raised.clone()).await.unwrap();
  assert_eq!(
    s.get_explicit_importance(key.0, key.1, key.2).await.unwrap(),
    Some(raised)
  );

  s.delete_explicit_importance(key.0, key.1, key.2).await.unwrap();
  assert!(s.get_explicit_importance(key.0, key.1, key.2).await.unwrap().is_none());
}

// ─── Effective views ─────────────────────────────────────────────────────────

#[tokio::test]
async fn effective_domains_follow_their_l1() {
  let s = store().await;
  let [a, b, c] = chain(&s).await;
  let other_root = Uuid::new_v4();
  let domain = Uuid::new_v4();

  for id in [a, b, c] {
    s.upsert_effective_domain(DomainLineage::root(a).apply_to(id))
      .await
      .unwrap();
  }
  s.upsert_effective_domain(EffectiveBusinessDomain::unassigned_root(other_root))
    .await
    .unwrap();

  s.update_business_domain_for_l1_subtree(a, Some(domain), Some("Finance".into()))
    .await
    .unwrap();
  for id in [a, b, c] {
    let row = s.get_effective_domain(id).await.unwrap().unwrap();
    assert_eq!(row.l1_capability_id, a);
    assert_eq!(row.business_domain_id, Some(domain));
    assert_eq!(row.business_domain_name.as_deref(), Some("Finance"));
  }
  let untouched = s.get_effective_domain(other_root).await.unwrap().unwrap();
  assert_eq!(untouched.business_domain_id, None);

  s.rename_business_domain(domain, "Treasury".into()).await.unwrap();
  let renamed = s.get_effective_domain(c).await.unwrap().unwrap();
  assert_eq!(renamed.business_domain_name.as_deref(), Some("Treasury"));

  s.delete_effective_domain(c).await.unwrap();
  assert!(s.get_effective_domain(c).await.unwrap().is_none());
}

fn effective(
  capability_id: Uuid,
  pillar_id: Uuid,
  business_domain_id: Uuid,
  source: Uuid,
) -> EffectiveImportance {
  let importance = Importance::new(4).unwrap();
  EffectiveImportance {
    capability_id,
    pillar_id,
    business_domain_id,
    importance,
    importance_label: importance.label().into(),
    source_capability_id: source,
    source_capability_name: "A".into(),
    is_inherited: capability_id != source,
    rationale: Some("customer facing".into()),
    computed_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
  }
}

#[tokio::test]
async fn effective_importance_round_trips() {
  let s = store().await;
  let [a, b, _] = chain(&s).await;
  let (p, q) = (Uuid::new_v4(), Uuid::new_v4());
  let (d, other) = (Uuid::new_v4(), Uuid::new_v4());

  let row = effective(b, p, d, a);
  s.upsert_effective_importance(row.clone()).await.unwrap();
  assert_eq!(s.get_effective_importance(b, p, d).await.unwrap(), Some(row.clone()));

  let overwritten = EffectiveImportance { is_inherited: false, source_capability_id: b, ..row };
  s.upsert_effective_importance(overwritten.clone()).await.unwrap();
  assert_eq!(s.get_effective_importance(b, p, d).await.unwrap(), Some(overwritten));

  s.upsert_effective_importance(effective(b, q, d, a)).await.unwrap();
  s.upsert_effective_importance(effective(b, p, other, a)).await.unwrap();
  assert_eq!(s.list_effective_importance(b).await.unwrap().len(), 3);

  s.delete_effective_importance_for_domain(b, d).await.unwrap();
  let left = s.list_effective_importance(b).await.unwrap();
  assert_eq!(left.len(), 1);
  assert_eq!(left[0].business_domain_id, other);

  s.rename_importance_source(a, "A (renamed)".into()).await.unwrap();
  assert_eq!(
    s.get_effective_importance(b, p, other).await.unwrap().unwrap().source_capability_name,
    "A (renamed)"
  );

  s.delete_effective_importance(b, p, other).await.unwrap();
  s.upsert_effective_importance(effective(a, p, d, a)).await.unwrap();
  s.delete_effective_importance_for_capability(b).await.unwrap();
  assert!(s.list_effective_importance(b).await.unwrap().is_empty());
  assert_eq!(s.list_effective_importance(a).await.unwrap().len(), 1);
}

fn direct(capability_id: Uuid, component_id: Uuid) -> Realization {
  Realization {
    realization_id: Uuid::new_v4(),
    capability_id,
    component_id,
    component_name: "Ledger".into(),
    realization_level: RealizationLevel::Partial,
    notes: Some("phase one".into()),
    origin: RealizationOrigin::Direct,
    source_realization_id: None,
    source_capability_id: None,
    source_capability_name: None,
    linked_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
  }
}

#[tokio::test]
async fn realizations_round_trip_and_cascade() {
  let s = store().await;
  let [a, b, c] = chain(&s).await;
  let component = Uuid::new_v4();
  let link = direct(c, component);
  let source = InheritanceSource {
    realization_id:  link.realization_id,
    capability_id:   c,
    capability_name: "C".into(),
    component_id:    component,
    component_name:  "Ledger".into(),
    linked_at:       link.linked_at,
  };

  s.upsert_realization(link.clone()).await.unwrap();
  for id in [b, a] {
    s.upsert_realization(source.inherited_row(id)).await.unwrap();
  }

  assert_eq!(s.get_realization(link.realization_id).await.unwrap(), Some(link.clone()));
  let inherited = s.list_realizations_by_source(link.realization_id).await.unwrap();
  assert_eq!(inherited.len(), 2);
  assert!(inherited.iter().all(|r| r.origin == RealizationOrigin::Inherited));
  assert_eq!(s.list_realizations_for_capability(b).await.unwrap(), vec![source.inherited_row(b)]);

  // Only direct rows accept updates.
  s.update_direct_realization(link.realization_id, RealizationLevel::Full, None)
    .await
    .unwrap();
  s.update_direct_realization(
    Realization::inherited_id(link.realization_id, a),
    RealizationLevel::Planned,
    Some("ignored".into()),
  )
  .await
  .unwrap();
  let updated = s.get_realization(link.realization_id).await.unwrap().unwrap();
  assert_eq!(updated.realization_level, RealizationLevel::Full);
  assert_eq!(updated.notes, None);
  let on_a = &s.list_realizations_for_capability(a).await.unwrap()[0];
  assert_eq!(on_a.realization_level, RealizationLevel::Full);
  assert_eq!(on_a.notes, None);

  s.rename_realization_source(c, "C2".into()).await.unwrap();
  s.rename_component(component, "General Ledger".into()).await.unwrap();
  let on_b = &s.list_realizations_for_capability(b).await.unwrap()[0];
  assert_eq!(on_b.source_capability_name.as_deref(), Some("C2"));
  assert_eq!(on_b.component_name, "General Ledger");

  s.delete_realizations_by_source(link.realization_id).await.unwrap();
  assert!(s.list_realizations_by_source(link.realization_id).await.unwrap().is_empty());
  assert!(s.get_realization(link.realization_id).await.unwrap().is_some());

  s.delete_realization(link.realization_id).await.unwrap();
  assert!(s.get_realization(link.realization_id).await.unwrap().is_none());

  let other = direct(b, Uuid::new_v4());
  s.upsert_realization(direct(a, component)).await.unwrap();
  s.upsert_realization(other.clone()).await.unwrap();
  s.delete_realizations_for_component(component).await.unwrap();
  assert!(s.list_realizations_for_capability(a).await.unwrap().is_empty());
  s.delete_realizations_for_capability(b).await.unwrap();
  assert!(s.get_realization(other.realization_id).await.unwrap().is_none());
}

// ─── Whole pipeline ──────────────────────────────────────────────────────────

fn created(
  id: Uuid,
  name: &str,
  parent_id: Option<Uuid>,
  level: CapabilityLevel,
) -> CapabilityEvent {
  CapabilityEvent::CapabilityCreated(CapabilityCreated {
    id,
    name: name.into(),
    parent_id,
    level,
  })
}

type Views = (
  Vec<Option<EffectiveBusinessDomain>>,
  Vec<Vec<EffectiveImportance>>,
  Vec<Vec<Realization>>,
);

async fn views(s: &SqliteStore, ids: &[Uuid]) -> Views {
  let epoch = Utc.timestamp_opt(0, 0).unwrap();
  let mut out: Views = Default::default();
  for id in ids {
    out.0.push(s.get_effective_domain(*id).await.unwrap());
    let mut importance = s.list_effective_importance(*id).await.unwrap();
    for row in &mut importance {
      row.computed_at = epoch;
    }
    out.1.push(importance);
    out.2.push(s.list_realizations_for_capability(*id).await.unwrap());
  }
  out
}

#[tokio::test]
async fn pipeline_materialises_views_and_replays_cleanly() {
  let store = Arc::new(store().await);
  let pipeline = ProjectionPipeline::new(Arc::clone(&store), &PropagationSettings::default());

  let (a, b, c, e) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  let (finance, sales) = (Uuid::new_v4(), Uuid::new_v4());
  let (pillar, link) = (Uuid::new_v4(), Uuid::new_v4());

  let events = vec![
    CapabilityEvent::BusinessDomainCreated(Renamed { id: finance, name: "Finance".into() }),
    CapabilityEvent::BusinessDomainCreated(Renamed { id: sales, name: "Sales".into() }),
    CapabilityEvent::StrategyPillarAdded(Renamed { id: pillar, name: "Always On".into() }),
    created(a, "A", None, CapabilityLevel::L1),
    created(b, "B", Some(a), CapabilityLevel::L2),
    created(c, "C", Some(b), CapabilityLevel::L3),
    created(e, "E", None, CapabilityLevel::L1),
    CapabilityEvent::CapabilityAssignedToDomain(DomainAssignment {
      id:                 Uuid::new_v4(),
      business_domain_id: finance,
      capability_id:      a,
    }),
    CapabilityEvent::CapabilityAssignedToDomain(DomainAssignment {
      id:                 Uuid::new_v4(),
      business_domain_id: sales,
      capability_id:      e,
    }),
    CapabilityEvent::StrategyImportanceSet(ImportanceRated {
      capability_id:      a,
      pillar_id:          pillar,
      business_domain_id: finance,
      importance:         Importance::new(5).unwrap(),
      rationale:          Some("regulatory".into()),
    }),
    CapabilityEvent::SystemLinkedToCapability(SystemLinked {
      id:                link,
      capability_id:     c,
      component_id:      Uuid::new_v4(),
      component_name:    "Ledger".into(),
      realization_level: RealizationLevel::Partial,
      notes:             None,
      linked_at:         Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    }),
  ];
  for event in &events {
    pipeline.project(event).await.unwrap();
  }

  let c_domain = store.get_effective_domain(c).await.unwrap().unwrap();
  assert_eq!(c_domain.l1_capability_id, a);
  assert_eq!(c_domain.business_domain_name.as_deref(), Some("Finance"));

  let c_importance = store.get_effective_importance(c, pillar, finance).await.unwrap().unwrap();
  assert_eq!(c_importance.source_capability_id, a);
  assert_eq!(c_importance.importance_label, "Critical");
  assert!(c_importance.is_inherited);

  assert_eq!(store.list_realizations_by_source(link).await.unwrap().len(), 2);

  // Move B under E.
  let moved = CapabilityEvent::CapabilityParentChanged(ParentChanged {
    id:            b,
    old_parent_id: Some(a),
    new_parent_id: Some(e),
    old_level:     Some(CapabilityLevel::L2),
    new_level:     CapabilityLevel::L2,
  });
  pipeline.project(&moved).await.unwrap();

  let c_domain = store.get_effective_domain(c).await.unwrap().unwrap();
  assert_eq!(c_domain.l1_capability_id, e);
  assert_eq!(c_domain.business_domain_id, Some(sales));
  assert!(store.get_effective_importance(c, pillar, finance).await.unwrap().is_none());
  let on_e = store.list_realizations_for_capability(e).await.unwrap();
  assert_eq!(on_e.len(), 1);
  assert_eq!(on_e[0].source_realization_id, Some(link));

  // Redelivering everything through the wire form leaves the views as they were.
  let ids = [a, b, c, e];
  let before = views(&store, &ids).await;
  for event in events.iter().chain([&moved]) {
    let (event_type, data) = event.encode().unwrap();
    pipeline.project_event(event_type, &data).await.unwrap();
  }
  assert_eq!(views(&store, &ids).await, before);
}
