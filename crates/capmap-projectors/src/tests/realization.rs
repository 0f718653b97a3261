//! Realization inheritance up the ancestor chain.

use capmap_core::{
  capability::{CapabilityLevel, CapabilityNode},
  event::{CapabilityEvent, RealizationUpdated, Removed, Renamed, SystemLinked},
  realization::{Realization, RealizationLevel, RealizationOrigin},
  store::FactStore,
};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use super::harness::{Fixture, MemoryBackend};
use crate::{PropagationSettings, StaleInheritancePolicy};

/// A → B → C.
async fn chain(fx: &Fixture) -> [Uuid; 3] {
  let a = fx.capability("A", None).await;
  let b = fx.capability("B", Some(a)).await;
  let c = fx.capability("C", Some(b)).await;
  [a, b, c]
}

fn inherited_from(store: &MemoryBackend, capability_id: Uuid, source: Uuid) -> Option<Realization> {
  store
    .realizations_on(capability_id)
    .into_iter()
    .find(|r| r.source_realization_id == Some(source))
}

#[tokio::test]
async fn link_mirrors_onto_every_ancestor() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;

  let (x, component) = fx.link(c, "Ledger", RealizationLevel::Partial).await;

  let direct = fx.store.realizations_on(c);
  assert_eq!(direct.len(), 1);
  assert_eq!(direct[0].realization_id, x);
  assert_eq!(direct[0].origin, RealizationOrigin::Direct);
  assert_eq!(direct[0].realization_level, RealizationLevel::Partial);
  assert_eq!(direct[0].notes.as_deref(), Some("linked in test"));
  assert_eq!(direct[0].source_realization_id, None);

  for ancestor in [b, a] {
    let row = inherited_from(&fx.store, ancestor, x).unwrap();
    assert_eq!(row.realization_id, Realization::inherited_id(x, ancestor));
    assert_eq!(row.origin, RealizationOrigin::Inherited);
    assert_eq!(row.realization_level, RealizationLevel::Full);
    assert_eq!(row.notes, None);
    assert_eq!(row.component_id, component);
    assert_eq!(row.component_name, "Ledger");
    assert_eq!(row.source_capability_id, Some(c));
    assert_eq!(row.source_capability_name.as_deref(), Some("C"));
    assert_eq!(row.linked_at, direct[0].linked_at);
  }
  assert_eq!(fx.store.realization_rows().len(), 3);
}

#[tokio::test]
async fn unlink_removes_direct_and_inherited_rows() {
  let fx = Fixture::new();
  let [a, _, c] = chain(&fx).await;
  let (x, _) = fx.link(c, "Ledger", RealizationLevel::Full).await;
  let (y, _) = fx.link(a, "Reporting", RealizationLevel::Planned).await;

  fx.unlink(x).await;

  let rows = fx.store.realization_rows();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].realization_id, y);
}

#[tokio::test]
async fn update_touches_only_the_direct_row() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;
  let (x, _) = fx.link(c, "Ledger", RealizationLevel::Partial).await;

  fx.apply(CapabilityEvent::SystemRealizationUpdated(RealizationUpdated {
    id:                x,
    realization_level: RealizationLevel::Planned,
    notes:             Some("descoped".into()),
  }))
  .await;

  let direct = &fx.store.realizations_on(c)[0];
  assert_eq!(direct.realization_level, RealizationLevel::Planned);
  assert_eq!(direct.notes.as_deref(), Some("descoped"));
  for ancestor in [a, b] {
    let row = inherited_from(&fx.store, ancestor, x).unwrap();
    assert_eq!(row.realization_level, RealizationLevel::Full);
    assert_eq!(row.notes, None);
  }

  // Updating an inherited row by id is ignored.
  let inherited_id = Realization::inherited_id(x, a);
  fx.apply(CapabilityEvent::SystemRealizationUpdated(RealizationUpdated {
    id:                inherited_id,
    realization_level: RealizationLevel::Partial,
    notes:             None,
  }))
  .await;
  let row = inherited_from(&fx.store, a, x).unwrap();
  assert_eq!(row.realization_level, RealizationLevel::Full);
}

#[tokio::test]
async fn every_direct_link_reaches_all_ancestors() {
  let fx = Fixture::new();
  let root = fx.capability("root", None).await;
  let left = fx.capability("left", Some(root)).await;
  let right = fx.capability("right", Some(root)).await;
  let left_leaf = fx.capability("left-leaf", Some(left)).await;
  let deepest = fx.capability("deepest", Some(left_leaf)).await;

  fx.link(deepest, "Ledger", RealizationLevel::Full).await;
  fx.link(left_leaf, "Ledger", RealizationLevel::Partial).await;
  fx.link(right, "Portal", RealizationLevel::Planned).await;
  fx.link(root, "Portal", RealizationLevel::Full).await;

  let parent_of = |id: Uuid| match id {
    id if id == deepest => Some(left_leaf),
    id if id == left_leaf => Some(left),
    id if id == left || id == right => Some(root),
    _ => None,
  };

  let rows = fx.store.realization_rows();
  let direct: Vec<_> = rows.iter().filter(|r| r.is_direct()).collect();
  assert_eq!(direct.len(), 4);

  let mut expected_inherited = 0;
  for link in direct {
    let mut ancestor = parent_of(link.capability_id);
    while let Some(id) = ancestor {
      let row = inherited_from(&fx.store, id, link.realization_id)
        .unwrap_or_else(|| panic!("{id} is missing an inherited row"));
      assert_eq!(row.source_capability_id, Some(link.capability_id));
      expected_inherited += 1;
      ancestor = parent_of(id);
    }
  }
  assert_eq!(rows.len(), 4 + expected_inherited);
  assert_eq!(fx.store.realizations_on(right).len(), 1);
}

#[tokio::test]
async fn relinking_does_not_duplicate_rows() {
  let fx = Fixture::new();
  let [_, _, c] = chain(&fx).await;
  let (x, component) = fx.link(c, "Ledger", RealizationLevel::Full).await;
  let before = fx.store.realization_rows();

  fx.apply(CapabilityEvent::SystemLinkedToCapability(SystemLinked {
    id:                x,
    capability_id:     c,
    component_id:      component,
    component_name:    "Ledger".into(),
    realization_level: RealizationLevel::Full,
    notes:             Some("linked in test".into()),
    linked_at:         Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
  }))
  .await;

  assert_eq!(fx.store.realization_rows(), before);
}

#[tokio::test]
async fn reparent_retains_old_chain_by_default() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;
  let e = fx.capability("E", None).await;
  let (x, _) = fx.link(c, "Ledger", RealizationLevel::Full).await;

  fx.reparent(b, Some(e)).await;

  let on_e = inherited_from(&fx.store, e, x).unwrap();
  assert_eq!(on_e.source_capability_id, Some(c));
  assert_eq!(on_e.source_capability_name.as_deref(), Some("C"));
  assert!(inherited_from(&fx.store, b, x).is_some());
  assert!(inherited_from(&fx.store, a, x).is_some());
}

#[tokio::test]
async fn reparent_prunes_old_chain_when_configured() {
  let fx = Fixture::with_settings(PropagationSettings {
    stale_inheritance: StaleInheritancePolicy::Prune,
  });
  let [a, b, c] = chain(&fx).await;
  let e = fx.capability("E", None).await;
  let (x, _) = fx.link(c, "Ledger", RealizationLevel::Full).await;
  let (y, _) = fx.link(a, "Portal", RealizationLevel::Full).await;

  fx.reparent(b, Some(e)).await;

  assert!(inherited_from(&fx.store, a, x).is_none());
  assert!(inherited_from(&fx.store, b, x).is_some());
  assert!(inherited_from(&fx.store, e, x).is_some());
  assert_eq!(fx.store.realizations_on(c).len(), 1);
  // A's own link is untouched.
  assert!(fx.store.realizations_on(a).iter().any(|r| r.realization_id == y));
}

#[tokio::test]
async fn moving_a_linked_capability_propagates_its_own_link() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;
  let e = fx.capability("E", None).await;
  let f = fx.capability("F", Some(e)).await;
  let (x, _) = fx.link(c, "Ledger", RealizationLevel::Partial).await;

  fx.reparent(c, Some(f)).await;

  for ancestor in [f, e] {
    let row = inherited_from(&fx.store, ancestor, x).unwrap();
    assert_eq!(row.realization_level, RealizationLevel::Full);
    assert_eq!(row.source_capability_id, Some(c));
  }
  assert!(inherited_from(&fx.store, b, x).is_some());
  assert!(inherited_from(&fx.store, a, x).is_some());
}

#[tokio::test]
async fn deleting_a_capability_removes_its_links_everywhere() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;
  fx.link(c, "Ledger", RealizationLevel::Full).await;
  let (y, _) = fx.link(b, "Portal", RealizationLevel::Full).await;

  fx.delete_capability(c).await;

  assert!(fx.store.realizations_on(c).is_empty());
  let remaining: Vec<_> = fx
    .store
    .realization_rows()
    .into_iter()
    .map(|r| (r.capability_id, r.source_realization_id.unwrap_or(r.realization_id)))
    .collect();
  assert_eq!(remaining.len(), 2);
  assert!(remaining.contains(&(b, y)));
  assert!(remaining.contains(&(a, y)));
}

#[tokio::test]
async fn renames_flow_into_inherited_rows() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;
  let (x, component) = fx.link(c, "Ledger", RealizationLevel::Full).await;

  fx.rename_capability(c, "C (renamed)").await;
  fx.apply(CapabilityEvent::ApplicationComponentUpdated(Renamed {
    id:   component,
    name: "General Ledger".into(),
  }))
  .await;

  for ancestor in [a, b] {
    let row = inherited_from(&fx.store, ancestor, x).unwrap();
    assert_eq!(row.source_capability_name.as_deref(), Some("C (renamed)"));
    assert_eq!(row.component_name, "General Ledger");
  }
  assert_eq!(fx.store.realizations_on(c)[0].component_name, "General Ledger");
}

#[tokio::test]
async fn deleting_a_component_drops_all_of_its_rows() {
  let fx = Fixture::new();
  let [a, b, c] = chain(&fx).await;
  let (_, ledger) = fx.link(c, "Ledger", RealizationLevel::Full).await;
  fx.link(b, "Portal", RealizationLevel::Full).await;

  fx.apply(CapabilityEvent::ApplicationComponentDeleted(Removed { id: ledger }))
    .await;

  assert!(
    fx.store
      .realization_rows()
      .iter()
      .all(|r| r.component_id != ledger)
  );
  assert!(fx.store.realizations_on(c).is_empty());
  assert_eq!(fx.store.realizations_on(b).len(), 1);
  assert_eq!(fx.store.realizations_on(a).len(), 1);
}

#[tokio::test]
async fn link_on_unknown_capability_stays_direct_only() {
  let fx = Fixture::new();
  let stranger = Uuid::new_v4();

  let (x, _) = fx.link(stranger, "Ledger", RealizationLevel::Full).await;

  let rows = fx.store.realization_rows();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].realization_id, x);
  assert!(rows[0].is_direct());
}

#[tokio::test]
async fn walk_stops_at_first_unknown_ancestor() {
  let fx = Fixture::new();
  let orphan = Uuid::new_v4();
  fx.store
    .upsert_capability(CapabilityNode {
      capability_id: orphan,
      parent_id:     Some(Uuid::new_v4()),
      level:         CapabilityLevel::L2,
      name:          "orphan".into(),
    })
    .await
    .unwrap();
  let child = fx.capability("child", Some(orphan)).await;

  let (x, _) = fx.link(child, "Ledger", RealizationLevel::Full).await;

  assert!(inherited_from(&fx.store, orphan, x).is_some());
  assert_eq!(fx.store.realization_rows().len(), 2);
}
