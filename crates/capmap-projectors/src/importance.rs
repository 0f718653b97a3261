//! Effective strategic importance.
//!
//! [`ImportanceResolver`] answers "which explicit rating applies to this
//! capability?" by walking from the capability towards the root and taking
//! the first explicit rating for the `(pillar, business domain)` key.
//! [`ImportanceRecomputer`] re-runs that resolution for a capability and each
//! of its descendants whenever something on their ancestor path changes, and
//! upserts or deletes the materialised rows accordingly.

use std::{
  collections::{BTreeSet, HashSet},
  sync::Arc,
};

use capmap_core::{
  event::CapabilityEvent,
  importance::{EffectiveImportance, Importance, RatingKey},
  store::{
    DomainAssignmentChecker, EffectiveImportanceStore, HierarchyIndex, ImportanceRatings,
    StrategyPillarsGateway,
  },
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Projector,
  error::{Result, collaborator},
  walk::nearest_l1_ancestor,
};

// ─── Resolver ────────────────────────────────────────────────────────────────

/// The explicit rating that applies to a capability, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImportance {
  pub importance:             Importance,
  pub source_capability_id:   Uuid,
  pub source_capability_name: String,
  pub is_inherited:           bool,
  pub rationale:              Option<String>,
}

impl ResolvedImportance {
  pub fn into_row(
    self,
    capability_id: Uuid,
    key: RatingKey,
    computed_at: DateTime<Utc>,
  ) -> EffectiveImportance {
    EffectiveImportance {
      capability_id,
      pillar_id: key.pillar_id,
      business_domain_id: key.business_domain_id,
      importance: self.importance,
      importance_label: self.importance.label().to_owned(),
      source_capability_id: self.source_capability_id,
      source_capability_name: self.source_capability_name,
      is_inherited: self.is_inherited,
      rationale: self.rationale,
      computed_at,
    }
  }
}

pub struct ImportanceResolver<S> {
  store: Arc<S>,
}

impl<S> ImportanceResolver<S>
where
  S: HierarchyIndex + ImportanceRatings,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Walk from `capability_id` (inclusive) up through its parents and return
  /// the first explicit rating for `(pillar_id, business_domain_id)`.
  ///
  /// A capability's own rating always wins; among ancestors the nearest one
  /// wins. `None` means no capability on the path is rated.
  pub async fn resolve_effective_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<Option<ResolvedImportance>> {
    let mut visited = HashSet::new();
    let mut current = Some(capability_id);

    while let Some(node_id) = current {
      if !visited.insert(node_id) {
        warn!(%capability_id, %node_id, "cycle in parent chain; stopping importance resolution");
        break;
      }
      let Some(node) = self.store.get_by_id(node_id).await.map_err(collaborator)? else {
        break;
      };

      let explicit = self
        .store
        .get_explicit_importance(node_id, pillar_id, business_domain_id)
        .await
        .map_err(collaborator)?;
      if let Some(rating) = explicit {
        return Ok(Some(ResolvedImportance {
          importance:             rating.importance,
          source_capability_id:   node_id,
          source_capability_name: node.name,
          is_inherited:           node_id != capability_id,
          rationale:              rating.rationale,
        }));
      }

      current = node.parent_id;
    }

    Ok(None)
  }
}

// ─── Recomputer ──────────────────────────────────────────────────────────────

pub struct ImportanceRecomputer<S> {
  store:    Arc<S>,
  resolver: ImportanceResolver<S>,
}

impl<S> ImportanceRecomputer<S>
where
  S: HierarchyIndex
    + ImportanceRatings
    + EffectiveImportanceStore
    + StrategyPillarsGateway
    + DomainAssignmentChecker,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      resolver: ImportanceResolver::new(Arc::clone(&store)),
      store,
    }
  }

  pub fn resolver(&self) -> &ImportanceResolver<S> { &self.resolver }

  /// Resolve one capability and upsert its row, or delete it when nothing on
  /// the ancestor path is rated.
  pub async fn recompute_capability(&self, capability_id: Uuid, key: RatingKey) -> Result<()> {
    let resolved = self
      .resolver
      .resolve_effective_importance(capability_id, key.pillar_id, key.business_domain_id)
      .await?;

    match resolved {
      Some(resolved) => self
        .store
        .upsert_effective_importance(resolved.into_row(capability_id, key, Utc::now()))
        .await
        .map_err(collaborator),
      None => self
        .store
        .delete_effective_importance(capability_id, key.pillar_id, key.business_domain_id)
        .await
        .map_err(collaborator),
    }
  }

  /// Recompute `capability_id`, then resolve each descendant on its own, since
  /// any of them may carry an override.
  ///
  /// Only a failure on `capability_id` itself fails the call; a descendant
  /// that fails is logged and skipped.
  pub async fn recompute_capability_and_descendants(
    &self,
    capability_id: Uuid,
    key: RatingKey,
  ) -> Result<()> {
    self.recompute_capability(capability_id, key).await?;

    let descendants = self
      .store
      .get_descendants(capability_id)
      .await
      .map_err(collaborator)?;
    for descendant_id in descendants {
      if let Err(err) = self.recompute_capability(descendant_id, key).await {
        warn!(
          %capability_id,
          %descendant_id,
          pillar_id = %key.pillar_id,
          business_domain_id = %key.business_domain_id,
          error = %err,
          "failed to recompute descendant's effective importance; skipping",
        );
      }
    }
    Ok(())
  }

  pub async fn on_importance_changed(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    self
      .recompute_capability_and_descendants(capability_id, RatingKey {
        pillar_id,
        business_domain_id,
      })
      .await
  }

  /// Recompute for every key either the moved capability or its new parent
  /// already has a row for: the former catches ratings lost with the old
  /// path, the latter ratings gained from the new one.
  pub async fn on_capability_parent_changed(
    &self,
    capability_id: Uuid,
    new_parent_id: Option<Uuid>,
  ) -> Result<()> {
    let mut keys: BTreeSet<RatingKey> = self
      .store
      .list_effective_importance(capability_id)
      .await
      .map_err(collaborator)?
      .iter()
      .map(EffectiveImportance::key)
      .collect();

    if let Some(parent_id) = new_parent_id {
      let parent_rows = self
        .store
        .list_effective_importance(parent_id)
        .await
        .map_err(collaborator)?;
      keys.extend(parent_rows.iter().map(EffectiveImportance::key));
    }

    debug!(%capability_id, keys = keys.len(), "recomputing importance after reparent");
    for key in keys {
      self.recompute_capability_and_descendants(capability_id, key).await?;
    }
    Ok(())
  }

  pub async fn on_capability_deleted(&self, capability_id: Uuid) -> Result<()> {
    self
      .store
      .delete_effective_importance_for_capability(capability_id)
      .await
      .map_err(collaborator)
  }

  pub async fn on_assigned_to_domain(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    self.recompute_for_active_pillars(capability_id, business_domain_id).await
  }

  /// Rows for the domain are only dropped when no other assigned ancestor
  /// still covers it. The nearest L1 ancestor is the only one consulted.
  pub async fn on_unassigned_from_domain(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    let ancestor_id = nearest_l1_ancestor(self.store.as_ref(), capability_id).await?;

    let covered_by = match ancestor_id {
      Some(ancestor_id) if ancestor_id != capability_id => {
        let assigned = self
          .store
          .assignment_exists(business_domain_id, ancestor_id)
          .await
          .map_err(collaborator)?;
        assigned.then_some(ancestor_id)
      }
      _ => None,
    };

    match covered_by {
      Some(ancestor_id) => {
        debug!(%capability_id, %ancestor_id, %business_domain_id, "domain still covered by ancestor; recomputing");
        self.recompute_for_active_pillars(capability_id, business_domain_id).await
      }
      None => self.delete_domain_for_subtree(capability_id, business_domain_id).await,
    }
  }

  pub async fn on_capability_renamed(&self, capability_id: Uuid, name: String) -> Result<()> {
    self
      .store
      .rename_importance_source(capability_id, name)
      .await
      .map_err(collaborator)
  }

  async fn recompute_for_active_pillars(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    let pillars = self
      .store
      .get_strategy_pillars()
      .await
      .map_err(collaborator)?;

    for pillar in pillars.into_iter().filter(|p| p.active) {
      self
        .recompute_capability_and_descendants(capability_id, RatingKey {
          pillar_id: pillar.pillar_id,
          business_domain_id,
        })
        .await?;
    }
    Ok(())
  }

  async fn delete_domain_for_subtree(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    self
      .store
      .delete_effective_importance_for_domain(capability_id, business_domain_id)
      .await
      .map_err(collaborator)?;

    let descendants = self
      .store
      .get_descendants(capability_id)
      .await
      .map_err(collaborator)?;
    for descendant_id in descendants {
      if let Err(err) = self
        .store
        .delete_effective_importance_for_domain(descendant_id, business_domain_id)
        .await
      {
        warn!(%capability_id, %descendant_id, error = %err, "failed to clear descendant's importance; skipping");
      }
    }
    Ok(())
  }
}

impl<S> Projector for ImportanceRecomputer<S>
where
  S: HierarchyIndex
    + ImportanceRatings
    + EffectiveImportanceStore
    + StrategyPillarsGateway
    + DomainAssignmentChecker,
{
  async fn project(&self, event: &CapabilityEvent) -> Result<()> {
    match event {
      CapabilityEvent::StrategyImportanceSet(e) | CapabilityEvent::StrategyImportanceUpdated(e) => {
        self
          .on_importance_changed(e.capability_id, e.pillar_id, e.business_domain_id)
          .await
      }
      CapabilityEvent::StrategyImportanceRemoved(e) => {
        self
          .on_importance_changed(e.capability_id, e.pillar_id, e.business_domain_id)
          .await
      }
      CapabilityEvent::CapabilityParentChanged(e) => {
        self.on_capability_parent_changed(e.id, e.new_parent_id).await
      }
      CapabilityEvent::CapabilityDeleted(e) => self.on_capability_deleted(e.id).await,
      CapabilityEvent::CapabilityAssignedToDomain(e) => {
        self
          .on_assigned_to_domain(e.capability_id, e.business_domain_id)
          .await
      }
      CapabilityEvent::CapabilityUnassignedFromDomain(e) => {
        self
          .on_unassigned_from_domain(e.capability_id, e.business_domain_id)
          .await
      }
      CapabilityEvent::CapabilityUpdated(e) => {
        self.on_capability_renamed(e.id, e.name.clone()).await
      }
      _ => Ok(()),
    }
  }
}
