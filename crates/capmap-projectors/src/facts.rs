//! [`FactsProjector`] — keeps the read-only collaborators current.
//!
//! The propagators only read hierarchy, domain, pillar, and rating facts. When
//! no other service maintains those, this projection does, from the same
//! event stream. It must run before the propagators for each event so they
//! observe the post-event state.

use std::sync::Arc;

use capmap_core::{
  capability::CapabilityNode,
  event::{CapabilityEvent, ImportanceRated},
  importance::{ExplicitImportance, StrategyPillar},
  store::{FactStore, StrategyPillarsGateway},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Projector,
  error::{Result, collaborator},
};

pub struct FactsProjector<S> {
  store: Arc<S>,
}

impl<S> FactsProjector<S>
where
  S: FactStore + StrategyPillarsGateway,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn record_rating(&self, rated: &ImportanceRated) -> Result<()> {
    let pillar_name = self
      .store
      .get_active_pillar(rated.pillar_id)
      .await
      .map_err(collaborator)?
      .map(|pillar| pillar.name);
    if pillar_name.is_none() {
      debug!(pillar_id = %rated.pillar_id, "rating recorded against an inactive or unknown pillar");
    }

    self
      .store
      .upsert_explicit_importance(ExplicitImportance {
        capability_id: rated.capability_id,
        pillar_id: rated.pillar_id,
        business_domain_id: rated.business_domain_id,
        importance: rated.importance,
        rationale: rated.rationale.clone(),
        pillar_name,
      })
      .await
      .map_err(collaborator)
  }

  /// Renaming keeps the pillar's active flag; an unknown pillar is created
  /// active.
  async fn rename_pillar(&self, pillar_id: Uuid, name: String) -> Result<()> {
    let active = self
      .store
      .get_strategy_pillars()
      .await
      .map_err(collaborator)?
      .into_iter()
      .find(|pillar| pillar.pillar_id == pillar_id)
      .is_none_or(|pillar| pillar.active);

    self
      .store
      .upsert_pillar(StrategyPillar { pillar_id, name, active })
      .await
      .map_err(collaborator)
  }
}

impl<S> Projector for FactsProjector<S>
where
  S: FactStore + StrategyPillarsGateway,
{
  async fn project(&self, event: &CapabilityEvent) -> Result<()> {
    let store = self.store.as_ref();
    let written = match event {
      CapabilityEvent::CapabilityCreated(e) => {
        store
          .upsert_capability(CapabilityNode {
            capability_id: e.id,
            parent_id:     e.parent_id,
            level:         e.level,
            name:          e.name.clone(),
          })
          .await
      }
      CapabilityEvent::CapabilityUpdated(e) => store.rename_capability(e.id, e.name.clone()).await,
      CapabilityEvent::CapabilityDeleted(e) => store.delete_capability(e.id).await,
      CapabilityEvent::CapabilityParentChanged(e) => {
        store.move_capability(e.id, e.new_parent_id, e.new_level).await
      }
      CapabilityEvent::CapabilityLevelChanged(e) => {
        store.set_capability_level(e.id, e.new_level).await
      }
      CapabilityEvent::BusinessDomainCreated(e) | CapabilityEvent::BusinessDomainUpdated(e) => {
        store.upsert_business_domain(e.id, e.name.clone()).await
      }
      CapabilityEvent::BusinessDomainDeleted(e) => store.delete_business_domain(e.id).await,
      CapabilityEvent::CapabilityAssignedToDomain(e) => {
        store.insert_assignment(e.business_domain_id, e.capability_id).await
      }
      CapabilityEvent::CapabilityUnassignedFromDomain(e) => {
        store.delete_assignment(e.business_domain_id, e.capability_id).await
      }
      CapabilityEvent::StrategyPillarAdded(e) => {
        store
          .upsert_pillar(StrategyPillar {
            pillar_id: e.id,
            name:      e.name.clone(),
            active:    true,
          })
          .await
      }
      CapabilityEvent::StrategyPillarUpdated(e) => {
        return self.rename_pillar(e.id, e.name.clone()).await;
      }
      CapabilityEvent::StrategyPillarRemoved(e) => store.deactivate_pillar(e.id).await,
      CapabilityEvent::StrategyImportanceSet(e) | CapabilityEvent::StrategyImportanceUpdated(e) => {
        return self.record_rating(e).await;
      }
      CapabilityEvent::StrategyImportanceRemoved(e) => {
        store
          .delete_explicit_importance(e.capability_id, e.pillar_id, e.business_domain_id)
          .await
      }
      CapabilityEvent::SystemLinkedToCapability(_)
      | CapabilityEvent::SystemRealizationUpdated(_)
      | CapabilityEvent::SystemRealizationDeleted(_)
      | CapabilityEvent::ApplicationComponentUpdated(_)
      | CapabilityEvent::ApplicationComponentDeleted(_) => Ok(()),
    };
    written.map_err(collaborator)
  }
}
