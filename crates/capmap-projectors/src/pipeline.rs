//! [`ProjectionPipeline`] — applies one event to every projection in order.

use std::sync::Arc;

use capmap_core::{
  event::CapabilityEvent,
  store::{
    BusinessDomainNameProvider, DomainAssignmentChecker, EffectiveBusinessDomainStore,
    EffectiveImportanceStore, FactStore, HierarchyIndex, ImportanceRatings, RealizationStore,
    StrategyPillarsGateway,
  },
};
use serde::Deserialize;

use crate::{
  BusinessDomainPropagator, FactsProjector, ImportanceRecomputer, Projector, Result,
  realization::{RealizationInheritancePropagator, StaleInheritancePolicy},
};

/// A backend able to serve every projection.
pub trait ProjectionBackend:
  FactStore
  + HierarchyIndex
  + BusinessDomainNameProvider
  + DomainAssignmentChecker
  + StrategyPillarsGateway
  + ImportanceRatings
  + EffectiveBusinessDomainStore
  + EffectiveImportanceStore
  + RealizationStore
{
}

impl<S> ProjectionBackend for S where
  S: FactStore
    + HierarchyIndex
    + BusinessDomainNameProvider
    + DomainAssignmentChecker
    + StrategyPillarsGateway
    + ImportanceRatings
    + EffectiveBusinessDomainStore
    + EffectiveImportanceStore
    + RealizationStore
{
}

/// Tunables for the propagators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropagationSettings {
  #[serde(default)]
  pub stale_inheritance: StaleInheritancePolicy,
}

/// Runs the facts projection first so the propagators read post-event
/// facts, then each propagator in turn. The first failure is returned and the
/// remaining projections are skipped; redelivery re-applies all of them.
pub struct ProjectionPipeline<S> {
  facts:            FactsProjector<S>,
  business_domains: BusinessDomainPropagator<S>,
  importance:       ImportanceRecomputer<S>,
  realizations:     RealizationInheritancePropagator<S>,
}

impl<S> ProjectionPipeline<S>
where
  S: ProjectionBackend,
{
  pub fn new(store: Arc<S>, settings: &PropagationSettings) -> Self {
    Self {
      facts:            FactsProjector::new(Arc::clone(&store)),
      business_domains: BusinessDomainPropagator::new(Arc::clone(&store)),
      importance:       ImportanceRecomputer::new(Arc::clone(&store)),
      realizations:     RealizationInheritancePropagator::new(
        store,
        settings.stale_inheritance,
      ),
    }
  }

  pub fn importance(&self) -> &ImportanceRecomputer<S> { &self.importance }
}

impl<S> Projector for ProjectionPipeline<S>
where
  S: ProjectionBackend,
{
  async fn project(&self, event: &CapabilityEvent) -> Result<()> {
    tracing::debug!(event_type = event.event_type(), "projecting event");
    self.facts.project(event).await?;
    self.business_domains.project(event).await?;
    self.importance.project(event).await?;
    self.realizations.project(event).await
  }
}
