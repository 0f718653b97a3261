//! Collaborator and store traits consumed by the propagation engine.
//!
//! The read-only collaborators (`HierarchyIndex`, `BusinessDomainNameProvider`,
//! `DomainAssignmentChecker`, `StrategyPillarsGateway`, `ImportanceRatings`)
//! describe facts owned elsewhere. The three effective stores are the
//! materialised views the engine owns. `FactStore` is the write side of the
//! read-only collaborators, used when the engine maintains those facts itself.
//!
//! Every trait shares the [`Backend`] error type so a single backend can
//! implement all of them. All methods return `Send` futures.

use std::future::Future;

use uuid::Uuid;

use crate::{
  capability::{CapabilityLevel, CapabilityNode},
  domain::EffectiveBusinessDomain,
  importance::{EffectiveImportance, ExplicitImportance, StrategyPillar},
  realization::{Realization, RealizationLevel},
};

/// Common supertrait carrying the backend's error type.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Read-only collaborators ─────────────────────────────────────────────────

/// Lookup of capability facts.
pub trait HierarchyIndex: Backend {
  /// Returns `None` if the capability is unknown.
  fn get_by_id(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<Option<CapabilityNode>, Self::Error>> + Send + '_;

  /// Direct children only.
  fn get_children(
    &self,
    parent_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// The full subtree below `capability_id`, excluding the capability itself.
  fn get_descendants(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}

pub trait BusinessDomainNameProvider: Backend {
  /// Returns `None` if the domain is unknown.
  fn get_business_domain_name(
    &self,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;
}

pub trait DomainAssignmentChecker: Backend {
  fn assignment_exists(
    &self,
    business_domain_id: Uuid,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait StrategyPillarsGateway: Backend {
  /// Every known pillar, active or not.
  fn get_strategy_pillars(
    &self,
  ) -> impl Future<Output = Result<Vec<StrategyPillar>, Self::Error>> + Send + '_;

  /// The pillar if it exists and is active.
  fn get_active_pillar(
    &self,
    pillar_id: Uuid,
  ) -> impl Future<Output = Result<Option<StrategyPillar>, Self::Error>> + Send + '_;
}

pub trait ImportanceRatings: Backend {
  /// The rating set directly on `capability_id`, ignoring ancestors.
  fn get_explicit_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<Option<ExplicitImportance>, Self::Error>> + Send + '_;
}

// ─── Effective stores ────────────────────────────────────────────────────────

/// Materialised `capability -> (L1 ancestor, business domain)` mapping.
pub trait EffectiveBusinessDomainStore: Backend {
  fn get_effective_domain(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<Option<EffectiveBusinessDomain>, Self::Error>> + Send + '_;

  fn upsert_effective_domain(
    &self,
    row: EffectiveBusinessDomain,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// No-op if absent.
  fn delete_effective_domain(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Set the domain fields on every row whose L1 ancestor is
  /// `l1_capability_id`, in one operation.
  fn update_business_domain_for_l1_subtree(
    &self,
    l1_capability_id: Uuid,
    business_domain_id: Option<Uuid>,
    business_domain_name: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Refresh the cached name on every row carrying `business_domain_id`.
  fn rename_business_domain(
    &self,
    business_domain_id: Uuid,
    business_domain_name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Materialised effective importance, keyed by
/// `(capability, pillar, business domain)`.
pub trait EffectiveImportanceStore: Backend {
  fn get_effective_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<Option<EffectiveImportance>, Self::Error>> + Send + '_;

  fn list_effective_importance(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<Vec<EffectiveImportance>, Self::Error>> + Send + '_;

  fn upsert_effective_importance(
    &self,
    row: EffectiveImportance,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// No-op if absent.
  fn delete_effective_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_effective_importance_for_capability(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every pillar's row for one `(capability, business domain)` pair.
  fn delete_effective_importance_for_domain(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rename_importance_source(
    &self,
    source_capability_id: Uuid,
    source_capability_name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Direct and inherited realization rows.
pub trait RealizationStore: Backend {
  /// Insert, or overwrite the row with the same `realization_id`.
  fn upsert_realization(
    &self,
    row: Realization,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_realization(
    &self,
    realization_id: Uuid,
  ) -> impl Future<Output = Result<Option<Realization>, Self::Error>> + Send + '_;

  /// Direct and inherited rows attached to `capability_id`.
  fn list_realizations_for_capability(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Realization>, Self::Error>> + Send + '_;

  /// Inherited rows whose `source_realization_id` is `source_realization_id`.
  fn list_realizations_by_source(
    &self,
    source_realization_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Realization>, Self::Error>> + Send + '_;

  /// Update level and notes of a `Direct` row in place. Inherited rows are
  /// untouched.
  fn update_direct_realization(
    &self,
    realization_id: Uuid,
    realization_level: RealizationLevel,
    notes: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// No-op if absent.
  fn delete_realization(
    &self,
    realization_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_realizations_by_source(
    &self,
    source_realization_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_realizations_for_capability(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_realizations_for_component(
    &self,
    component_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rename_realization_source(
    &self,
    source_capability_id: Uuid,
    source_capability_name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rename_component(
    &self,
    component_id: Uuid,
    component_name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Fact writes ─────────────────────────────────────────────────────────────

/// Write side of the read-only collaborators. All writes are idempotent.
pub trait FactStore: Backend {
  fn upsert_capability(
    &self,
    node: CapabilityNode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rename_capability(
    &self,
    capability_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn move_capability(
    &self,
    capability_id: Uuid,
    parent_id: Option<Uuid>,
    level: CapabilityLevel,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_capability_level(
    &self,
    capability_id: Uuid,
    level: CapabilityLevel,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_capability(
    &self,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn upsert_business_domain(
    &self,
    business_domain_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_business_domain(
    &self,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_assignment(
    &self,
    business_domain_id: Uuid,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_assignment(
    &self,
    business_domain_id: Uuid,
    capability_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn upsert_pillar(
    &self,
    pillar: StrategyPillar,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn deactivate_pillar(
    &self,
    pillar_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn upsert_explicit_importance(
    &self,
    rating: ExplicitImportance,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_explicit_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
