//! System realizations: which application components implement which
//! capability.
//!
//! A `Direct` realization is an explicit link. Every ancestor of the linked
//! capability carries an `Inherited` copy that points back at it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// How much of a capability a component implements.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
pub enum RealizationLevel {
  Full,
  Partial,
  Planned,
}

/// Whether a realization row was linked explicitly or propagated upwards.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
pub enum RealizationOrigin {
  Direct,
  Inherited,
}

/// One row of the realization read model.
///
/// For `Inherited` rows the three `source_*` fields identify the `Direct`
/// realization and capability the row was propagated from; they are `None`
/// on `Direct` rows. Inherited rows are always [`RealizationLevel::Full`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realization {
  pub realization_id:         Uuid,
  pub capability_id:          Uuid,
  pub component_id:           Uuid,
  pub component_name:         String,
  pub realization_level:      RealizationLevel,
  pub notes:                  Option<String>,
  pub origin:                 RealizationOrigin,
  pub source_realization_id:  Option<Uuid>,
  pub source_capability_id:   Option<Uuid>,
  pub source_capability_name: Option<String>,
  pub linked_at:              DateTime<Utc>,
}

impl Realization {
  pub fn is_direct(&self) -> bool { self.origin == RealizationOrigin::Direct }

  /// Identity of the inherited copy of `source_realization_id` on
  /// `capability_id`. Stable across replays, so re-propagation overwrites
  /// rather than duplicates.
  pub fn inherited_id(source_realization_id: Uuid, capability_id: Uuid) -> Uuid {
    Uuid::new_v5(&source_realization_id, capability_id.as_bytes())
  }
}

/// What an inherited row copies from the realization it was propagated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceSource {
  pub realization_id:  Uuid,
  pub capability_id:   Uuid,
  pub capability_name: String,
  pub component_id:    Uuid,
  pub component_name:  String,
  pub linked_at:       DateTime<Utc>,
}

impl InheritanceSource {
  /// Build the inherited row this source produces on `capability_id`.
  pub fn inherited_row(&self, capability_id: Uuid) -> Realization {
    Realization {
      realization_id: Realization::inherited_id(self.realization_id, capability_id),
      capability_id,
      component_id: self.component_id,
      component_name: self.component_name.clone(),
      realization_level: RealizationLevel::Full,
      notes: None,
      origin: RealizationOrigin::Inherited,
      source_realization_id: Some(self.realization_id),
      source_capability_id: Some(self.capability_id),
      source_capability_name: Some(self.capability_name.clone()),
      linked_at: self.linked_at,
    }
  }
}
