//! The closed set of domain events the projections consume.
//!
//! Events arrive from the event store as an `(event_type, event_data)` pair
//! where `event_data` is a camelCase JSON object. [`CapabilityEvent::decode`]
//! turns that pair into a typed event; event types this crate does not know
//! decode to `None` so newer producers never break older projections.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumDiscriminants, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  capability::CapabilityLevel,
  importance::Importance,
  realization::RealizationLevel,
};

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityCreated {
  pub id:        Uuid,
  pub name:      String,
  #[serde(default)]
  pub parent_id: Option<Uuid>,
  pub level:     CapabilityLevel,
}

/// Payload shared by every "entity got a new name" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Renamed {
  pub id:   Uuid,
  pub name: String,
}

/// Payload shared by every "entity went away" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Removed {
  pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentChanged {
  pub id:            Uuid,
  #[serde(default)]
  pub old_parent_id: Option<Uuid>,
  #[serde(default)]
  pub new_parent_id: Option<Uuid>,
  #[serde(default)]
  pub old_level:     Option<CapabilityLevel>,
  pub new_level:     CapabilityLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelChanged {
  pub id:        Uuid,
  #[serde(default)]
  pub old_level: Option<CapabilityLevel>,
  pub new_level: CapabilityLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAssignment {
  /// Identity of the assignment itself.
  pub id:                 Uuid,
  pub business_domain_id: Uuid,
  pub capability_id:      Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportanceRated {
  pub capability_id:      Uuid,
  pub pillar_id:          Uuid,
  pub business_domain_id: Uuid,
  pub importance:         Importance,
  #[serde(default)]
  pub rationale:          Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportanceRemoved {
  pub capability_id:      Uuid,
  pub pillar_id:          Uuid,
  pub business_domain_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLinked {
  /// Identity of the direct realization.
  pub id:                Uuid,
  pub capability_id:     Uuid,
  pub component_id:      Uuid,
  pub component_name:    String,
  pub realization_level: RealizationLevel,
  #[serde(default)]
  pub notes:             Option<String>,
  pub linked_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizationUpdated {
  pub id:                Uuid,
  pub realization_level: RealizationLevel,
  #[serde(default)]
  pub notes:             Option<String>,
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// Every event the projections react to. The variant name is the event type
/// string used by the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type", content = "data")]
#[strum_discriminants(name(EventKind))]
#[strum_discriminants(derive(Display, EnumString, IntoStaticStr, Hash))]
pub enum CapabilityEvent {
  // ── Hierarchy ─────────────────────────────────────────────────────────
  CapabilityCreated(CapabilityCreated),
  CapabilityUpdated(Renamed),
  CapabilityDeleted(Removed),
  CapabilityParentChanged(ParentChanged),
  CapabilityLevelChanged(LevelChanged),

  // ── Business domains ──────────────────────────────────────────────────
  BusinessDomainCreated(Renamed),
  BusinessDomainUpdated(Renamed),
  BusinessDomainDeleted(Removed),
  CapabilityAssignedToDomain(DomainAssignment),
  CapabilityUnassignedFromDomain(DomainAssignment),

  // ── Strategy ──────────────────────────────────────────────────────────
  StrategyPillarAdded(Renamed),
  StrategyPillarUpdated(Renamed),
  StrategyPillarRemoved(Removed),
  StrategyImportanceSet(ImportanceRated),
  StrategyImportanceUpdated(ImportanceRated),
  StrategyImportanceRemoved(ImportanceRemoved),

  // ── Realizations ──────────────────────────────────────────────────────
  SystemLinkedToCapability(SystemLinked),
  SystemRealizationUpdated(RealizationUpdated),
  SystemRealizationDeleted(Removed),
  ApplicationComponentUpdated(Renamed),
  ApplicationComponentDeleted(Removed),
}

impl CapabilityEvent {
  /// Decode an event from the store's wire form.
  ///
  /// Returns `Ok(None)` for event types outside [`EventKind`]; a known type
  /// with a payload that does not fit is an error.
  pub fn decode(event_type: &str, event_data: &[u8]) -> Result<Option<Self>> {
    if EventKind::from_str(event_type).is_err() {
      return Ok(None);
    }

    let malformed = |source| Error::MalformedEvent {
      event_type: event_type.to_owned(),
      source,
    };
    let data: serde_json::Value =
      serde_json::from_slice(event_data).map_err(malformed)?;
    let wrapped = serde_json::json!({ "type": event_type, "data": data });
    serde_json::from_value(wrapped).map(Some).map_err(malformed)
  }

  /// Encode into the `(event_type, event_data)` wire form.
  pub fn encode(&self) -> Result<(&'static str, Vec<u8>)> {
    // The full serialised form is `{"type": "...", "data": <payload>}`.
    let full = serde_json::to_value(self)?;
    let data = full.get("data").cloned().unwrap_or(serde_json::Value::Null);
    Ok((self.event_type(), serde_json::to_vec(&data)?))
  }

  pub fn kind(&self) -> EventKind { EventKind::from(self) }

  pub fn event_type(&self) -> &'static str { self.kind().into() }
}
