//! Encoding and decoding helpers between the domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enumerations their `Display` names. Each `Raw*` struct is one row read
//! straight off the connection thread and decoded afterwards.

use std::str::FromStr;

use capmap_core::{
  capability::{CapabilityLevel, CapabilityNode},
  domain::EffectiveBusinessDomain,
  importance::{EffectiveImportance, ExplicitImportance, Importance, StrategyPillar},
  realization::{Realization, RealizationLevel, RealizationOrigin},
};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_level(s: &str) -> Result<CapabilityLevel> {
  CapabilityLevel::from_str(s)
    .map_err(|_| Error::Core(capmap_core::Error::UnknownLevel(s.to_owned())))
}

fn decode_column<T: FromStr>(column: &'static str, value: String) -> Result<T> {
  T::from_str(&value).map_err(|_| Error::InvalidColumn { column, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub struct RawCapability {
  pub capability_id: String,
  pub parent_id:     Option<String>,
  pub level:         String,
  pub name:          String,
}

impl RawCapability {
  pub const COLUMNS: &'static str = "capability_id, parent_id, level, name";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      capability_id: row.get(0)?,
      parent_id:     row.get(1)?,
      level:         row.get(2)?,
      name:          row.get(3)?,
    })
  }

  pub fn into_node(self) -> Result<CapabilityNode> {
    Ok(CapabilityNode {
      capability_id: decode_uuid(&self.capability_id)?,
      parent_id:     decode_opt_uuid(self.parent_id)?,
      level:         decode_level(&self.level)?,
      name:          self.name,
    })
  }
}

pub struct RawPillar {
  pub pillar_id: String,
  pub name:      String,
  pub active:    bool,
}

impl RawPillar {
  pub const COLUMNS: &'static str = "pillar_id, name, active";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      pillar_id: row.get(0)?,
      name:      row.get(1)?,
      active:    row.get(2)?,
    })
  }

  pub fn into_pillar(self) -> Result<StrategyPillar> {
    Ok(StrategyPillar {
      pillar_id: decode_uuid(&self.pillar_id)?,
      name:      self.name,
      active:    self.active,
    })
  }
}

pub struct RawRating {
  pub capability_id:      String,
  pub pillar_id:          String,
  pub business_domain_id: String,
  pub importance:         u8,
  pub rationale:          Option<String>,
  pub pillar_name:        Option<String>,
}

impl RawRating {
  pub const COLUMNS: &'static str =
    "capability_id, pillar_id, business_domain_id, importance, rationale, pillar_name";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      capability_id:      row.get(0)?,
      pillar_id:          row.get(1)?,
      business_domain_id: row.get(2)?,
      importance:         row.get(3)?,
      rationale:          row.get(4)?,
      pillar_name:        row.get(5)?,
    })
  }

  pub fn into_rating(self) -> Result<ExplicitImportance> {
    Ok(ExplicitImportance {
      capability_id:      decode_uuid(&self.capability_id)?,
      pillar_id:          decode_uuid(&self.pillar_id)?,
      business_domain_id: decode_uuid(&self.business_domain_id)?,
      importance:         Importance::new(self.importance)?,
      rationale:          self.rationale,
      pillar_name:        self.pillar_name,
    })
  }
}

pub struct RawEffectiveDomain {
  pub capability_id:        String,
  pub l1_capability_id:     String,
  pub business_domain_id:   Option<String>,
  pub business_domain_name: Option<String>,
}

impl RawEffectiveDomain {
  pub const COLUMNS: &'static str =
    "capability_id, l1_capability_id, business_domain_id, business_domain_name";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      capability_id:        row.get(0)?,
      l1_capability_id:     row.get(1)?,
      business_domain_id:   row.get(2)?,
      business_domain_name: row.get(3)?,
    })
  }

  pub fn into_row(self) -> Result<EffectiveBusinessDomain> {
    Ok(EffectiveBusinessDomain {
      capability_id:        decode_uuid(&self.capability_id)?,
      l1_capability_id:     decode_uuid(&self.l1_capability_id)?,
      business_domain_id:   decode_opt_uuid(self.business_domain_id)?,
      business_domain_name: self.business_domain_name,
    })
  }
}

pub struct RawEffectiveImportance {
  pub capability_id:          String,
  pub pillar_id:              String,
  pub business_domain_id:     String,
  pub importance:             u8,
  pub importance_label:       String,
  pub source_capability_id:   String,
  pub source_capability_name: String,
  pub is_inherited:           bool,
  pub rationale:              Option<String>,
  pub computed_at:            String,
}

impl RawEffectiveImportance {
  pub const COLUMNS: &'static str = "capability_id, pillar_id, business_domain_id, importance, \
                             importance_label, source_capability_id, source_capability_name, \
                             is_inherited, rationale, computed_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      capability_id:          row.get(0)?,
      pillar_id:              row.get(1)?,
      business_domain_id:     row.get(2)?,
      importance:             row.get(3)?,
      importance_label:       row.get(4)?,
      source_capability_id:   row.get(5)?,
      source_capability_name: row.get(6)?,
      is_inherited:           row.get(7)?,
      rationale:              row.get(8)?,
      computed_at:            row.get(9)?,
    })
  }

  pub fn into_row(self) -> Result<EffectiveImportance> {
    Ok(EffectiveImportance {
      capability_id:          decode_uuid(&self.capability_id)?,
      pillar_id:              decode_uuid(&self.pillar_id)?,
      business_domain_id:     decode_uuid(&self.business_domain_id)?,
      importance:             Importance::new(self.importance)?,
      importance_label:       self.importance_label,
      source_capability_id:   decode_uuid(&self.source_capability_id)?,
      source_capability_name: self.source_capability_name,
      is_inherited:           self.is_inherited,
      rationale:              self.rationale,
      computed_at:            decode_dt(&self.computed_at)?,
    })
  }
}

pub struct RawRealization {
  pub realization_id:         String,
  pub capability_id:          String,
  pub component_id:           String,
  pub component_name:         String,
  pub realization_level:      String,
  pub notes:                  Option<String>,
  pub origin:                 String,
  pub source_realization_id:  Option<String>,
  pub source_capability_id:   Option<String>,
  pub source_capability_name: Option<String>,
  pub linked_at:              String,
}

impl RawRealization {
  pub const COLUMNS: &'static str = "realization_id, capability_id, component_id, component_name, \
                             realization_level, notes, origin, source_realization_id, \
                             source_capability_id, source_capability_name, linked_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      realization_id:         row.get(0)?,
      capability_id:          row.get(1)?,
      component_id:           row.get(2)?,
      component_name:         row.get(3)?,
      realization_level:      row.get(4)?,
      notes:                  row.get(5)?,
      origin:                 row.get(6)?,
      source_realization_id:  row.get(7)?,
      source_capability_id:   row.get(8)?,
      source_capability_name: row.get(9)?,
      linked_at:              row.get(10)?,
    })
  }

  pub fn into_realization(self) -> Result<Realization> {
    Ok(Realization {
      realization_id:         decode_uuid(&self.realization_id)?,
      capability_id:          decode_uuid(&self.capability_id)?,
      component_id:           decode_uuid(&self.component_id)?,
      component_name:         self.component_name,
      realization_level:      decode_column::<RealizationLevel>(
        "realization_level",
        self.realization_level,
      )?,
      notes:                  self.notes,
      origin:                 decode_column::<RealizationOrigin>("origin", self.origin)?,
      source_realization_id:  decode_opt_uuid(self.source_realization_id)?,
      source_capability_id:   decode_opt_uuid(self.source_capability_id)?,
      source_capability_name: self.source_capability_name,
      linked_at:              decode_dt(&self.linked_at)?,
    })
  }
}
