//! Strategic importance ratings.
//!
//! A rating is set explicitly on one capability for a `(pillar, business
//! domain)` pair. Descendants without their own rating inherit the nearest
//! ancestor's; the resolved value is materialised as an
//! [`EffectiveImportance`] row.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Importance ──────────────────────────────────────────────────────────────

/// A rating on the 1–5 scale.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Importance(u8);

impl Importance {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: u8) -> Result<Self> {
    if (Self::MIN..=Self::MAX).contains(&value) {
      Ok(Self(value))
    } else {
      Err(Error::InvalidImportance(value))
    }
  }

  pub fn value(self) -> u8 { self.0 }

  /// Human-readable label stored alongside the numeric value.
  pub fn label(self) -> &'static str {
    match self.0 {
      1 => "Low",
      2 => "Below Average",
      3 => "Average",
      4 => "Above Average",
      _ => "Critical",
    }
  }
}

impl TryFrom<u8> for Importance {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self> { Self::new(value) }
}

impl From<Importance> for u8 {
  fn from(importance: Importance) -> Self { importance.0 }
}

impl fmt::Display for Importance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.0, self.label())
  }
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

/// The key every rating, explicit or effective, is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RatingKey {
  pub pillar_id:          Uuid,
  pub business_domain_id: Uuid,
}

/// A rating set directly on a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitImportance {
  pub capability_id:      Uuid,
  pub pillar_id:          Uuid,
  pub business_domain_id: Uuid,
  pub importance:         Importance,
  pub rationale:          Option<String>,
  /// Denormalised from the pillar when the rating was recorded.
  pub pillar_name:        Option<String>,
}

/// A strategic dimension capabilities are rated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPillar {
  pub pillar_id: Uuid,
  pub name:      String,
  pub active:    bool,
}

// ─── Effective row ───────────────────────────────────────────────────────────

/// The materialised, inheritance-aware rating of a capability.
///
/// `source_capability_id` is the nearest capability on the path to the root
/// (inclusive) with an explicit rating for the same key; `is_inherited` is
/// true whenever that is not the capability itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveImportance {
  pub capability_id:          Uuid,
  pub pillar_id:              Uuid,
  pub business_domain_id:     Uuid,
  pub importance:             Importance,
  pub importance_label:       String,
  pub source_capability_id:   Uuid,
  pub source_capability_name: String,
  pub is_inherited:           bool,
  pub rationale:              Option<String>,
  pub computed_at:            DateTime<Utc>,
}

impl EffectiveImportance {
  pub fn key(&self) -> RatingKey {
    RatingKey {
      pillar_id:          self.pillar_id,
      business_domain_id: self.business_domain_id,
    }
  }
}
