//! Capability facts as seen by the projections.
//!
//! Capabilities form a tree at most four levels deep. The projections never
//! mutate these facts; they read them through
//! [`HierarchyIndex`](crate::store::HierarchyIndex).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Depth of a capability in the hierarchy. `L1` is a root.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
pub enum CapabilityLevel {
  L1,
  L2,
  L3,
  L4,
}

impl CapabilityLevel {
  /// 1-based depth of the level.
  pub fn depth(self) -> u8 {
    match self {
      Self::L1 => 1,
      Self::L2 => 2,
      Self::L3 => 3,
      Self::L4 => 4,
    }
  }

  /// The level a direct child of a capability at this level has, or `None`
  /// for the deepest level.
  pub fn child_level(self) -> Option<Self> {
    match self {
      Self::L1 => Some(Self::L2),
      Self::L2 => Some(Self::L3),
      Self::L3 => Some(Self::L4),
      Self::L4 => None,
    }
  }

  pub fn is_root(self) -> bool { matches!(self, Self::L1) }
}

/// A capability as recorded in the hierarchy index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityNode {
  pub capability_id: Uuid,
  pub parent_id:     Option<Uuid>,
  pub level:         CapabilityLevel,
  pub name:          String,
}
