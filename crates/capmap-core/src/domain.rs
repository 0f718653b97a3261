//! Effective business-domain ownership.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The business domain a capability belongs to through its L1 ancestor.
///
/// Every capability sharing an `l1_capability_id` carries the same domain
/// fields. Both domain fields are `None` when the L1 ancestor is unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveBusinessDomain {
  pub capability_id:        Uuid,
  pub l1_capability_id:     Uuid,
  pub business_domain_id:   Option<Uuid>,
  pub business_domain_name: Option<String>,
}

impl EffectiveBusinessDomain {
  /// A row that anchors `capability_id` to itself with no domain.
  pub fn unassigned_root(capability_id: Uuid) -> Self {
    Self {
      capability_id,
      l1_capability_id: capability_id,
      business_domain_id: None,
      business_domain_name: None,
    }
  }

  /// The inheritable part of the row, detached from its capability.
  pub fn lineage(&self) -> DomainLineage {
    DomainLineage {
      l1_capability_id:     self.l1_capability_id,
      business_domain_id:   self.business_domain_id,
      business_domain_name: self.business_domain_name.clone(),
    }
  }
}

/// What a subtree inherits: `(L1 ancestor, domain id, domain name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainLineage {
  pub l1_capability_id:     Uuid,
  pub business_domain_id:   Option<Uuid>,
  pub business_domain_name: Option<String>,
}

impl DomainLineage {
  pub fn root(l1_capability_id: Uuid) -> Self {
    Self { l1_capability_id, business_domain_id: None, business_domain_name: None }
  }

  pub fn apply_to(&self, capability_id: Uuid) -> EffectiveBusinessDomain {
    EffectiveBusinessDomain {
      capability_id,
      l1_capability_id: self.l1_capability_id,
      business_domain_id: self.business_domain_id,
      business_domain_name: self.business_domain_name.clone(),
    }
  }
}
