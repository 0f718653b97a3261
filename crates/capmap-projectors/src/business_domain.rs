//! [`BusinessDomainPropagator`] — maintains effective business-domain rows.
//!
//! A capability's domain is its L1 ancestor's direct assignment. Structural
//! events recompute the `(L1, domain)` lineage of the moved node and copy it
//! across the node's current subtree; assignment events update every row
//! sharing an L1 ancestor in one bulk write.

use std::sync::Arc;

use capmap_core::{
  capability::CapabilityLevel,
  domain::{DomainLineage, EffectiveBusinessDomain},
  event::CapabilityEvent,
  store::{
    BusinessDomainNameProvider, DomainAssignmentChecker, EffectiveBusinessDomainStore,
    HierarchyIndex,
  },
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Projector,
  error::{Result, collaborator},
  walk::collect_subtree_ids,
};

pub struct BusinessDomainPropagator<S> {
  store: Arc<S>,
}

impl<S> BusinessDomainPropagator<S>
where
  S: HierarchyIndex
    + EffectiveBusinessDomainStore
    + BusinessDomainNameProvider
    + DomainAssignmentChecker,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn on_capability_created(
    &self,
    capability_id: Uuid,
    parent_id: Option<Uuid>,
    level: CapabilityLevel,
  ) -> Result<()> {
    let lineage = self.lineage_for(capability_id, parent_id, level).await?;
    self
      .store
      .upsert_effective_domain(lineage.apply_to(capability_id))
      .await
      .map_err(collaborator)
  }

  pub async fn on_capability_deleted(&self, capability_id: Uuid) -> Result<()> {
    self
      .store
      .delete_effective_domain(capability_id)
      .await
      .map_err(collaborator)
  }

  pub async fn on_capability_parent_changed(
    &self,
    capability_id: Uuid,
    new_parent_id: Option<Uuid>,
    new_level: CapabilityLevel,
  ) -> Result<()> {
    let lineage = self.lineage_for(capability_id, new_parent_id, new_level).await?;
    self.apply_to_subtree(capability_id, &lineage).await
  }

  /// The event carries no parent, so the current one is read from the index.
  pub async fn on_capability_level_changed(
    &self,
    capability_id: Uuid,
    new_level: CapabilityLevel,
  ) -> Result<()> {
    let parent_id = if new_level.is_root() {
      None
    } else {
      self
        .store
        .get_by_id(capability_id)
        .await
        .map_err(collaborator)?
        .and_then(|node| node.parent_id)
    };
    let lineage = self.lineage_for(capability_id, parent_id, new_level).await?;
    self.apply_to_subtree(capability_id, &lineage).await
  }

  pub async fn on_assigned_to_domain(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    let Some(row) = self.effective_row(capability_id).await? else {
      debug!(%capability_id, "no effective domain row yet; nothing to anchor assignment to");
      return Ok(());
    };

    let name = self
      .store
      .get_business_domain_name(business_domain_id)
      .await
      .map_err(collaborator)?;
    if name.is_none() {
      warn!(%business_domain_id, "assigned business domain has no known name");
    }

    self
      .store
      .update_business_domain_for_l1_subtree(
        row.l1_capability_id,
        Some(business_domain_id),
        name,
      )
      .await
      .map_err(collaborator)
  }

  /// Clears the L1 subtree only when it currently shows the unassigned
  /// domain and the L1 ancestor holds no assignment to it of its own.
  pub async fn on_unassigned_from_domain(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    let Some(row) = self.effective_row(capability_id).await? else {
      debug!(%capability_id, "no effective domain row; nothing to unassign");
      return Ok(());
    };
    if row.business_domain_id != Some(business_domain_id) {
      debug!(%capability_id, %business_domain_id, "subtree shows another domain; leaving it");
      return Ok(());
    }
    let still_assigned = self
      .store
      .assignment_exists(business_domain_id, row.l1_capability_id)
      .await
      .map_err(collaborator)?;
    if still_assigned {
      debug!(
        %capability_id,
        l1_capability_id = %row.l1_capability_id,
        %business_domain_id,
        "L1 ancestor still assigned; leaving subtree",
      );
      return Ok(());
    }
    self
      .store
      .update_business_domain_for_l1_subtree(row.l1_capability_id, None, None)
      .await
      .map_err(collaborator)
  }

  pub async fn on_business_domain_renamed(
    &self,
    business_domain_id: Uuid,
    name: String,
  ) -> Result<()> {
    self
      .store
      .rename_business_domain(business_domain_id, name)
      .await
      .map_err(collaborator)
  }

  async fn effective_row(&self, capability_id: Uuid) -> Result<Option<EffectiveBusinessDomain>> {
    self
      .store
      .get_effective_domain(capability_id)
      .await
      .map_err(collaborator)
  }

  /// L1 capabilities anchor their own lineage. Anything else inherits its
  /// parent's row, falling back to anchoring itself when the parent has not
  /// been materialised.
  async fn lineage_for(
    &self,
    capability_id: Uuid,
    parent_id: Option<Uuid>,
    level: CapabilityLevel,
  ) -> Result<DomainLineage> {
    if level.is_root() {
      return Ok(DomainLineage::root(capability_id));
    }
    let Some(parent_id) = parent_id else {
      warn!(%capability_id, %level, "non-L1 capability without a parent; anchoring to itself");
      return Ok(DomainLineage::root(capability_id));
    };

    match self.effective_row(parent_id).await? {
      Some(parent) => Ok(parent.lineage()),
      None => {
        debug!(%capability_id, %parent_id, "parent has no effective domain row yet");
        Ok(DomainLineage::root(capability_id))
      }
    }
  }

  /// Write `lineage` onto `root_id` and every capability currently below it.
  ///
  /// Only the root's write fails the event. A descendant whose write fails
  /// is logged and left behind until its own next structural event.
  async fn apply_to_subtree(&self, root_id: Uuid, lineage: &DomainLineage) -> Result<()> {
    self
      .store
      .upsert_effective_domain(lineage.apply_to(root_id))
      .await
      .map_err(collaborator)?;

    for descendant_id in collect_subtree_ids(self.store.as_ref(), root_id).await? {
      if let Err(err) = self
        .store
        .upsert_effective_domain(lineage.apply_to(descendant_id))
        .await
      {
        warn!(%root_id, %descendant_id, error = %err, "failed to update descendant's effective domain; skipping");
      }
    }
    Ok(())
  }
}

impl<S> Projector for BusinessDomainPropagator<S>
where
  S: HierarchyIndex
    + EffectiveBusinessDomainStore
    + BusinessDomainNameProvider
    + DomainAssignmentChecker,
{
  async fn project(&self, event: &CapabilityEvent) -> Result<()> {
    match event {
      CapabilityEvent::CapabilityCreated(e) => {
        self.on_capability_created(e.id, e.parent_id, e.level).await
      }
      CapabilityEvent::CapabilityDeleted(e) => self.on_capability_deleted(e.id).await,
      CapabilityEvent::CapabilityParentChanged(e) => {
        self
          .on_capability_parent_changed(e.id, e.new_parent_id, e.new_level)
          .await
      }
      CapabilityEvent::CapabilityLevelChanged(e) => {
        self.on_capability_level_changed(e.id, e.new_level).await
      }
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
      CapabilityEvent::BusinessDomainUpdated(e) => {
        self.on_business_domain_renamed(e.id, e.name.clone()).await
      }
      _ => Ok(()),
    }
  }
}
