//! [`RealizationInheritancePropagator`] — mirrors each direct realization onto
//! every ancestor of the linked capability.
//!
//! Direct rows are written as observed; the inherited copies are derived and
//! owned here. Inherited rows always claim a `Full` realization and carry the
//! originating realization and capability as their source.

use std::{collections::HashSet, sync::Arc};

use capmap_core::{
  event::{CapabilityEvent, SystemLinked},
  realization::{InheritanceSource, Realization, RealizationLevel, RealizationOrigin},
  store::{HierarchyIndex, RealizationStore},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Projector,
  error::{Result, collaborator},
  walk::{collect_subtree_ids, self_and_ancestors},
};

/// What happens to inherited rows along a capability's former ancestor chain
/// when it is moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleInheritancePolicy {
  /// Leave them in place; only the new chain is populated.
  #[default]
  Retain,
  /// Delete inherited copies of the moved realizations that sit outside the
  /// moved subtree before populating the new chain.
  Prune,
}

pub struct RealizationInheritancePropagator<S> {
  store:        Arc<S>,
  stale_policy: StaleInheritancePolicy,
}

impl<S> RealizationInheritancePropagator<S>
where
  S: HierarchyIndex + RealizationStore,
{
  pub fn new(store: Arc<S>, stale_policy: StaleInheritancePolicy) -> Self {
    Self { store, stale_policy }
  }

  pub async fn on_system_linked(&self, link: &SystemLinked) -> Result<()> {
    let direct = Realization {
      realization_id:         link.id,
      capability_id:          link.capability_id,
      component_id:           link.component_id,
      component_name:         link.component_name.clone(),
      realization_level:      link.realization_level,
      notes:                  link.notes.clone(),
      origin:                 RealizationOrigin::Direct,
      source_realization_id:  None,
      source_capability_id:   None,
      source_capability_name: None,
      linked_at:              link.linked_at,
    };
    self.store.upsert_realization(direct).await.map_err(collaborator)?;

    let Some(node) = self
      .store
      .get_by_id(link.capability_id)
      .await
      .map_err(collaborator)?
    else {
      debug!(capability_id = %link.capability_id, "linked capability not in hierarchy; nothing to inherit");
      return Ok(());
    };

    let source = InheritanceSource {
      realization_id:  link.id,
      capability_id:   link.capability_id,
      capability_name: node.name,
      component_id:    link.component_id,
      component_name:  link.component_name.clone(),
      linked_at:       link.linked_at,
    };
    self.propagate_from(node.parent_id, &source).await
  }

  pub async fn on_realization_updated(
    &self,
    realization_id: Uuid,
    realization_level: RealizationLevel,
    notes: Option<String>,
  ) -> Result<()> {
    self
      .store
      .update_direct_realization(realization_id, realization_level, notes)
      .await
      .map_err(collaborator)
  }

  /// Inherited copies go first, then the direct row.
  pub async fn on_realization_deleted(&self, realization_id: Uuid) -> Result<()> {
    self
      .store
      .delete_realizations_by_source(realization_id)
      .await
      .map_err(collaborator)?;
    self
      .store
      .delete_realization(realization_id)
      .await
      .map_err(collaborator)
  }

  /// Re-propagate every realization attached to the moved capability along
  /// its new ancestor chain. See [`StaleInheritancePolicy`] for the old chain.
  pub async fn on_capability_parent_changed(
    &self,
    capability_id: Uuid,
    new_parent_id: Option<Uuid>,
  ) -> Result<()> {
    let rows = self
      .store
      .list_realizations_for_capability(capability_id)
      .await
      .map_err(collaborator)?;
    if rows.is_empty() {
      return Ok(());
    }

    let capability_name = self
      .store
      .get_by_id(capability_id)
      .await
      .map_err(collaborator)?
      .map(|node| node.name)
      .unwrap_or_default();

    let sources: Vec<InheritanceSource> = rows
      .iter()
      .filter_map(|row| source_of(row, &capability_name))
      .collect();

    if self.stale_policy == StaleInheritancePolicy::Prune {
      self.prune_outside_subtree(capability_id, &sources).await?;
    }

    for source in &sources {
      self.propagate_from(new_parent_id, source).await?;
    }
    Ok(())
  }

  /// Drop the deleted capability's direct realizations along with their
  /// inherited copies, then anything else still attached to it.
  pub async fn on_capability_deleted(&self, capability_id: Uuid) -> Result<()> {
    let rows = self
      .store
      .list_realizations_for_capability(capability_id)
      .await
      .map_err(collaborator)?;
    for row in rows.iter().filter(|row| row.is_direct()) {
      self
        .store
        .delete_realizations_by_source(row.realization_id)
        .await
        .map_err(collaborator)?;
    }
    self
      .store
      .delete_realizations_for_capability(capability_id)
      .await
      .map_err(collaborator)
  }

  pub async fn on_capability_renamed(&self, capability_id: Uuid, name: String) -> Result<()> {
    self
      .store
      .rename_realization_source(capability_id, name)
      .await
      .map_err(collaborator)
  }

  pub async fn on_component_renamed(&self, component_id: Uuid, name: String) -> Result<()> {
    self
      .store
      .rename_component(component_id, name)
      .await
      .map_err(collaborator)
  }

  pub async fn on_component_deleted(&self, component_id: Uuid) -> Result<()> {
    self
      .store
      .delete_realizations_for_component(component_id)
      .await
      .map_err(collaborator)
  }

  /// Write an inherited copy of `source` onto `start_id` and each of its
  /// ancestors. The walk halts quietly at the root or at an unknown
  /// capability.
  async fn propagate_from(&self, start_id: Option<Uuid>, source: &InheritanceSource) -> Result<()> {
    let Some(start_id) = start_id else {
      return Ok(());
    };
    for node in self_and_ancestors(self.store.as_ref(), start_id).await? {
      self
        .store
        .upsert_realization(source.inherited_row(node.capability_id))
        .await
        .map_err(collaborator)?;
    }
    Ok(())
  }

  async fn prune_outside_subtree(
    &self,
    capability_id: Uuid,
    sources: &[InheritanceSource],
  ) -> Result<()> {
    let mut keep: HashSet<Uuid> = collect_subtree_ids(self.store.as_ref(), capability_id)
      .await?
      .into_iter()
      .collect();
    keep.insert(capability_id);

    for source in sources {
      let inherited = self
        .store
        .list_realizations_by_source(source.realization_id)
        .await
        .map_err(collaborator)?;
      for row in inherited.iter().filter(|row| !keep.contains(&row.capability_id)) {
        debug!(
          realization_id = %row.realization_id,
          capability_id = %row.capability_id,
          "pruning inherited realization from former ancestor",
        );
        self
          .store
          .delete_realization(row.realization_id)
          .await
          .map_err(collaborator)?;
      }
    }
    Ok(())
  }
}

/// The realization a row ultimately derives from: the row itself when it is
/// direct, its recorded source otherwise.
fn source_of(row: &Realization, capability_name: &str) -> Option<InheritanceSource> {
  match row.origin {
    RealizationOrigin::Direct => Some(InheritanceSource {
      realization_id:  row.realization_id,
      capability_id:   row.capability_id,
      capability_name: capability_name.to_owned(),
      component_id:    row.component_id,
      component_name:  row.component_name.clone(),
      linked_at:       row.linked_at,
    }),
    RealizationOrigin::Inherited => {
      let (Some(realization_id), Some(capability_id)) =
        (row.source_realization_id, row.source_capability_id)
      else {
        warn!(realization_id = %row.realization_id, "inherited realization without a source; skipping");
        return None;
      };
      Some(InheritanceSource {
        realization_id,
        capability_id,
        capability_name: row.source_capability_name.clone().unwrap_or_default(),
        component_id: row.component_id,
        component_name: row.component_name.clone(),
        linked_at: row.linked_at,
      })
    }
  }
}

impl<S> Projector for RealizationInheritancePropagator<S>
where
  S: HierarchyIndex + RealizationStore,
{
  async fn project(&self, event: &CapabilityEvent) -> Result<()> {
    match event {
      CapabilityEvent::SystemLinkedToCapability(e) => self.on_system_linked(e).await,
      CapabilityEvent::SystemRealizationUpdated(e) => {
        self
          .on_realization_updated(e.id, e.realization_level, e.notes.clone())
          .await
      }
      CapabilityEvent::SystemRealizationDeleted(e) => self.on_realization_deleted(e.id).await,
      CapabilityEvent::CapabilityParentChanged(e) => {
        self.on_capability_parent_changed(e.id, e.new_parent_id).await
      }
      CapabilityEvent::CapabilityDeleted(e) => self.on_capability_deleted(e.id).await,
      CapabilityEvent::CapabilityUpdated(e) => {
        self.on_capability_renamed(e.id, e.name.clone()).await
      }
      CapabilityEvent::ApplicationComponentUpdated(e) => {
        self.on_component_renamed(e.id, e.name.clone()).await
      }
      CapabilityEvent::ApplicationComponentDeleted(e) => {
        self.on_component_deleted(e.id).await
      }
      _ => Ok(()),
    }
  }
}
