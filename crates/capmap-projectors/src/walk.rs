//! Hierarchy walks shared by the propagators.
//!
//! The hierarchy is assumed to be a tree, but every walk keeps a visited set
//! so a malformed parent chain ends the walk instead of looping forever.

use std::collections::HashSet;

use capmap_core::{capability::CapabilityNode, store::HierarchyIndex};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, collaborator};

/// Every capability below `root_id`, parents before their children. The root
/// itself is not included.
///
/// The result is a snapshot: a child added while the walk runs may be
/// missed and is left to its own creation event.
pub async fn collect_subtree_ids<S>(index: &S, root_id: Uuid) -> Result<Vec<Uuid>>
where
  S: HierarchyIndex,
{
  let mut visited = HashSet::from([root_id]);
  let mut stack = vec![root_id];
  let mut subtree = Vec::new();

  while let Some(parent_id) = stack.pop() {
    let children = index.get_children(parent_id).await.map_err(collaborator)?;
    for child_id in children {
      if !visited.insert(child_id) {
        warn!(%child_id, %parent_id, "capability revisited during subtree walk; skipping");
        continue;
      }
      subtree.push(child_id);
      stack.push(child_id);
    }
  }

  Ok(subtree)
}

/// `start_id` followed by each of its ancestors, nearest first.
///
/// Stops at the root, at the first capability the index does not know, or
/// when the parent chain loops back on itself.
pub async fn self_and_ancestors<S>(
  index: &S,
  start_id: Uuid,
) -> Result<Vec<CapabilityNode>>
where
  S: HierarchyIndex,
{
  let mut visited = HashSet::new();
  let mut chain = Vec::new();
  let mut current = Some(start_id);

  while let Some(capability_id) = current {
    if !visited.insert(capability_id) {
      warn!(%capability_id, %start_id, "cycle in parent chain; stopping ancestor walk");
      break;
    }
    let Some(node) = index.get_by_id(capability_id).await.map_err(collaborator)? else {
      break;
    };
    current = node.parent_id;
    chain.push(node);
  }

  Ok(chain)
}

/// The nearest capability at or above `capability_id` that is either L1 or
/// has no parent. `None` if `capability_id` itself is unknown.
pub async fn nearest_l1_ancestor<S>(index: &S, capability_id: Uuid) -> Result<Option<Uuid>>
where
  S: HierarchyIndex,
{
  let chain = self_and_ancestors(index, capability_id).await?;
  let found = chain
    .iter()
    .find(|node| node.level.is_root() || node.parent_id.is_none())
    .or(chain.last())
    .map(|node| node.capability_id);
  Ok(found)
}
