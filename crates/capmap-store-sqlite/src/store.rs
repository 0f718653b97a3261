//! [`SqliteStore`]: the SQLite implementation of every collaborator and
//! effective-view trait in `capmap_core::store`.

use std::path::Path;

use capmap_core::{
  capability::{CapabilityLevel, CapabilityNode},
  domain::EffectiveBusinessDomain,
  importance::{EffectiveImportance, ExplicitImportance, StrategyPillar},
  realization::{Realization, RealizationLevel, RealizationOrigin},
  store::{
    Backend, BusinessDomainNameProvider, DomainAssignmentChecker, EffectiveBusinessDomainStore,
    EffectiveImportanceStore, FactStore, HierarchyIndex, ImportanceRatings, RealizationStore,
    StrategyPillarsGateway,
  },
};
use rusqlite::{OptionalExtension as _, Row, params_from_iter, types::Value};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawCapability, RawEffectiveDomain, RawEffectiveImportance, RawPillar, RawRating,
    RawRealization, decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

type RowFn<R> = fn(&Row<'_>) -> rusqlite::Result<R>;

fn uuid_value(id: Uuid) -> Value { Value::Text(encode_uuid(id)) }

fn opt_uuid_value(id: Option<Uuid>) -> Value { id.map_or(Value::Null, uuid_value) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// The capability map's facts and effective views in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query<R>(&self, sql: String, params: Vec<Value>, from_row: RowFn<R>) -> Result<Vec<R>>
  where
    R: Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn query_opt<R>(
    &self,
    sql: String,
    params: Vec<Value>,
    from_row: RowFn<R>,
  ) -> Result<Option<R>>
  where
    R: Send + 'static,
  {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params_from_iter(params), from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  async fn query_realizations(
    &self,
    filter: &'static str,
    params: Vec<Value>,
  ) -> Result<Vec<Realization>> {
    let sql = format!(
      "SELECT {} FROM capability_realizations WHERE {filter} ORDER BY realization_id",
      RawRealization::COLUMNS,
    );
    self
      .query(sql, params, RawRealization::from_row)
      .await?
      .into_iter()
      .map(RawRealization::into_realization)
      .collect()
  }
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── Read collaborators ──────────────────────────────────────────────────────

impl HierarchyIndex for SqliteStore {
  async fn get_by_id(&self, capability_id: Uuid) -> Result<Option<CapabilityNode>> {
    let sql = format!(
      "SELECT {} FROM capabilities WHERE capability_id = ?1",
      RawCapability::COLUMNS,
    );
    self
      .query_opt(sql, vec![uuid_value(capability_id)], RawCapability::from_row)
      .await?
      .map(RawCapability::into_node)
      .transpose()
  }

  async fn get_children(&self, parent_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = self
      .query(
        "SELECT capability_id FROM capabilities WHERE parent_id = ?1 ORDER BY capability_id"
          .to_owned(),
        vec![uuid_value(parent_id)],
        |row| row.get::<_, String>(0),
      )
      .await?;
    ids.iter().map(|id| decode_uuid(id)).collect()
  }

  /// `UNION` rather than `UNION ALL`, so a cyclic parent chain terminates.
  async fn get_descendants(&self, capability_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = self
      .query(
        "WITH RECURSIVE subtree(id) AS (
           SELECT capability_id FROM capabilities WHERE parent_id = ?1
           UNION
           SELECT c.capability_id FROM capabilities c JOIN subtree s ON c.parent_id = s.id
         )
         SELECT id FROM subtree WHERE id != ?1"
          .to_owned(),
        vec![uuid_value(capability_id)],
        |row| row.get::<_, String>(0),
      )
      .await?;
    ids.iter().map(|id| decode_uuid(id)).collect()
  }
}

impl BusinessDomainNameProvider for SqliteStore {
  async fn get_business_domain_name(&self, business_domain_id: Uuid) -> Result<Option<String>> {
    self
      .query_opt(
        "SELECT name FROM business_domains WHERE business_domain_id = ?1".to_owned(),
        vec![uuid_value(business_domain_id)],
        |row| row.get(0),
      )
      .await
  }
}

impl DomainAssignmentChecker for SqliteStore {
  async fn assignment_exists(&self, business_domain_id: Uuid, capability_id: Uuid) -> Result<bool> {
    let found = self
      .query_opt(
        "SELECT 1 FROM domain_assignments
         WHERE business_domain_id = ?1 AND capability_id = ?2"
          .to_owned(),
        vec![uuid_value(business_domain_id), uuid_value(capability_id)],
        |_| Ok(()),
      )
      .await?;
    Ok(found.is_some())
  }
}

impl StrategyPillarsGateway for SqliteStore {
  async fn get_strategy_pillars(&self) -> Result<Vec<StrategyPillar>> {
    let sql = format!(
      "SELECT {} FROM strategy_pillars ORDER BY name, pillar_id",
      RawPillar::COLUMNS,
    );
    self
      .query(sql, Vec::new(), RawPillar::from_row)
      .await?
      .into_iter()
      .map(RawPillar::into_pillar)
      .collect()
  }

  async fn get_active_pillar(&self, pillar_id: Uuid) -> Result<Option<StrategyPillar>> {
    let sql = format!(
      "SELECT {} FROM strategy_pillars WHERE pillar_id = ?1 AND active = 1",
      RawPillar::COLUMNS,
    );
    self
      .query_opt(sql, vec![uuid_value(pillar_id)], RawPillar::from_row)
      .await?
      .map(RawPillar::into_pillar)
      .transpose()
  }
}

impl ImportanceRatings for SqliteStore {
  async fn get_explicit_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<Option<ExplicitImportance>> {
    let sql = format!(
      "SELECT {} FROM importance_ratings
       WHERE capability_id = ?1 AND pillar_id = ?2 AND business_domain_id = ?3",
      RawRating::COLUMNS,
    );
    self
      .query_opt(
        sql,
        vec![
          uuid_value(capability_id),
          uuid_value(pillar_id),
          uuid_value(business_domain_id),
        ],
        RawRating::from_row,
      )
      .await?
      .map(RawRating::into_rating)
      .transpose()
  }
}

// ─── Effective stores ────────────────────────────────────────────────────────

impl EffectiveBusinessDomainStore for SqliteStore {
  async fn get_effective_domain(&self, capability_id: Uuid) -> Result<Option<EffectiveBusinessDomain>> {
    let sql = format!(
      "SELECT {} FROM effective_business_domains WHERE capability_id = ?1",
      RawEffectiveDomain::COLUMNS,
    );
    self
      .query_opt(sql, vec![uuid_value(capability_id)], RawEffectiveDomain::from_row)
      .await?
      .map(RawEffectiveDomain::into_row)
      .transpose()
  }

  async fn upsert_effective_domain(&self, row: EffectiveBusinessDomain) -> Result<()> {
    self
      .execute(
        "INSERT INTO effective_business_domains (
           capability_id, l1_capability_id, business_domain_id, business_domain_name
         ) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (capability_id) DO UPDATE SET
           l1_capability_id     = excluded.l1_capability_id,
           business_domain_id   = excluded.business_domain_id,
           business_domain_name = excluded.business_domain_name",
        vec![
          uuid_value(row.capability_id),
          uuid_value(row.l1_capability_id),
          opt_uuid_value(row.business_domain_id),
          row.business_domain_name.into(),
        ],
      )
      .await
  }

  async fn delete_effective_domain(&self, capability_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM effective_business_domains WHERE capability_id = ?1",
        vec![uuid_value(capability_id)],
      )
      .await
  }

  async fn update_business_domain_for_l1_subtree(
    &self,
    l1_capability_id: Uuid,
    business_domain_id: Option<Uuid>,
    business_domain_name: Option<String>,
  ) -> Result<()> {
    self
      .execute(
        "UPDATE effective_business_domains
         SET business_domain_id = ?2, business_domain_name = ?3
         WHERE l1_capability_id = ?1",
        vec![
          uuid_value(l1_capability_id),
          opt_uuid_value(business_domain_id),
          business_domain_name.into(),
        ],
      )
      .await
  }

  async fn rename_business_domain(
    &self,
    business_domain_id: Uuid,
    business_domain_name: String,
  ) -> Result<()> {
    self
      .execute(
        "UPDATE effective_business_domains SET business_domain_name = ?2
         WHERE business_domain_id = ?1",
        vec![uuid_value(business_domain_id), business_domain_name.into()],
      )
      .await
  }
}

impl EffectiveImportanceStore for SqliteStore {
  async fn get_effective_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<Option<EffectiveImportance>> {
    let sql = format!(
      "SELECT {} FROM effective_importance
       WHERE capability_id = ?1 AND pillar_id = ?2 AND business_domain_id = ?3",
      RawEffectiveImportance::COLUMNS,
    );
    self
      .query_opt(
        sql,
        vec![
          uuid_value(capability_id),
          uuid_value(pillar_id),
          uuid_value(business_domain_id),
        ],
        RawEffectiveImportance::from_row,
      )
      .await?
      .map(RawEffectiveImportance::into_row)
      .transpose()
  }

  async fn list_effective_importance(&self, capability_id: Uuid) -> Result<Vec<EffectiveImportance>> {
    let sql = format!(
      "SELECT {} FROM effective_importance WHERE capability_id = ?1
       ORDER BY pillar_id, business_domain_id",
      RawEffectiveImportance::COLUMNS,
    );
    self
      .query(sql, vec![uuid_value(capability_id)], RawEffectiveImportance::from_row)
      .await?
      .into_iter()
      .map(RawEffectiveImportance::into_row)
      .collect()
  }

  async fn upsert_effective_importance(&self, row: EffectiveImportance) -> Result<()> {
    self
      .execute(
        "INSERT INTO effective_importance (
           capability_id, pillar_id, business_domain_id, importance, importance_label,
           source_capability_id, source_capability_name, is_inherited, rationale, computed_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT (capability_id, pillar_id, business_domain_id) DO UPDATE SET
           importance             = excluded.importance,
           importance_label       = excluded.importance_label,
           source_capability_id   = excluded.source_capability_id,
           source_capability_name = excluded.source_capability_name,
           is_inherited           = excluded.is_inherited,
           rationale              = excluded.rationale,
           computed_at            = excluded.computed_at",
        vec![
          uuid_value(row.capability_id),
          uuid_value(row.pillar_id),
          uuid_value(row.business_domain_id),
          row.importance.value().into(),
          row.importance_label.into(),
          uuid_value(row.source_capability_id),
          row.source_capability_name.into(),
          row.is_inherited.into(),
          row.rationale.into(),
          encode_dt(row.computed_at).into(),
        ],
      )
      .await
  }

  async fn delete_effective_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    self
      .execute(
        "DELETE FROM effective_importance
         WHERE capability_id = ?1 AND pillar_id = ?2 AND business_domain_id = ?3",
        vec![
          uuid_value(capability_id),
          uuid_value(pillar_id),
          uuid_value(business_domain_id),
        ],
      )
      .await
  }

  async fn delete_effective_importance_for_capability(&self, capability_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM effective_importance WHERE capability_id = ?1",
        vec![uuid_value(capability_id)],
      )
      .await
  }

  async fn delete_effective_importance_for_domain(
    &self,
    capability_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    self
      .execute(
        "DELETE FROM effective_importance
         WHERE capability_id = ?1 AND business_domain_id = ?2",
        vec![uuid_value(capability_id), uuid_value(business_domain_id)],
      )
      .await
  }

  async fn rename_importance_source(
    &self,
    source_capability_id: Uuid,
    source_capability_name: String,
  ) -> Result<()> {
    self
      .execute(
        "UPDATE effective_importance SET source_capability_name = ?2
         WHERE source_capability_id = ?1",
        vec![uuid_value(source_capability_id), source_capability_name.into()],
      )
      .await
  }
}

impl RealizationStore for SqliteStore {
  async fn upsert_realization(&self, row: Realization) -> Result<()> {
    self
      .execute(
        "INSERT INTO capability_realizations (
           realization_id, capability_id, component_id, component_name, realization_level,
           notes, origin, source_realization_id, source_capability_id, source_capability_name,
           linked_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT (realization_id) DO UPDATE SET
           capability_id          = excluded.capability_id,
           component_id           = excluded.component_id,
           component_name         = excluded.component_name,
           realization_level      = excluded.realization_level,
           notes                  = excluded.notes,
           origin                 = excluded.origin,
           source_realization_id  = excluded.source_realization_id,
           source_capability_id   = excluded.source_capability_id,
           source_capability_name = excluded.source_capability_name,
           linked_at              = excluded.linked_at",
        vec![
          uuid_value(row.realization_id),
          uuid_value(row.capability_id),
          uuid_value(row.component_id),
          row.component_name.into(),
          row.realization_level.to_string().into(),
          row.notes.into(),
          row.origin.to_string().into(),
          opt_uuid_value(row.source_realization_id),
          opt_uuid_value(row.source_capability_id),
          row.source_capability_name.into(),
          encode_dt(row.linked_at).into(),
        ],
      )
      .await
  }

  async fn get_realization(&self, realization_id: Uuid) -> Result<Option<Realization>> {
    let mut rows = self
      .query_realizations("realization_id = ?1", vec![uuid_value(realization_id)])
      .await?;
    Ok(rows.pop())
  }

  async fn list_realizations_for_capability(&self, capability_id: Uuid) -> Result<Vec<Realization>> {
    self
      .query_realizations("capability_id = ?1", vec![uuid_value(capability_id)])
      .await
  }

  async fn list_realizations_by_source(&self, source_realization_id: Uuid) -> Result<Vec<Realization>> {
    self
      .query_realizations(
        "source_realization_id = ?1",
        vec![uuid_value(source_realization_id)],
      )
      .await
  }

  async fn update_direct_realization(
    &self,
    realization_id: Uuid,
    realization_level: RealizationLevel,
    notes: Option<String>,
  ) -> Result<()> {
    self
      .execute(
        "UPDATE capability_realizations SET realization_level = ?2, notes = ?3
         WHERE realization_id = ?1 AND origin = ?4",
        vec![
          uuid_value(realization_id),
          realization_level.to_string().into(),
          notes.into(),
          RealizationOrigin::Direct.to_string().into(),
        ],
      )
      .await
  }

  async fn delete_realization(&self, realization_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM capability_realizations WHERE realization_id = ?1",
        vec![uuid_value(realization_id)],
      )
      .await
  }

  async fn delete_realizations_by_source(&self, source_realization_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM capability_realizations WHERE source_realization_id = ?1",
        vec![uuid_value(source_realization_id)],
      )
      .await
  }

  async fn delete_realizations_for_capability(&self, capability_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM capability_realizations WHERE capability_id = ?1",
        vec![uuid_value(capability_id)],
      )
      .await
  }

  async fn delete_realizations_for_component(&self, component_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM capability_realizations WHERE component_id = ?1",
        vec![uuid_value(component_id)],
      )
      .await
  }

  async fn rename_realization_source(
    &self,
    source_capability_id: Uuid,
    source_capability_name: String,
  ) -> Result<()> {
    self
      .execute(
        "UPDATE capability_realizations SET source_capability_name = ?2
         WHERE source_capability_id = ?1",
        vec![uuid_value(source_capability_id), source_capability_name.into()],
      )
      .await
  }

  async fn rename_component(&self, component_id: Uuid, component_name: String) -> Result<()> {
    self
      .execute(
        "UPDATE capability_realizations SET component_name = ?2 WHERE component_id = ?1",
        vec![uuid_value(component_id), component_name.into()],
      )
      .await
  }
}

// ─── Fact writes ─────────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  async fn upsert_capability(&self, node: CapabilityNode) -> Result<()> {
    self
      .execute(
        "INSERT INTO capabilities (capability_id, parent_id, level, name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (capability_id) DO UPDATE SET
           parent_id = excluded.parent_id,
           level     = excluded.level,
           name      = excluded.name",
        vec![
          uuid_value(node.capability_id),
          opt_uuid_value(node.parent_id),
          node.level.to_string().into(),
          node.name.into(),
        ],
      )
      .await
  }

  async fn rename_capability(&self, capability_id: Uuid, name: String) -> Result<()> {
    self
      .execute(
        "UPDATE capabilities SET name = ?2 WHERE capability_id = ?1",
        vec![uuid_value(capability_id), name.into()],
      )
      .await
  }

  async fn move_capability(
    &self,
    capability_id: Uuid,
    parent_id: Option<Uuid>,
    level: CapabilityLevel,
  ) -> Result<()> {
    self
      .execute(
        "UPDATE capabilities SET parent_id = ?2, level = ?3 WHERE capability_id = ?1",
        vec![
          uuid_value(capability_id),
          opt_uuid_value(parent_id),
          level.to_string().into(),
        ],
      )
      .await
  }

  async fn set_capability_level(&self, capability_id: Uuid, level: CapabilityLevel) -> Result<()> {
    self
      .execute(
        "UPDATE capabilities SET level = ?2 WHERE capability_id = ?1",
        vec![uuid_value(capability_id), level.to_string().into()],
      )
      .await
  }

  async fn delete_capability(&self, capability_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM capabilities WHERE capability_id = ?1",
        vec![uuid_value(capability_id)],
      )
      .await
  }

  async fn upsert_business_domain(&self, business_domain_id: Uuid, name: String) -> Result<()> {
    self
      .execute(
        "INSERT INTO business_domains (business_domain_id, name) VALUES (?1, ?2)
         ON CONFLICT (business_domain_id) DO UPDATE SET name = excluded.name",
        vec![uuid_value(business_domain_id), name.into()],
      )
      .await
  }

  async fn delete_business_domain(&self, business_domain_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM business_domains WHERE business_domain_id = ?1",
        vec![uuid_value(business_domain_id)],
      )
      .await
  }

  async fn insert_assignment(&self, business_domain_id: Uuid, capability_id: Uuid) -> Result<()> {
    self
      .execute(
        "INSERT OR IGNORE INTO domain_assignments (business_domain_id, capability_id)
         VALUES (?1, ?2)",
        vec![uuid_value(business_domain_id), uuid_value(capability_id)],
      )
      .await
  }

  async fn delete_assignment(&self, business_domain_id: Uuid, capability_id: Uuid) -> Result<()> {
    self
      .execute(
        "DELETE FROM domain_assignments WHERE business_domain_id = ?1 AND capability_id = ?2",
        vec![uuid_value(business_domain_id), uuid_value(capability_id)],
      )
      .await
  }

  async fn upsert_pillar(&self, pillar: StrategyPillar) -> Result<()> {
    self
      .execute(
        "INSERT INTO strategy_pillars (pillar_id, name, active) VALUES (?1, ?2, ?3)
         ON CONFLICT (pillar_id) DO UPDATE SET name = excluded.name, active = excluded.active",
        vec![uuid_value(pillar.pillar_id), pillar.name.into(), pillar.active.into()],
      )
      .await
  }

  async fn deactivate_pillar(&self, pillar_id: Uuid) -> Result<()> {
    self
      .execute(
        "UPDATE strategy_pillars SET active = 0 WHERE pillar_id = ?1",
        vec![uuid_value(pillar_id)],
      )
      .await
  }

  async fn upsert_explicit_importance(&self, rating: ExplicitImportance) -> Result<()> {
    self
      .execute(
        "INSERT INTO importance_ratings (
           capability_id, pillar_id, business_domain_id, importance, rationale, pillar_name
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (capability_id, pillar_id, business_domain_id) DO UPDATE SET
           importance  = excluded.importance,
           rationale   = excluded.rationale,
           pillar_name = excluded.pillar_name",
        vec![
          uuid_value(rating.capability_id),
          uuid_value(rating.pillar_id),
          uuid_value(rating.business_domain_id),
          rating.importance.value().into(),
          rating.rationale.into(),
          rating.pillar_name.into(),
        ],
      )
      .await
  }

  async fn delete_explicit_importance(
    &self,
    capability_id: Uuid,
    pillar_id: Uuid,
    business_domain_id: Uuid,
  ) -> Result<()> {
    self
      .execute(
        "DELETE FROM importance_ratings
         WHERE capability_id = ?1 AND pillar_id = ?2 AND business_domain_id = ?3",
        vec![
          uuid_value(capability_id),
          uuid_value(pillar_id),
          uuid_value(business_domain_id),
        ],
      )
      .await
  }
}
