// src/engine/mod.rs
//
// The lifecycle engine: stage tracking, campaign allocation and creator
// slot management over one authoritative store. Every mutation audits;
// an audit write failure is logged and never rolls back the primary
// mutation, because the caller-visible action has already succeeded.

mod allocator;
mod slots;
mod stage;

pub use slots::SlotView;
pub use stage::StageView;

use std::collections::HashMap;
use std::path::Path;

use crate::entity::{AuditAction, AuditLogEntry, Business, EntityKind};
use crate::error::{FunilError, Result};
use crate::resolver::{IdKind, IdResolver, Resolved};
use crate::rowstore::JsonRowStore;
use crate::store::SqliteStore;

const FUNIL_DIR: &str = ".funil";
const SHEETS_FILE: &str = "sheets.json";

pub struct Engine {
    pub(crate) store: SqliteStore,
    pub(crate) resolver: IdResolver,
    pub(crate) org: String,
}

impl Engine {
    pub fn new(store: SqliteStore, resolver: IdResolver, org: &str) -> Self {
        Self {
            store,
            resolver,
            org: org.to_string(),
        }
    }

    /// Create the workspace data directory: SQLite database plus the
    /// legacy-sheet file seeded with header rows.
    pub fn init(root: &Path, org: &str) -> Result<Self> {
        let dir = root.join(FUNIL_DIR);
        if dir.exists() {
            return Err(FunilError::AlreadyInitialized);
        }
        std::fs::create_dir_all(&dir)?;

        let store = SqliteStore::open(&dir)?;
        let header = || vec![vec!["Id".to_string(), "Name".to_string()]];
        let seed: HashMap<String, Vec<Vec<String>>> = HashMap::from([
            (IdKind::Business.sheet().to_string(), header()),
            (IdKind::Creator.sheet().to_string(), header()),
        ]);
        let rows = JsonRowStore::create(&dir.join(SHEETS_FILE), seed)?;

        Ok(Self::new(store, IdResolver::new(Box::new(rows)), org))
    }

    /// Open an initialized workspace.
    pub fn open(root: &Path, org: &str) -> Result<Self> {
        let dir = root.join(FUNIL_DIR);
        if !dir.exists() {
            return Err(FunilError::NotInitialized);
        }
        let store = SqliteStore::open(&dir)?;
        let rows = JsonRowStore::open(&dir.join(SHEETS_FILE))?;
        Ok(Self::new(store, IdResolver::new(Box::new(rows)), org))
    }

    /// Sales intake: register the business in the legacy sheet, resolve
    /// its identifier and create the pipeline record in `Cold Own Lead`.
    /// Repeat intake of the same name returns the existing business.
    pub fn intake_business(
        &mut self,
        name: &str,
        estimated_value: Option<f64>,
        actor: Option<&str>,
    ) -> Result<Business> {
        self.resolver.ensure_row(IdKind::Business, name)?;
        let resolved = self.resolver.resolve(&self.store, IdKind::Business, name)?;

        if let Some(existing) = self.store.get_business(&self.org, &resolved.id)? {
            return Ok(existing);
        }

        let mut business = Business::new(
            resolved.id.clone(),
            self.org.clone(),
            resolved.display_name,
        );
        business.estimated_value = estimated_value;

        if self.store.insert_business(&business)? {
            self.audit(
                AuditLogEntry::new(
                    self.org.clone(),
                    EntityKind::Business,
                    business.id.clone(),
                    AuditAction::Create,
                )
                .actor(actor.map(str::to_string))
                .values(None, Some(business.name.clone()))
                .detail(serde_json::json!({
                    "stage": business.stage.to_string(),
                    "estimated_value": business.estimated_value,
                })),
            );
        }
        Ok(business)
    }

    /// Register a creator in the legacy sheet and mint its identifier.
    pub fn roster_creator(&mut self, name: &str) -> Result<Resolved> {
        self.resolver.ensure_row(IdKind::Creator, name)?;
        self.resolver.resolve(&self.store, IdKind::Creator, name)
    }

    /// Kanban listing; terminal stages excluded unless requested.
    pub fn list_businesses(&self, include_terminal: bool) -> Result<Vec<Business>> {
        self.store.list_businesses(&self.org, include_terminal)
    }

    pub fn list_audit(&self, entity_id: Option<&str>) -> Result<Vec<AuditLogEntry>> {
        self.store.list_audit(&self.org, entity_id)
    }

    /// Append an audit entry, logging failures instead of propagating
    /// them: the primary mutation already succeeded.
    pub(crate) fn audit(&self, entry: AuditLogEntry) {
        if let Err(e) = self.store.append_audit(&entry) {
            tracing::warn!(
                entity_type = %entry.entity_type,
                entity_id = %entry.entity_id,
                action = %entry.action,
                "audit append failed: {}",
                e
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::rowstore::MemoryRowStore;

    pub fn engine() -> Engine {
        let store = SqliteStore::open_in_memory().unwrap();
        let resolver = IdResolver::new(Box::new(MemoryRowStore::new()));
        Engine::new(store, resolver, "default")
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::engine;
    use crate::entity::{AuditAction, Stage};

    #[test]
    fn test_intake_creates_business_and_audits() {
        let mut engine = engine();
        let b = engine
            .intake_business("Loja Fashion", Some(12_000.0), Some("vera"))
            .unwrap();
        assert!(b.id.starts_with("biz_"));
        assert_eq!(b.stage, Stage::ColdOwnLead);
        assert_eq!(b.estimated_value, Some(12_000.0));

        let audit = engine.list_audit(Some(&b.id)).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::Create);
        assert_eq!(audit[0].actor.as_deref(), Some("vera"));
    }

    #[test]
    fn test_repeat_intake_is_idempotent() {
        let mut engine = engine();
        let first = engine.intake_business("Loja Fashion", None, None).unwrap();
        let second = engine.intake_business("loja fashion", None, None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(engine.list_audit(None).unwrap().len(), 1);
    }

    #[test]
    fn test_roster_creator_mints_stable_id() {
        let mut engine = engine();
        let first = engine.roster_creator("Ana Silva").unwrap();
        let second = engine.roster_creator("ANA SILVA").unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.id.starts_with("crt_"));
    }
}
