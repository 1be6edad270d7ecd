use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::entity::{
    AuditLogEntry, Business, Campaign, CreatorSlot, Deliverables, SlotStatus, Stage,
};
use crate::error::{FunilError, Result};
use crate::month::MonthToken;
use crate::resolver::IdKind;

const CRM_DB: &str = "crm.db";

/// Authoritative relational store. Uniqueness invariants (one campaign
/// per business/month, one identifier per normalized name) are enforced
/// here with SQL constraints, not only by lookup-then-create checks.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database under the workspace data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let conn = Connection::open(data_dir.join(CRM_DB))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory database, used by engine and store tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS businesses (
                id TEXT NOT NULL,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                stage TEXT NOT NULL,
                stage_since TEXT NOT NULL,
                estimated_value REAL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                PRIMARY KEY (org_id, id)
            );

            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                business_id TEXT NOT NULL,
                month TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(org_id, business_id, month)
            );

            CREATE TABLE IF NOT EXISTS campaign_creator_slots (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                campaign_id TEXT NOT NULL,
                creator_id TEXT,
                creator_name TEXT,
                role TEXT NOT NULL,
                status TEXT NOT NULL,
                briefing_done INTEGER NOT NULL DEFAULT 0,
                visit_scheduled TEXT,
                posting_date TEXT,
                approved INTEGER NOT NULL DEFAULT 0,
                published INTEGER NOT NULL DEFAULT 0,
                content_links TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_slots_campaign
                ON campaign_creator_slots(campaign_id);

            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                ts TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                action TEXT NOT NULL,
                actor TEXT,
                old_value TEXT,
                new_value TEXT,
                detail TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_entity
                ON audit_log(entity_id);

            CREATE TABLE IF NOT EXISTS identifier_mappings (
                kind TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (kind, normalized_name)
            );
            ",
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Businesses
    // ------------------------------------------------------------------

    /// Insert a business. Returns false if the id already exists
    /// (repeat intake of a known name is a no-op).
    pub fn insert_business(&self, b: &Business) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO businesses
             (id, org_id, name, stage, stage_since, estimated_value, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                b.id,
                b.org_id,
                b.name,
                b.stage.to_string(),
                b.stage_since.to_rfc3339(),
                b.estimated_value,
                b.active as i64,
                b.created_at.to_rfc3339(),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn get_business(&self, org_id: &str, id: &str) -> Result<Option<Business>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, org_id, name, stage, stage_since, estimated_value, active, created_at
                 FROM businesses WHERE org_id = ?1 AND id = ?2",
                params![org_id, id],
                business_raw,
            )
            .optional()?;
        raw.map(business_from_raw).transpose()
    }

    pub fn list_businesses(&self, org_id: &str, include_terminal: bool) -> Result<Vec<Business>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, org_id, name, stage, stage_since, estimated_value, active, created_at
             FROM businesses WHERE org_id = ?1 AND active = 1
             ORDER BY created_at",
        )?;
        let raws = stmt
            .query_map(params![org_id], business_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut businesses = Vec::with_capacity(raws.len());
        for raw in raws {
            let b = business_from_raw(raw)?;
            if include_terminal || !b.stage.is_terminal() {
                businesses.push(b);
            }
        }
        Ok(businesses)
    }

    pub fn update_business_stage(
        &self,
        org_id: &str,
        id: &str,
        stage: Stage,
        since: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE businesses SET stage = ?1, stage_since = ?2
             WHERE org_id = ?3 AND id = ?4",
            params![stage.to_string(), since.to_rfc3339(), org_id, id],
        )?;
        if changed == 0 {
            return Err(FunilError::NotFound(format!("business {}", id)));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Campaigns
    // ------------------------------------------------------------------

    /// Insert a campaign; a uniqueness conflict on (org, business,
    /// month) is silently skipped. Returns whether a row was inserted.
    pub fn insert_campaign(&self, c: &Campaign) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO campaigns (id, org_id, business_id, month, title, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(org_id, business_id, month) DO NOTHING",
            params![
                c.id.to_string(),
                c.org_id,
                c.business_id,
                c.month.as_str(),
                c.title,
                c.status,
                c.created_at.to_rfc3339(),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn find_campaign(
        &self,
        org_id: &str,
        business_id: &str,
        month: &MonthToken,
    ) -> Result<Option<Campaign>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, org_id, business_id, month, title, status, created_at
                 FROM campaigns WHERE org_id = ?1 AND business_id = ?2 AND month = ?3",
                params![org_id, business_id, month.as_str()],
                campaign_raw,
            )
            .optional()?;
        raw.map(campaign_from_raw).transpose()
    }

    // ------------------------------------------------------------------
    // Creator slots
    // ------------------------------------------------------------------

    /// Guarded insert: creates the slot only if no non-removed slot
    /// already binds this (campaign, creator) pair. A single statement,
    /// so concurrent adds cannot both pass the existence check.
    pub fn insert_slot_if_absent(&self, s: &CreatorSlot) -> Result<bool> {
        let links = serde_json::to_string(&s.deliverables.content_links)?;
        let changed = self.conn.execute(
            "INSERT INTO campaign_creator_slots
             (id, org_id, campaign_id, creator_id, creator_name, role, status,
              briefing_done, visit_scheduled, posting_date, approved, published,
              content_links, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14
             WHERE ?4 IS NULL OR NOT EXISTS (
                 SELECT 1 FROM campaign_creator_slots
                 WHERE campaign_id = ?3 AND creator_id = ?4 AND status != 'Removed'
             )",
            params![
                s.id.to_string(),
                s.org_id,
                s.campaign_id.to_string(),
                s.creator_id,
                s.creator_name,
                s.role.to_string(),
                s.status.to_string(),
                s.deliverables.briefing_done as i64,
                s.deliverables.visit_scheduled.map(|d| d.to_string()),
                s.deliverables.posting_date.map(|d| d.to_string()),
                s.deliverables.approved as i64,
                s.deliverables.published as i64,
                links,
                s.created_at.to_rfc3339(),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn find_active_slot(
        &self,
        campaign_id: &Uuid,
        creator_id: &str,
    ) -> Result<Option<CreatorSlot>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE campaign_id = ?1 AND creator_id = ?2 AND status != 'Removed'",
                    SLOT_SELECT
                ),
                params![campaign_id.to_string(), creator_id],
                slot_raw,
            )
            .optional()?;
        raw.map(slot_from_raw).transpose()
    }

    /// Non-removed slots for a campaign, oldest first.
    pub fn list_active_slots(&self, campaign_id: &Uuid) -> Result<Vec<CreatorSlot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE campaign_id = ?1 AND status != 'Removed' ORDER BY created_at, rowid",
            SLOT_SELECT
        ))?;
        let raws = stmt
            .query_map(params![campaign_id.to_string()], slot_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(slot_from_raw).collect()
    }

    /// Replace the creator bound to a slot in place, preserving the slot
    /// row and its deliverable history.
    pub fn set_slot_creator(
        &self,
        slot_id: &Uuid,
        creator_id: &str,
        creator_name: &str,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE campaign_creator_slots SET creator_id = ?1, creator_name = ?2
             WHERE id = ?3",
            params![creator_id, creator_name, slot_id.to_string()],
        )?;
        if changed == 0 {
            return Err(FunilError::NotFound(format!("slot {}", slot_id)));
        }
        Ok(())
    }

    /// Soft delete: mark the slot Removed, never drop the row.
    pub fn set_slot_status(&self, slot_id: &Uuid, status: SlotStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE campaign_creator_slots SET status = ?1 WHERE id = ?2",
            params![status.to_string(), slot_id.to_string()],
        )?;
        if changed == 0 {
            return Err(FunilError::NotFound(format!("slot {}", slot_id)));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audit log
    // ------------------------------------------------------------------

    /// Append one immutable audit row. There is deliberately no update
    /// or delete path for this table.
    pub fn append_audit(&self, e: &AuditLogEntry) -> Result<()> {
        let detail = e
            .detail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO audit_log
             (id, org_id, ts, entity_type, entity_id, action, actor, old_value, new_value, detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                e.id.to_string(),
                e.org_id,
                e.ts.to_rfc3339(),
                e.entity_type.to_string(),
                e.entity_id,
                e.action.to_string(),
                e.actor,
                e.old_value,
                e.new_value,
                detail,
            ],
        )?;
        Ok(())
    }

    pub fn list_audit(&self, org_id: &str, entity_id: Option<&str>) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, org_id, ts, entity_type, entity_id, action, actor, old_value, new_value, detail
             FROM audit_log
             WHERE org_id = ?1 AND (?2 IS NULL OR entity_id = ?2)
             ORDER BY ts, rowid",
        )?;
        let raws = stmt
            .query_map(params![org_id, entity_id], audit_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(audit_from_raw).collect()
    }

    // ------------------------------------------------------------------
    // Identifier mappings
    // ------------------------------------------------------------------

    /// Look up a mapping, returning the identifier and the display name
    /// as stored at first sight (original casing).
    pub fn find_mapping(&self, kind: IdKind, normalized_name: &str) -> Result<Option<(String, String)>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, display_name FROM identifier_mappings
                 WHERE kind = ?1 AND normalized_name = ?2",
                params![kind.to_string(), normalized_name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// Insert a mapping; on a first-sight race the loser's insert is a
    /// no-op and the winner's row is returned to every caller.
    pub fn insert_mapping_or_fetch(
        &self,
        kind: IdKind,
        normalized_name: &str,
        id: &str,
        display_name: &str,
    ) -> Result<(String, String)> {
        self.conn.execute(
            "INSERT INTO identifier_mappings (kind, normalized_name, id, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(kind, normalized_name) DO NOTHING",
            params![
                kind.to_string(),
                normalized_name,
                id,
                display_name,
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.find_mapping(kind, normalized_name)?.ok_or_else(|| {
            FunilError::Conflict(format!(
                "identifier mapping for {} '{}' lost a race and could not be re-read",
                kind, normalized_name
            ))
        })
    }

    /// Test hook: run raw DDL against the open connection.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

const SLOT_SELECT: &str = "SELECT id, org_id, campaign_id, creator_id, creator_name, role, status,
        briefing_done, visit_scheduled, posting_date, approved, published, content_links, created_at
 FROM campaign_creator_slots";

// ----------------------------------------------------------------------
// Row conversion. Raw tuples come out of rusqlite closures; parsing into
// typed records happens outside so chrono/uuid errors map into
// FunilError rather than rusqlite::Error.
// ----------------------------------------------------------------------

type BusinessRaw = (String, String, String, String, String, Option<f64>, i64, String);

fn business_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<BusinessRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn business_from_raw(raw: BusinessRaw) -> Result<Business> {
    let (id, org_id, name, stage, stage_since, estimated_value, active, created_at) = raw;
    Ok(Business {
        id,
        org_id,
        name,
        stage: stage.parse().map_err(FunilError::Storage)?,
        stage_since: parse_ts(&stage_since)?,
        estimated_value,
        active: active != 0,
        created_at: parse_ts(&created_at)?,
    })
}

type CampaignRaw = (String, String, String, String, String, String, String);

fn campaign_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn campaign_from_raw(raw: CampaignRaw) -> Result<Campaign> {
    let (id, org_id, business_id, month, title, status, created_at) = raw;
    Ok(Campaign {
        id: parse_uuid(&id)?,
        org_id,
        business_id,
        month: MonthToken::from(month),
        title,
        status,
        created_at: parse_ts(&created_at)?,
    })
}

type SlotRaw = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    i64,
    i64,
    Option<String>,
    String,
);

fn slot_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlotRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
    ))
}

fn slot_from_raw(raw: SlotRaw) -> Result<CreatorSlot> {
    let (
        id,
        org_id,
        campaign_id,
        creator_id,
        creator_name,
        role,
        status,
        briefing_done,
        visit_scheduled,
        posting_date,
        approved,
        published,
        content_links,
        created_at,
    ) = raw;
    let content_links = match content_links {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };
    Ok(CreatorSlot {
        id: parse_uuid(&id)?,
        org_id,
        campaign_id: parse_uuid(&campaign_id)?,
        creator_id,
        creator_name,
        role: role.parse().map_err(FunilError::Storage)?,
        status: status.parse().map_err(FunilError::Storage)?,
        deliverables: Deliverables {
            briefing_done: briefing_done != 0,
            visit_scheduled: parse_date(visit_scheduled)?,
            posting_date: parse_date(posting_date)?,
            approved: approved != 0,
            published: published != 0,
            content_links,
        },
        created_at: parse_ts(&created_at)?,
    })
}

type AuditRaw = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn audit_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn audit_from_raw(raw: AuditRaw) -> Result<AuditLogEntry> {
    let (id, org_id, ts, entity_type, entity_id, action, actor, old_value, new_value, detail) = raw;
    Ok(AuditLogEntry {
        id: parse_uuid(&id)?,
        org_id,
        ts: parse_ts(&ts)?,
        entity_type: entity_type.parse().map_err(FunilError::Storage)?,
        entity_id,
        action: action.parse().map_err(FunilError::Storage)?,
        actor,
        old_value,
        new_value,
        detail: detail.map(|d| serde_json::from_str(&d)).transpose()?,
    })
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| FunilError::Storage(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| FunilError::Storage(format!("bad uuid '{}': {}", s, e)))
}

fn parse_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| FunilError::Storage(format!("bad date '{}': {}", s, e)))
    })
    .transpose()
}

impl From<rusqlite::Error> for FunilError {
    fn from(e: rusqlite::Error) -> Self {
        FunilError::Storage(format!("SQLite error: {}", e))
    }
}
