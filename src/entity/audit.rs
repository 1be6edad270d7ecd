// src/entity/audit.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Business,
    Campaign,
    Slot,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Business => write!(f, "business"),
            EntityKind::Campaign => write!(f, "campaign"),
            EntityKind::Slot => write!(f, "slot"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "business" => Ok(EntityKind::Business),
            "campaign" => Ok(EntityKind::Campaign),
            "slot" => Ok(EntityKind::Slot),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Create => write!(f, "create"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

/// Immutable record of one mutation. Written as the last step of every
/// successful mutation; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub org_id: String,
    pub ts: DateTime<Utc>,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub action: AuditAction,
    pub actor: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub detail: Option<serde_json::Value>,
}

impl AuditLogEntry {
    pub fn new(
        org_id: String,
        entity_type: EntityKind,
        entity_id: String,
        action: AuditAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            ts: Utc::now(),
            entity_type,
            entity_id,
            action,
            actor: None,
            old_value: None,
            new_value: None,
            detail: None,
        }
    }

    pub fn actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
