// src/engine/stage.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Engine;
use crate::entity::{AuditAction, AuditLogEntry, EntityKind, Stage};
use crate::error::{FunilError, Result};

/// Result of a stage transition (or a same-stage no-op).
#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    pub business_id: String,
    pub stage: Stage,
    pub stage_since: DateTime<Utc>,
}

impl Engine {
    /// Move a business to a new pipeline stage, recording how long it
    /// dwelled in the previous one. Transitioning to the current stage
    /// is a no-op: state is returned unchanged and no audit entry is
    /// written.
    pub fn transition(
        &self,
        business_id: &str,
        new_stage: Stage,
        actor: Option<&str>,
    ) -> Result<StageView> {
        let business = self
            .store
            .get_business(&self.org, business_id)?
            .filter(|b| b.active)
            .ok_or_else(|| {
                FunilError::NotFound(format!("business {} (missing or inactive)", business_id))
            })?;

        if business.stage == new_stage {
            return Ok(StageView {
                business_id: business.id,
                stage: business.stage,
                stage_since: business.stage_since,
            });
        }

        let now = Utc::now();
        let elapsed = now - business.stage_since;
        self.store
            .update_business_stage(&self.org, business_id, new_stage, now)?;

        self.audit(
            AuditLogEntry::new(
                self.org.clone(),
                EntityKind::Business,
                business.id.clone(),
                AuditAction::Update,
            )
            .actor(actor.map(str::to_string))
            .values(
                Some(business.stage.to_string()),
                Some(new_stage.to_string()),
            )
            .detail(serde_json::json!({
                "elapsed_seconds": elapsed.num_seconds(),
                "elapsed_days": elapsed.num_days(),
            })),
        );

        Ok(StageView {
            business_id: business.id,
            stage: new_stage,
            stage_since: now,
        })
    }
}
