// src/entity/campaign.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::month::MonthToken;

/// One marketing effort for a business in one calendar month.
///
/// At most one campaign may exist per (org, business, month); the month
/// is always the canonical token, never raw caller input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub org_id: String,
    pub business_id: String,
    pub month: MonthToken,
    pub title: String,
    /// Free-form descriptive status, not a state machine.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(org_id: String, business_id: String, month: MonthToken, title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            business_id,
            month,
            title,
            status: "Planned".to_string(),
            created_at: Utc::now(),
        }
    }
}
