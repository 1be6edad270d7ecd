// src/entity/business.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sales pipeline stages. Ordered progression is the common path, but
/// any-to-any transitions are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    ColdOwnLead,
    WarmOwnLead,
    ReferredLead,
    ProposalSent,
    MeetingScheduled,
    MeetingHeld,
    FollowUp,
    ContractSigned,
    Declined,
}

impl Stage {
    /// Terminal stages drop out of the active-pipeline Kanban view but
    /// stay queryable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::ContractSigned | Stage::Declined)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ColdOwnLead => write!(f, "Cold Own Lead"),
            Stage::WarmOwnLead => write!(f, "Warm Own Lead"),
            Stage::ReferredLead => write!(f, "Referred Lead"),
            Stage::ProposalSent => write!(f, "Proposal Sent"),
            Stage::MeetingScheduled => write!(f, "Meeting Scheduled"),
            Stage::MeetingHeld => write!(f, "Meeting Held"),
            Stage::FollowUp => write!(f, "Follow Up"),
            Stage::ContractSigned => write!(f, "Contract Signed"),
            Stage::Declined => write!(f, "Declined"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "cold own lead" | "cold" => Ok(Stage::ColdOwnLead),
            "warm own lead" | "warm" => Ok(Stage::WarmOwnLead),
            "referred lead" | "referred" => Ok(Stage::ReferredLead),
            "proposal sent" | "proposal" => Ok(Stage::ProposalSent),
            "meeting scheduled" => Ok(Stage::MeetingScheduled),
            "meeting held" => Ok(Stage::MeetingHeld),
            "follow up" | "followup" => Ok(Stage::FollowUp),
            "contract signed" | "signed" => Ok(Stage::ContractSigned),
            "declined" => Ok(Stage::Declined),
            _ => Err(format!("Invalid stage: {}", s)),
        }
    }
}

/// A prospective or active client account moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub stage: Stage,
    /// When the current stage began. Equals `created_at` until the first
    /// transition, then the time of the most recent transition.
    pub stage_since: DateTime<Utc>,
    pub estimated_value: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Business {
    pub fn new(id: String, org_id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            org_id,
            name,
            stage: Stage::default(),
            stage_since: now,
            estimated_value: None,
            active: true,
            created_at: now,
        }
    }
}
