// src/entity/slot.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotRole {
    #[default]
    Primary,
    Secondary,
}

impl std::fmt::Display for SlotRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotRole::Primary => write!(f, "primary"),
            SlotRole::Secondary => write!(f, "secondary"),
        }
    }
}

impl std::str::FromStr for SlotRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(SlotRole::Primary),
            "secondary" => Ok(SlotRole::Secondary),
            _ => Err(format!("Invalid slot role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    #[default]
    Pending,
    Confirmed,
    Available,
    Removed,
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotStatus::Pending => write!(f, "Pending"),
            SlotStatus::Confirmed => write!(f, "Confirmed"),
            SlotStatus::Available => write!(f, "Available"),
            SlotStatus::Removed => write!(f, "Removed"),
        }
    }
}

impl std::str::FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SlotStatus::Pending),
            "confirmed" => Ok(SlotStatus::Confirmed),
            "available" => Ok(SlotStatus::Available),
            "removed" => Ok(SlotStatus::Removed),
            _ => Err(format!("Invalid slot status: {}", s)),
        }
    }
}

/// Deliverable-tracking sub-record attached to a slot. All fields are
/// independently defaulted; history belongs to the slot, not the
/// creator, so a swap preserves it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Deliverables {
    pub briefing_done: bool,
    pub visit_scheduled: Option<NaiveDate>,
    pub posting_date: Option<NaiveDate>,
    pub approved: bool,
    pub published: bool,
    #[serde(default)]
    pub content_links: Vec<String>,
}

/// The assignment of one creator to one campaign. A `None` creator id
/// represents an empty but reserved slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorSlot {
    pub id: Uuid,
    pub org_id: String,
    pub campaign_id: Uuid,
    pub creator_id: Option<String>,
    /// Display name denormalized for listings and audit detail.
    pub creator_name: Option<String>,
    pub role: SlotRole,
    pub status: SlotStatus,
    pub deliverables: Deliverables,
    pub created_at: DateTime<Utc>,
}

impl CreatorSlot {
    pub fn new(
        org_id: String,
        campaign_id: Uuid,
        creator_id: Option<String>,
        creator_name: Option<String>,
        role: SlotRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            campaign_id,
            creator_id,
            creator_name,
            role,
            status: SlotStatus::default(),
            deliverables: Deliverables::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creator_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_is_pending_with_zeroed_deliverables() {
        let s = CreatorSlot::new(
            "default".into(),
            Uuid::new_v4(),
            Some("crt_1".into()),
            Some("Ana Silva".into()),
            SlotRole::Primary,
        );
        assert_eq!(s.status, SlotStatus::Pending);
        assert!(!s.deliverables.briefing_done);
        assert!(s.deliverables.content_links.is_empty());
        assert!(!s.is_empty());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for st in [
            SlotStatus::Pending,
            SlotStatus::Confirmed,
            SlotStatus::Available,
            SlotStatus::Removed,
        ] {
            assert_eq!(st.to_string().parse::<SlotStatus>().unwrap(), st);
        }
    }
}
