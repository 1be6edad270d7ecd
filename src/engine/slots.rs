// src/engine/slots.rs
use serde::Serialize;
use uuid::Uuid;

use super::Engine;
use crate::entity::{
    AuditAction, AuditLogEntry, CreatorSlot, EntityKind, SlotRole, SlotStatus,
};
use crate::error::{FunilError, Result};
use crate::resolver::IdKind;

/// Result of a slot mutation. `remaining` is populated by remove only.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub slot_id: Uuid,
    pub campaign_id: Uuid,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<usize>,
}

impl SlotView {
    fn from_slot(slot: &CreatorSlot) -> Self {
        Self {
            slot_id: slot.id,
            campaign_id: slot.campaign_id,
            creator_id: slot.creator_id.clone(),
            creator_name: slot.creator_name.clone(),
            remaining: None,
        }
    }
}

impl Engine {
    /// Assign a creator to the campaign. Idempotent: if a non-removed
    /// slot already binds this (campaign, creator) pair, it is returned
    /// unchanged and no audit entry is written.
    pub fn add_creator(
        &mut self,
        business_name: &str,
        month_input: &str,
        creator_name: &str,
        actor: Option<&str>,
    ) -> Result<SlotView> {
        let (_, campaign) = self.locate_campaign(business_name, month_input)?;
        let creator = self
            .resolver
            .resolve(&self.store, IdKind::Creator, creator_name)?;

        if let Some(existing) = self.store.find_active_slot(&campaign.id, &creator.id)? {
            return Ok(SlotView::from_slot(&existing));
        }

        let role = if self.store.list_active_slots(&campaign.id)?.is_empty() {
            SlotRole::Primary
        } else {
            SlotRole::Secondary
        };
        let slot = CreatorSlot::new(
            self.org.clone(),
            campaign.id,
            Some(creator.id.clone()),
            Some(creator.display_name.clone()),
            role,
        );

        if !self.store.insert_slot_if_absent(&slot)? {
            // A concurrent add won; return its slot.
            return self
                .store
                .find_active_slot(&campaign.id, &creator.id)?
                .map(|s| SlotView::from_slot(&s))
                .ok_or_else(|| {
                    FunilError::Conflict(format!(
                        "slot for creator '{}' raced and could not be re-read",
                        creator.display_name
                    ))
                });
        }

        self.audit(
            AuditLogEntry::new(
                self.org.clone(),
                EntityKind::Slot,
                slot.id.to_string(),
                AuditAction::Create,
            )
            .actor(actor.map(str::to_string))
            .values(None, Some(creator.display_name.clone()))
            .detail(serde_json::json!({
                "campaign_id": campaign.id,
                "creator_id": creator.id,
                "role": slot.role.to_string(),
            })),
        );

        Ok(SlotView::from_slot(&slot))
    }

    /// Replace one creator with another on the same slot row, preserving
    /// the slot identifier and its deliverable history. Free trades are
    /// allowed: the new creator may already hold another slot in the
    /// same campaign.
    pub fn swap_creator(
        &mut self,
        business_name: &str,
        month_input: &str,
        old_creator_name: &str,
        new_creator_name: &str,
        actor: Option<&str>,
    ) -> Result<SlotView> {
        let (_, campaign) = self.locate_campaign(business_name, month_input)?;
        let old = self
            .resolver
            .resolve(&self.store, IdKind::Creator, old_creator_name)?;
        let new = self
            .resolver
            .resolve(&self.store, IdKind::Creator, new_creator_name)?;

        let slot = self
            .store
            .find_active_slot(&campaign.id, &old.id)?
            .ok_or_else(|| {
                FunilError::NotFound(format!(
                    "no slot bound to '{}' in campaign {}",
                    old.display_name, campaign.id
                ))
            })?;

        self.store
            .set_slot_creator(&slot.id, &new.id, &new.display_name)?;

        self.audit(
            AuditLogEntry::new(
                self.org.clone(),
                EntityKind::Slot,
                slot.id.to_string(),
                AuditAction::Update,
            )
            .actor(actor.map(str::to_string))
            .values(Some(old.display_name.clone()), Some(new.display_name.clone()))
            .detail(serde_json::json!({
                "campaign_id": campaign.id,
                "old_creator_id": old.id,
                "new_creator_id": new.id,
            })),
        );

        Ok(SlotView {
            slot_id: slot.id,
            campaign_id: campaign.id,
            creator_id: Some(new.id),
            creator_name: Some(new.display_name),
            remaining: None,
        })
    }

    /// Soft-remove a slot from the campaign. The campaign must retain at
    /// least one non-removed slot; the call that would drop it to zero
    /// fails and leaves state unchanged. When no creator is named, an
    /// empty slot is preferred, then the most recently added one.
    pub fn remove_creator(
        &mut self,
        business_name: &str,
        month_input: &str,
        creator_name: Option<&str>,
        actor: Option<&str>,
    ) -> Result<SlotView> {
        let (_, campaign) = self.locate_campaign(business_name, month_input)?;
        let active = self.store.list_active_slots(&campaign.id)?;

        if active.is_empty() {
            return Err(FunilError::NotFound(format!(
                "campaign {} has no active slots",
                campaign.id
            )));
        }
        if active.len() == 1 {
            return Err(FunilError::InvariantViolation(format!(
                "campaign {} would be left without slots",
                campaign.id
            )));
        }

        let slot = match creator_name {
            Some(name) => {
                let creator = self.resolver.resolve(&self.store, IdKind::Creator, name)?;
                active
                    .iter()
                    .find(|s| s.creator_id.as_deref() == Some(creator.id.as_str()))
                    .ok_or_else(|| {
                        FunilError::NotFound(format!(
                            "no slot bound to '{}' in campaign {}",
                            creator.display_name, campaign.id
                        ))
                    })?
            }
            // Selection policy: empty slot first, else the newest.
            None => active
                .iter()
                .find(|s| s.is_empty())
                .unwrap_or_else(|| active.last().expect("non-empty checked above")),
        };

        self.store.set_slot_status(&slot.id, SlotStatus::Removed)?;
        let remaining = active.len() - 1;

        self.audit(
            AuditLogEntry::new(
                self.org.clone(),
                EntityKind::Slot,
                slot.id.to_string(),
                AuditAction::Delete,
            )
            .actor(actor.map(str::to_string))
            .values(slot.creator_name.clone(), None)
            .detail(serde_json::json!({
                "campaign_id": campaign.id,
                "creator_id": slot.creator_id,
                "remaining_slots": remaining,
            })),
        );

        Ok(SlotView {
            slot_id: slot.id,
            campaign_id: campaign.id,
            creator_id: slot.creator_id.clone(),
            creator_name: slot.creator_name.clone(),
            remaining: Some(remaining),
        })
    }
}
