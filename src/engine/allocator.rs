// src/engine/allocator.rs
use super::Engine;
use crate::entity::{AuditAction, AuditLogEntry, Business, Campaign, EntityKind};
use crate::error::{FunilError, Result};
use crate::month::MonthToken;
use crate::resolver::IdKind;

impl Engine {
    /// Locate or create the campaign for (business, month). The month is
    /// normalized before any lookup, so equivalent inputs never fork
    /// campaigns; repeated allocation returns the existing campaign
    /// unchanged. A lost insert race re-reads and returns the winner.
    pub fn allocate(
        &mut self,
        business_name: &str,
        month_input: &str,
        title: Option<String>,
        actor: Option<&str>,
    ) -> Result<Campaign> {
        let business = self.resolve_active_business(business_name)?;
        let month = MonthToken::normalize(month_input)?;

        if let Some(existing) = self.store.find_campaign(&self.org, &business.id, &month)? {
            return Ok(existing);
        }

        let title = title.unwrap_or_else(|| format!("{} {}", business.name, month));
        let campaign = Campaign::new(
            self.org.clone(),
            business.id.clone(),
            month.clone(),
            title,
        );

        if self.store.insert_campaign(&campaign)? {
            self.audit(
                AuditLogEntry::new(
                    self.org.clone(),
                    EntityKind::Campaign,
                    campaign.id.to_string(),
                    AuditAction::Create,
                )
                .actor(actor.map(str::to_string))
                .values(None, Some(campaign.title.clone()))
                .detail(serde_json::json!({
                    "business_id": campaign.business_id,
                    "month": campaign.month.as_str(),
                })),
            );
            return Ok(campaign);
        }

        // The unique constraint fired: someone else created it between
        // our lookup and insert. Their row wins.
        self.store
            .find_campaign(&self.org, &business.id, &month)?
            .ok_or_else(|| {
                FunilError::Conflict(format!(
                    "campaign for {} in {} raced and could not be re-read",
                    business.id, month
                ))
            })
    }

    /// Resolve a business name to its active pipeline record.
    pub(crate) fn resolve_active_business(&mut self, name: &str) -> Result<Business> {
        let resolved = self.resolver.resolve(&self.store, IdKind::Business, name)?;
        self.store
            .get_business(&self.org, &resolved.id)?
            .filter(|b| b.active)
            .ok_or_else(|| {
                FunilError::NotFound(format!("business '{}' (missing or inactive)", name.trim()))
            })
    }

    /// Business + existing campaign for the slot operations, which never
    /// allocate implicitly.
    pub(crate) fn locate_campaign(
        &mut self,
        business_name: &str,
        month_input: &str,
    ) -> Result<(Business, Campaign)> {
        let business = self.resolve_active_business(business_name)?;
        let month = MonthToken::normalize(month_input)?;
        let campaign = self
            .store
            .find_campaign(&self.org, &business.id, &month)?
            .ok_or_else(|| {
                FunilError::NotFound(format!(
                    "campaign for '{}' in {}",
                    business.name, month
                ))
            })?;
        Ok((business, campaign))
    }
}
