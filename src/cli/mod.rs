mod commands;
mod handlers;

pub use commands::{
    AuditAction, AuditCommand, BusinessAction, BusinessCommand, CampaignAction, CampaignCommand,
    Cli, Commands, CreatorAction, CreatorCommand,
};
pub use handlers::{
    handle_audit_list, handle_business_add, handle_business_list, handle_business_stage,
    handle_campaign_allocate, handle_creator_add, handle_creator_remove, handle_creator_roster,
    handle_creator_swap, handle_init,
};
