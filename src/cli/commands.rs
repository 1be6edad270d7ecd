use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "funil")]
#[command(version, about = "Campaign and business lifecycle engine for a marketing-agency CRM")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Organization (tenant) the operation is scoped to
    #[arg(long, global = true, env = "FUNIL_ORG", default_value = "default")]
    pub org: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a funil workspace in the current directory
    Init,

    /// Manage businesses in the sales pipeline
    Business(BusinessCommand),

    /// Manage campaigns
    Campaign(CampaignCommand),

    /// Manage creator slots and the creator roster
    Creator(CreatorCommand),

    /// Inspect the audit trail
    Audit(AuditCommand),
}

#[derive(Args, Debug)]
pub struct BusinessCommand {
    #[command(subcommand)]
    pub action: BusinessAction,
}

#[derive(Subcommand, Debug)]
pub enum BusinessAction {
    /// Register a business lead (starts in Cold Own Lead)
    Add {
        /// Business display name
        name: String,

        /// Estimated deal value
        #[arg(long)]
        value: Option<f64>,

        /// Acting user, recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a business to another pipeline stage
    Stage {
        /// Business identifier
        business_id: String,

        /// Target stage (e.g. "warm own lead", "proposal sent")
        stage: String,

        /// Acting user, recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the active pipeline
    List {
        /// Include terminal stages (Contract Signed, Declined)
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct CampaignCommand {
    #[command(subcommand)]
    pub action: CampaignAction,
}

#[derive(Subcommand, Debug)]
pub enum CampaignAction {
    /// Locate or create the campaign for a business and month
    Allocate {
        /// Business name
        business: String,

        /// Month in any accepted format ("2025-07", "julho/2025", "jul 25")
        month: String,

        /// Campaign title (defaults to business name + month)
        #[arg(long)]
        title: Option<String>,

        /// Acting user, recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreatorCommand {
    #[command(subcommand)]
    pub action: CreatorAction,
}

#[derive(Subcommand, Debug)]
pub enum CreatorAction {
    /// Register a creator on the roster
    Roster {
        /// Creator display name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a creator to a campaign
    Add {
        business: String,
        month: String,
        creator: String,

        /// Acting user, recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Swap one creator for another on the same slot
    Swap {
        business: String,
        month: String,
        old_creator: String,
        new_creator: String,

        /// Acting user, recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a creator slot from a campaign
    Remove {
        business: String,
        month: String,

        /// Creator to remove; defaults to an empty slot, then the newest
        creator: Option<String>,

        /// Acting user, recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct AuditCommand {
    #[command(subcommand)]
    pub action: AuditAction,
}

#[derive(Subcommand, Debug)]
pub enum AuditAction {
    /// List audit entries, optionally filtered to one entity
    List {
        /// Entity identifier to filter on
        #[arg(long)]
        entity: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
