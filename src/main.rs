use clap::Parser;
use funil::cli::{
    handle_audit_list, handle_business_add, handle_business_list, handle_business_stage,
    handle_campaign_allocate, handle_creator_add, handle_creator_remove, handle_creator_roster,
    handle_creator_swap, handle_init, AuditAction, BusinessAction, CampaignAction, Cli, Commands,
    CreatorAction,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let org = cli.org;

    let result = match cli.command {
        Commands::Init => handle_init(&org),
        Commands::Business(cmd) => match cmd.action {
            BusinessAction::Add {
                name,
                value,
                actor,
                json,
            } => handle_business_add(&org, name, value, actor, json),
            BusinessAction::Stage {
                business_id,
                stage,
                actor,
                json,
            } => handle_business_stage(&org, business_id, stage, actor, json),
            BusinessAction::List { all, json } => handle_business_list(&org, all, json),
        },
        Commands::Campaign(cmd) => match cmd.action {
            CampaignAction::Allocate {
                business,
                month,
                title,
                actor,
                json,
            } => handle_campaign_allocate(&org, business, month, title, actor, json),
        },
        Commands::Creator(cmd) => match cmd.action {
            CreatorAction::Roster { name, json } => handle_creator_roster(&org, name, json),
            CreatorAction::Add {
                business,
                month,
                creator,
                actor,
                json,
            } => handle_creator_add(&org, business, month, creator, actor, json),
            CreatorAction::Swap {
                business,
                month,
                old_creator,
                new_creator,
                actor,
                json,
            } => handle_creator_swap(&org, business, month, old_creator, new_creator, actor, json),
            CreatorAction::Remove {
                business,
                month,
                creator,
                actor,
                json,
            } => handle_creator_remove(&org, business, month, creator, actor, json),
        },
        Commands::Audit(cmd) => match cmd.action {
            AuditAction::List { entity, json } => handle_audit_list(&org, entity, json),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
