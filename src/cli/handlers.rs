use std::env;
use std::path::PathBuf;

use crate::engine::Engine;
use crate::entity::Stage;
use crate::error::{FunilError, Result};

/// Find the workspace root by looking for .funil/ or .git/
fn find_workspace_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(".funil").exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn open_engine(org: &str) -> Result<Engine> {
    Engine::open(&find_workspace_root(), org)
}

pub fn handle_init(org: &str) -> Result<()> {
    let root = env::current_dir()?;
    let _engine = Engine::init(&root, org)?;
    println!("Initialized funil workspace in {}", root.display());
    Ok(())
}

pub fn handle_business_add(
    org: &str,
    name: String,
    value: Option<f64>,
    actor: Option<String>,
    json: bool,
) -> Result<()> {
    let mut engine = open_engine(org)?;
    let business = engine.intake_business(&name, value, actor.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&business)?);
    } else {
        println!(
            "Business ({}) [{}] {}",
            business.id, business.stage, business.name
        );
    }
    Ok(())
}

pub fn handle_business_stage(
    org: &str,
    business_id: String,
    stage: String,
    actor: Option<String>,
    json: bool,
) -> Result<()> {
    let stage: Stage = stage.parse().map_err(FunilError::InvalidInput)?;

    let engine = open_engine(org)?;
    let view = engine.transition(&business_id, stage, actor.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!(
            "Moved {} to {} (since {})",
            view.business_id,
            view.stage,
            view.stage_since.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn handle_business_list(org: &str, all: bool, json: bool) -> Result<()> {
    let engine = open_engine(org)?;
    let businesses = engine.list_businesses(all)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&businesses)?);
    } else if businesses.is_empty() {
        println!("No businesses found.");
    } else {
        println!("Pipeline:\n");
        for b in businesses {
            let value = b
                .estimated_value
                .map(|v| format!(" value:{}", v))
                .unwrap_or_default();
            println!("  ({}) [{}]{} {}", b.id, b.stage, value, b.name);
        }
    }
    Ok(())
}

pub fn handle_campaign_allocate(
    org: &str,
    business: String,
    month: String,
    title: Option<String>,
    actor: Option<String>,
    json: bool,
) -> Result<()> {
    let mut engine = open_engine(org)?;
    let campaign = engine.allocate(&business, &month, title, actor.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&campaign)?);
    } else {
        println!(
            "Campaign ({}) [{}] {}",
            campaign.id, campaign.month, campaign.title
        );
    }
    Ok(())
}

pub fn handle_creator_roster(org: &str, name: String, json: bool) -> Result<()> {
    let mut engine = open_engine(org)?;
    let resolved = engine.roster_creator(&name)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "creator_id": resolved.id,
                "creator_name": resolved.display_name,
            }))?
        );
    } else {
        println!("Creator ({}) {}", resolved.id, resolved.display_name);
    }
    Ok(())
}

pub fn handle_creator_add(
    org: &str,
    business: String,
    month: String,
    creator: String,
    actor: Option<String>,
    json: bool,
) -> Result<()> {
    let mut engine = open_engine(org)?;
    let view = engine.add_creator(&business, &month, &creator, actor.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!(
            "Added {} to campaign {} (slot {})",
            view.creator_name.as_deref().unwrap_or("-"),
            view.campaign_id,
            view.slot_id
        );
    }
    Ok(())
}

pub fn handle_creator_swap(
    org: &str,
    business: String,
    month: String,
    old_creator: String,
    new_creator: String,
    actor: Option<String>,
    json: bool,
) -> Result<()> {
    let mut engine = open_engine(org)?;
    let view = engine.swap_creator(&business, &month, &old_creator, &new_creator, actor.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!(
            "Swapped {} -> {} on slot {}",
            old_creator.trim(),
            view.creator_name.as_deref().unwrap_or("-"),
            view.slot_id
        );
    }
    Ok(())
}

pub fn handle_creator_remove(
    org: &str,
    business: String,
    month: String,
    creator: Option<String>,
    actor: Option<String>,
    json: bool,
) -> Result<()> {
    let mut engine = open_engine(org)?;
    let view = engine.remove_creator(&business, &month, creator.as_deref(), actor.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!(
            "Removed {} from campaign {} ({} slots remaining)",
            view.creator_name.as_deref().unwrap_or("empty slot"),
            view.campaign_id,
            view.remaining.unwrap_or(0)
        );
    }
    Ok(())
}

pub fn handle_audit_list(org: &str, entity: Option<String>, json: bool) -> Result<()> {
    let engine = open_engine(org)?;
    let entries = engine.list_audit(entity.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No audit entries found.");
    } else {
        println!("Audit log:\n");
        for e in entries {
            let actor = e.actor.as_deref().unwrap_or("-");
            let change = match (&e.old_value, &e.new_value) {
                (Some(old), Some(new)) => format!(" {} -> {}", old, new),
                (None, Some(new)) => format!(" -> {}", new),
                (Some(old), None) => format!(" {} ->", old),
                (None, None) => String::new(),
            };
            println!(
                "  {} {} {} {} by {}{}",
                e.ts.format("%Y-%m-%d %H:%M:%S"),
                e.entity_type,
                e.action,
                e.entity_id,
                actor,
                change
            );
        }
    }
    Ok(())
}
