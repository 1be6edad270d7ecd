use std::process::Command;
use tempfile::TempDir;

fn funil_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_funil"))
}

#[test]
fn test_init_creates_funil_directory() {
    let tmp = TempDir::new().unwrap();

    let output = funil_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(tmp.path().join(".funil").exists());
    assert!(tmp.path().join(".funil/crm.db").exists());
    assert!(tmp.path().join(".funil/sheets.json").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = TempDir::new().unwrap();

    funil_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    let output = funil_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_business_add_without_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = funil_cmd()
        .current_dir(tmp.path())
        .args(["business", "add", "Loja Fashion"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("funil init"));
}

fn init(tmp: &TempDir) {
    let output = funil_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

fn run(tmp: &TempDir, args: &[&str]) -> std::process::Output {
    funil_cmd().current_dir(tmp.path()).args(args).output().unwrap()
}

fn run_ok(tmp: &TempDir, args: &[&str]) -> String {
    let output = run(tmp, args);
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn business_id(tmp: &TempDir, name: &str) -> String {
    let stdout = run_ok(tmp, &["business", "add", name, "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    parsed["id"].as_str().unwrap().to_string()
}

#[test]
fn test_full_pipeline_workflow() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    // Intake with a value; repeat intake keeps the same id.
    let stdout = run_ok(
        &tmp,
        &["business", "add", "Loja Fashion", "--value=12000", "--json"],
    );
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let id = parsed["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("biz_"));
    assert_eq!(parsed["stage"], "cold_own_lead");

    let stdout = run_ok(&tmp, &["business", "add", "loja fashion", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["id"].as_str().unwrap(), id);

    // Transition with an actor.
    let stdout = run_ok(
        &tmp,
        &[
            "business",
            "stage",
            &id,
            "warm own lead",
            "--actor=vera",
            "--json",
        ],
    );
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["stage"], "warm_own_lead");

    // Listing shows the business; terminal stages drop out.
    let stdout = run_ok(&tmp, &["business", "list"]);
    assert!(stdout.contains("Loja Fashion"));
    assert!(stdout.contains("Warm Own Lead"));

    run_ok(&tmp, &["business", "stage", &id, "declined"]);
    let stdout = run_ok(&tmp, &["business", "list"]);
    assert!(stdout.contains("No businesses found"));
    let stdout = run_ok(&tmp, &["business", "list", "--all"]);
    assert!(stdout.contains("Loja Fashion"));
}

#[test]
fn test_invalid_stage_is_rejected() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    let id = business_id(&tmp, "Loja Fashion");

    let output = run(&tmp, &["business", "stage", &id, "shipped"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid input"));
}

#[test]
fn test_campaign_allocation_normalizes_months() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    business_id(&tmp, "Loja Fashion");

    let stdout = run_ok(
        &tmp,
        &[
            "campaign",
            "allocate",
            "Loja Fashion",
            "2025-07",
            "--title=Summer Drop",
            "--json",
        ],
    );
    let first: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(first["month"], "jul 25");
    assert_eq!(first["title"], "Summer Drop");

    // Equivalent month spellings return the same campaign.
    for month in ["julho/2025", "jul 25", "July 2025"] {
        let stdout = run_ok(&tmp, &["campaign", "allocate", "Loja Fashion", month, "--json"]);
        let again: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(again["id"], first["id"], "month input {:?}", month);
    }
}

#[test]
fn test_creator_slot_scenario() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    business_id(&tmp, "Loja Fashion");
    run_ok(&tmp, &["creator", "roster", "Ana Silva"]);
    run_ok(&tmp, &["creator", "roster", "Carlos Santos"]);
    run_ok(
        &tmp,
        &["campaign", "allocate", "Loja Fashion", "2025-07", "--title=Summer Drop"],
    );

    // Add is idempotent.
    let stdout = run_ok(
        &tmp,
        &["creator", "add", "Loja Fashion", "jul 25", "Ana Silva", "--json"],
    );
    let s1: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let stdout = run_ok(
        &tmp,
        &["creator", "add", "Loja Fashion", "2025-07", "Ana Silva", "--json"],
    );
    let s2: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(s1["slot_id"], s2["slot_id"]);

    // Swap preserves the slot identifier.
    let stdout = run_ok(
        &tmp,
        &[
            "creator",
            "swap",
            "Loja Fashion",
            "jul 25",
            "Ana Silva",
            "Carlos Santos",
            "--json",
        ],
    );
    let swapped: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(swapped["slot_id"], s1["slot_id"]);
    assert_eq!(swapped["creator_name"], "Carlos Santos");

    // Removing the only slot violates the minimum-occupancy invariant.
    let output = run(
        &tmp,
        &["creator", "remove", "Loja Fashion", "jul 25", "Carlos Santos"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invariant violation"));

    // With a second slot, removal succeeds and reports the remainder.
    run_ok(&tmp, &["creator", "add", "Loja Fashion", "jul 25", "Ana Silva"]);
    let stdout = run_ok(
        &tmp,
        &[
            "creator",
            "remove",
            "Loja Fashion",
            "jul 25",
            "Carlos Santos",
            "--json",
        ],
    );
    let removed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(removed["remaining"], 1);
}

#[test]
fn test_unknown_creator_fails() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    business_id(&tmp, "Loja Fashion");
    run_ok(&tmp, &["campaign", "allocate", "Loja Fashion", "2025-07"]);

    let output = run(&tmp, &["creator", "add", "Loja Fashion", "jul 25", "Nobody"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not found"));
}

#[test]
fn test_audit_trail_records_mutations() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    let id = business_id(&tmp, "Loja Fashion");
    run_ok(&tmp, &["business", "stage", &id, "proposal sent", "--actor=vera"]);

    let stdout = run_ok(&tmp, &["audit", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "create");
    assert_eq!(entries[1]["action"], "update");
    assert_eq!(entries[1]["actor"], "vera");
    assert_eq!(entries[1]["old_value"], "Cold Own Lead");
    assert_eq!(entries[1]["new_value"], "Proposal Sent");

    // Filtered listing.
    let stdout = run_ok(&tmp, &["audit", "list", "--entity", &id, "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
}

#[test]
fn test_orgs_are_isolated() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    run_ok(&tmp, &["--org=agency_a", "business", "add", "Loja Fashion"]);

    let stdout = run_ok(&tmp, &["--org=agency_b", "business", "list"]);
    assert!(stdout.contains("No businesses found"));

    let stdout = run_ok(&tmp, &["--org=agency_a", "business", "list"]);
    assert!(stdout.contains("Loja Fashion"));
}

#[test]
fn test_sheet_writeback_persists_resolved_ids() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    let stdout = run_ok(&tmp, &["creator", "roster", "Ana Silva", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let creator_id = parsed["creator_id"].as_str().unwrap();

    let sheets = std::fs::read_to_string(tmp.path().join(".funil/sheets.json")).unwrap();
    assert!(sheets.contains(creator_id));
    assert!(sheets.contains("Ana Silva"));
}
