//! # Seed Data Generator
//!
//! Populates the database with demo registers, sessions and movements for
//! development.
//!
//! ## Usage
//! ```bash
//! # Generate 4 registers (default)
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 8
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - N cash registers with staggered starting floats
//! - An open session per register, each with a handful of movements
//!   following a realistic sale/withdrawal/refund pattern
//! - The first session is closed with a small counted shortfall, so a
//!   pending discrepancy report is ready to look at
//!
//! Movement types and default approval rules come from migration 002, not
//! from this binary.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::env;

use tally_core::{
    discrepancy, ledger, CashRegister, DiscrepancyReport, DiscrepancyStatus, Money, Movement,
    MovementType, RegisterSession, SessionStatus, DEFAULT_BRANCH_ID,
};
use tally_db::repository::discrepancy::generate_report_id;
use tally_db::repository::movement::generate_movement_id;
use tally_db::repository::register::generate_register_id;
use tally_db::repository::session::generate_session_id;
use tally_db::{Database, DbConfig};

/// Register names and floor locations for demo data.
const REGISTERS: &[(&str, &str)] = &[
    ("Front Counter", "Main floor, left of entrance"),
    ("Back Office", "Manager's office"),
    ("Service Desk", "Returns and pickups"),
    ("Drive-Thru", "Lane 1 window"),
    ("Kiosk A", "Self-service island"),
    ("Kiosk B", "Self-service island"),
];

/// Employee ids stamped on sessions and movements.
const EMPLOYEES: &[&str] = &[
    "emp-aisha",
    "emp-bilal",
    "emp-carmen",
    "emp-dmitri",
    "emp-elena",
];

/// Movement pattern per session: (type code, base amount cents, description).
///
/// Ordered so the running balance never dips below the opening float.
const MOVEMENT_PATTERN: &[(&str, i64, &str)] = &[
    ("SALE", 4_500, "Morning sales"),
    ("SALE", 12_999, "Bulk order, paid cash"),
    ("CASH_WITHDRAWAL", 5_000, "Bank drop"),
    ("REFUND", 1_500, "Returned item"),
    ("SUPPLIER_PAYMENT", 8_250, "Produce delivery"),
    ("SALE", 7_600, "Afternoon sales"),
    ("TRANSFER_IN", 2_000, "Float from back office"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 4;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(4);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of registers to generate (default: 4)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database:  {}", db_path);
    println!("Registers: {}", count);
    println!();

    // Connect to database (runs migrations)
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing registers
    let existing = db.registers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} registers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Movement types come from the seeded catalog
    let types: HashMap<String, MovementType> = db
        .movement_types()
        .list(false)
        .await?
        .into_iter()
        .map(|t| (t.code.clone(), t))
        .collect();

    println!();
    println!("Generating registers...");

    let start = std::time::Instant::now();
    let mut movement_total = 0usize;

    for idx in 0..count {
        let register = generate_register(idx);
        db.registers().insert(&register).await?;

        let employee = EMPLOYEES[idx % EMPLOYEES.len()];
        let session = generate_session(&register, employee);
        db.sessions().insert_open(&session).await?;

        // 5-7 movements per session, staggered back in time
        let movement_count = 5 + idx % 3;
        let mut movements = Vec::with_capacity(movement_count);

        for (j, (code, base_cents, description)) in
            MOVEMENT_PATTERN.iter().take(movement_count).enumerate()
        {
            let Some(movement_type) = types.get(*code) else {
                eprintln!("⚠ Movement type {} missing from catalog, skipping", code);
                continue;
            };

            let movement = generate_movement(
                &register,
                &session,
                movement_type,
                *base_cents,
                description,
                employee,
                idx * 10 + j,
            );

            db.movements()
                .record(&movement, movement.signed_amount().cents(), true, None)
                .await?;
            movements.push(movement);
        }
        movement_total += movements.len();

        // Close the first session with a small counted shortfall so the
        // demo database has a pending discrepancy report to look at
        if idx == 0 {
            close_with_shortfall(&db, &register, &session, employee, &movements).await?;
            println!("  {} - session closed with $5.00 shortfall", register.name);
        } else {
            println!("  {} - session open, {} movements", register.name, movements.len());
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} registers, {} movements in {:?}",
        count, movement_total, elapsed
    );

    let reports = db.discrepancies().list(None).await?;
    println!("  Pending discrepancy reports: {}", reports.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single register with a staggered starting float.
fn generate_register(idx: usize) -> CashRegister {
    let now = Utc::now();
    let (base_name, location) = REGISTERS[idx % REGISTERS.len()];

    // Suffix repeats once the name table wraps
    let name = if idx < REGISTERS.len() {
        base_name.to_string()
    } else {
        format!("{} {}", base_name, idx / REGISTERS.len() + 1)
    };

    let initial = 10_000 + (idx as i64 % 4) * 5_000;

    CashRegister {
        id: generate_register_id(),
        branch_id: DEFAULT_BRANCH_ID.to_string(),
        name,
        location: Some(location.to_string()),
        initial_balance_cents: initial,
        current_balance_cents: initial,
        allow_negative_balance: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Generates an open session against a register.
fn generate_session(register: &CashRegister, employee: &str) -> RegisterSession {
    let opened_at = Utc::now() - Duration::hours(6);

    RegisterSession {
        id: generate_session_id(),
        register_id: register.id.clone(),
        employee_id: employee.to_string(),
        closed_by: None,
        opening_balance_cents: register.initial_balance_cents,
        closing_balance_cents: None,
        expected_balance_cents: None,
        discrepancy_cents: None,
        status: SessionStatus::Open,
        notes: None,
        opened_at,
        closed_at: None,
        created_at: opened_at,
        updated_at: opened_at,
    }
}

/// Generates a single movement with a lightly jittered amount.
fn generate_movement(
    register: &CashRegister,
    session: &RegisterSession,
    movement_type: &MovementType,
    base_cents: i64,
    description: &str,
    employee: &str,
    seed: usize,
) -> Movement {
    let now = Utc::now();

    // Deterministic jitter keeps amounts varied but repeatable
    let amount_cents = base_cents + ((seed * 31) % 1_000) as i64;
    let occurred_at = now - Duration::minutes((seed * 7 % 300) as i64);

    Movement {
        id: generate_movement_id(),
        register_id: register.id.clone(),
        session_id: session.id.clone(),
        movement_type_id: movement_type.id.clone(),
        category: movement_type.category,
        amount_cents,
        description: Some(description.to_string()),
        reference: None,
        recorded_by: employee.to_string(),
        occurred_at,
        amended_at: None,
        created_at: now,
    }
}

/// Closes a session at $5.00 under the ledger-expected balance.
async fn close_with_shortfall(
    db: &Database,
    register: &CashRegister,
    session: &RegisterSession,
    employee: &str,
    movements: &[Movement],
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = ledger::expected_balance(
        Money::from_cents(session.opening_balance_cents),
        movements,
    );
    let counted = expected - Money::from_cents(500);

    let Some(finding) = discrepancy::detect(expected, counted) else {
        // 500 cents off can't be a zero discrepancy; nothing to do if it were
        return Ok(());
    };

    let report = DiscrepancyReport {
        id: generate_report_id(),
        session_id: session.id.clone(),
        register_id: register.id.clone(),
        expected_cents: finding.expected.cents(),
        actual_cents: finding.actual.cents(),
        discrepancy_cents: finding.discrepancy.cents(),
        percentage: finding.percentage,
        severity: finding.severity,
        status: DiscrepancyStatus::Pending,
        reported_by: employee.to_string(),
        reported_at: Utc::now(),
        resolution: None,
        resolved_by: None,
        resolved_at: None,
        approval_request_id: None,
    };

    db.sessions()
        .close(
            &session.id,
            &register.id,
            employee,
            counted.cents(),
            expected.cents(),
            finding.discrepancy.cents(),
            Some("Demo close with shortfall"),
            &[],
            Some(&report),
        )
        .await?;

    Ok(())
}
