//! `rollcall` - CLI for event attendance
//!
//! This binary registers participants, records check-in and check-out scans
//! against a `SQLite` database, and exports attendance.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::BufRead;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use serde_json::json;

use rollcall::cli::{
    AddCommand, Cli, Command, ConfigCommand, EditCommand, EventCommand, ExportCommand,
    ListCommand,
};
use rollcall::export::{participant_table, render_report, summary_line, write_csv, write_report};
use rollcall::geo::{compute_bounds_with_padding, locate};
use rollcall::import::read_import_file;
use rollcall::{
    compute_stats, init_logging, normalize, Config, Error, Participant, Registry, ScanOptions,
    ScanOutcome, Stamp, Status, Storage,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => run(&config, command),
    }
}

/// Execute a command against the participant database.
///
/// Commands that change participants reload, apply and save inside one
/// storage transaction, so concurrent stations never overwrite each other.
fn run(config: &Config, command: Command) -> Result<()> {
    let db_path = config.database_path();
    let mut storage = Storage::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    match command {
        Command::Add(cmd) => {
            if let Some(event_id) = cmd.event {
                require_event(&storage, event_id)?;
            }
            let participant =
                storage.update_registry(|registry| add_participant(registry, cmd))?;
            println!(
                "Added #{} {} ({})",
                participant.id, participant.display_name, participant.identifier
            );
        }
        Command::Import(cmd) => {
            let parsed = read_import_file(&cmd.file)?;
            let report = storage.update_registry(|registry| {
                Ok::<_, Error>(registry.bulk_import_with_policy(
                    &parsed.entries,
                    config.registry.duplicate_policy,
                ))
            })?;
            println!(
                "Imported {} participants ({} rows skipped, {} duplicates)",
                report.imported_count(),
                parsed.skipped,
                report.duplicates.len()
            );
        }
        Command::Scan(cmd) => {
            let outcome = scan_once(config, &mut storage, &cmd.identifier)?;
            print_outcome(&outcome, cmd.json)?;
        }
        Command::Station(cmd) => run_station(config, &mut storage, cmd.json)?,
        Command::Edit(cmd) => {
            if let Some(event_id) = cmd.event {
                require_event(&storage, event_id)?;
            }
            let participant =
                storage.update_registry(|registry| edit_participant(config, registry, cmd))?;
            println!(
                "Updated #{} {} ({})",
                participant.id, participant.display_name, participant.status
            );
        }
        Command::Reset(confirm) => {
            if !confirm.yes {
                return Err(Error::ConfirmationRequired { operation: "reset" }.into());
            }
            let count = storage.update_registry(|registry| {
                registry.reset_session();
                Ok::<_, Error>(registry.len())
            })?;
            println!("Reset {count} participants to pending");
        }
        Command::Clear(confirm) => {
            if !confirm.yes {
                return Err(Error::ConfirmationRequired { operation: "clear" }.into());
            }
            let removed = storage.update_registry(|registry| {
                let removed = registry.len();
                registry.clear_all();
                Ok::<_, Error>(removed)
            })?;
            println!("Removed {removed} participants");
        }
        command => {
            let registry = Registry::load_from(&storage).context("failed to load participants")?;
            show(config, &storage, &registry, command)?;
        }
    }
    Ok(())
}

/// Execute a command that only reads participants.
fn show(config: &Config, storage: &Storage, registry: &Registry, command: Command) -> Result<()> {
    match command {
        Command::List(cmd) => handle_list(registry, &cmd)?,
        Command::Stats(flag) => {
            let stats = compute_stats(registry.participants());
            if flag.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", summary_line(&stats));
            }
        }
        Command::Map(flag) => handle_map(config, registry, flag.json)?,
        Command::Export(cmd) => handle_export(config, registry, cmd)?,
        Command::Event(cmd) => handle_event(storage, registry, cmd)?,
        Command::Status(flag) => handle_status(storage, registry, flag.json)?,
        other => unreachable!("{other:?} is not a read-only command"),
    }
    Ok(())
}

fn add_participant(registry: &mut Registry, cmd: AddCommand) -> Result<Participant> {
    let mut participant = registry.add(&cmd.name, &cmd.identifier);
    participant.secondary_identifier = non_empty(cmd.secondary);
    participant.location = non_empty(cmd.location);
    participant.event_id = cmd.event;
    registry.update(participant.clone());
    Ok(participant)
}

fn scan_once(config: &Config, storage: &mut Storage, raw: &str) -> Result<ScanOutcome> {
    let options = ScanOptions::from(&config.scan);
    storage.update_registry(|registry| {
        Ok::<_, anyhow::Error>(registry.scan_with(raw, &options, &Local::now()))
    })
}

fn run_station(config: &Config, storage: &mut Storage, json: bool) -> Result<()> {
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read scan input")?;
        let outcome = scan_once(config, storage, &line).context("failed to record scan")?;
        print_outcome(&outcome, json)?;
    }
    Ok(())
}

fn print_outcome(outcome: &ScanOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    match outcome {
        ScanOutcome::NotFound => println!("Not found"),
        ScanOutcome::CheckedIn(p) => {
            println!("{} checked in at {}", p.display_name, stamp_of(p));
        }
        ScanOutcome::CheckedOut(p) => {
            println!("{} checked out at {}", p.display_name, stamp_of(p));
        }
        ScanOutcome::AlreadyCheckedOut(p) => {
            println!("{} has already checked out", p.display_name);
        }
    }
    Ok(())
}

fn stamp_of(participant: &Participant) -> &str {
    let stamp = match participant.status {
        Status::CheckedOut => participant.check_out_at.as_ref(),
        _ => participant.check_in_at.as_ref(),
    };
    stamp.map_or("-", |s| s.display.as_str())
}

fn handle_list(registry: &Registry, cmd: &ListCommand) -> Result<()> {
    let status = cmd.status.map(Status::from);
    let participants: Vec<Participant> = registry
        .iter()
        .filter(|p| status.map_or(true, |s| p.status == s))
        .filter(|p| cmd.event.map_or(true, |e| p.event_id == Some(e)))
        .cloned()
        .collect();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&participants)?);
    } else if participants.is_empty() {
        println!("No participants.");
    } else {
        println!("{}", participant_table(&participants));
    }
    Ok(())
}

/// Apply an edit; the event id has already been checked.
fn edit_participant(
    config: &Config,
    registry: &mut Registry,
    cmd: EditCommand,
) -> Result<Participant> {
    let mut participant = registry
        .get(cmd.id)
        .cloned()
        .ok_or(Error::ParticipantNotFound { id: cmd.id })?;

    if let Some(name) = cmd.name {
        participant.display_name = name;
    }
    if let Some(identifier) = cmd.identifier {
        participant.identifier = normalize(&identifier);
    }
    if cmd.secondary.is_some() {
        participant.secondary_identifier = non_empty(cmd.secondary);
    }
    if cmd.location.is_some() {
        participant.location = non_empty(cmd.location);
    }
    if let Some(event_id) = cmd.event {
        participant.event_id = Some(event_id);
    }
    if let Some(status) = cmd.status {
        participant.status = status.into();
    }

    participant.reconcile_timestamps(&Stamp::at(&Local::now(), &config.scan.time_format));
    registry.update(participant.clone());
    Ok(participant)
}

fn handle_map(config: &Config, registry: &Registry, json: bool) -> Result<()> {
    let located = locate(registry.participants());
    let coordinates: Vec<_> = located.iter().map(|(_, c)| *c).collect();
    let bounds = compute_bounds_with_padding(&coordinates, config.map.padding_degrees);

    let name_of = |id: u64| registry.get(id).map_or("", |p| p.display_name.as_str());

    if json {
        let points: Vec<_> = located
            .iter()
            .map(|(id, c)| {
                json!({
                    "id": id,
                    "display_name": name_of(*id),
                    "lat": c.lat,
                    "lng": c.lng,
                })
            })
            .collect();
        let output = json!({
            "points": points,
            "bounds": bounds,
            "center": bounds.map(|b| b.center()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let Some(bounds) = bounds else {
        println!("No participants have a usable location.");
        return Ok(());
    };
    for (id, c) in &located {
        println!("#{id} {} {:.6},{:.6}", name_of(*id), c.lat, c.lng);
    }
    let center = bounds.center();
    println!(
        "Bounds: {:.6},{:.6} to {:.6},{:.6} (center {:.6},{:.6})",
        bounds.min.lat, bounds.min.lng, bounds.max.lat, bounds.max.lng, center.lat, center.lng
    );
    Ok(())
}

fn handle_export(config: &Config, registry: &Registry, cmd: ExportCommand) -> Result<()> {
    let participants = registry.participants();
    match cmd {
        ExportCommand::Csv { path } => {
            write_csv(&path, participants)?;
            println!(
                "Exported {} participants to {}",
                participants.len(),
                path.display()
            );
        }
        ExportCommand::Report { path } => {
            let stats = compute_stats(participants);
            let title = &config.export.report_title;
            match path {
                Some(path) => {
                    write_report(&path, title, participants, &stats)?;
                    println!("Wrote report to {}", path.display());
                }
                None => print!("{}", render_report(title, participants, &stats)),
            }
        }
    }
    Ok(())
}

fn handle_event(storage: &Storage, registry: &Registry, cmd: EventCommand) -> Result<()> {
    match cmd {
        EventCommand::Add {
            name,
            date,
            location,
            description,
        } => {
            let event = storage.add_event(
                &name,
                date.as_deref(),
                location.as_deref(),
                description.as_deref(),
            )?;
            println!("Created event #{} {}", event.id, event.name);
        }
        EventCommand::List { json } => {
            let events = storage.list_events()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No events.");
            } else {
                for event in &events {
                    let count = registry.in_event(event.id).count();
                    println!(
                        "#{} {} [{}] {} participants",
                        event.id,
                        event.name,
                        event.date.as_deref().unwrap_or("-"),
                        count
                    );
                }
            }
        }
        EventCommand::Remove { id } => {
            if !storage.delete_event(id)? {
                return Err(Error::EventNotFound { id }.into());
            }
            let orphaned = registry.in_event(id).count();
            println!("Removed event #{id} ({orphaned} participants keep their event id)");
        }
    }
    Ok(())
}

fn handle_status(storage: &Storage, registry: &Registry, json: bool) -> Result<()> {
    let stats = storage.stats()?;
    let duplicates = registry.duplicate_identifiers();

    if json {
        let status = json!({
            "database_path": storage.path(),
            "schema_version": stats.schema_version,
            "participants": stats.participants,
            "events": stats.events,
            "db_size_bytes": stats.db_size_bytes,
            "duplicate_identifiers": duplicates,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("rollcall status");
        println!("---------------");
        println!("Database:      {}", storage.path().display());
        println!("Schema:        v{}", stats.schema_version);
        println!("Participants:  {}", stats.participants);
        println!("Events:        {}", stats.events);
        println!("Size:          {} bytes", stats.db_size_bytes);
        for (identifier, ids) in &duplicates {
            println!("Duplicate:     {identifier} shared by {ids:?}");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Scan]");
                println!("  Match secondary:    {}", config.scan.match_secondary);
                println!("  Normalize input:    {}", config.scan.normalize_input);
                println!("  Time format:        {}", config.scan.time_format);
                println!();
                println!("[Registry]");
                println!(
                    "  Duplicate policy:   {:?}",
                    config.registry.duplicate_policy
                );
                println!();
                println!("[Map]");
                println!("  Padding (degrees):  {}", config.map.padding_degrees);
                println!();
                println!("[Export]");
                println!("  Report title:       {}", config.export.report_title);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

fn require_event(storage: &Storage, id: i64) -> Result<()> {
    if storage.get_event(id)?.is_none() {
        return Err(Error::EventNotFound { id }.into());
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validate_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "rollcall_validate_cmd_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[map]\npadding_degrees = -1.0\n").unwrap();

        let result = handle_config(
            &Config::default(),
            ConfigCommand::Validate {
                file: Some(path.clone()),
            },
        );
        assert!(result.is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_validate_accepts_valid_file() {
        let path = std::env::temp_dir().join(format!(
            "rollcall_validate_ok_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[map]\npadding_degrees = 0.5\n").unwrap();

        let result = handle_config(
            &Config::default(),
            ConfigCommand::Validate {
                file: Some(path.clone()),
            },
        );
        assert!(result.is_ok());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_scan_once_persists_transition() {
        let config = Config::default();
        let mut storage = Storage::open_in_memory().unwrap();
        storage
            .update_registry(|registry| {
                registry.add("Alice", "0812345678");
                Ok::<_, Error>(())
            })
            .unwrap();

        let outcome = scan_once(&config, &mut storage, "0812345678").unwrap();
        assert!(matches!(outcome, ScanOutcome::CheckedIn(_)));

        let registry = Registry::load_from(&storage).unwrap();
        assert_eq!(registry.participants()[0].status, Status::CheckedIn);
    }
}
