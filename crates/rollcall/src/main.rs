//! `rollcall` - CLI for the attendance store
//!
//! This binary checks people in from image snapshots, enrolls new faces, and
//! reports on attendance history.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::Parser;

use rollcall::cli::{
    CheckCommand, Cli, Command, ConfigCommand, ExportCommand, HistoryCommand, OutputFormat,
    RegisterCommand, UsersCommand,
};
use rollcall::report::{self, DailySummary};
use rollcall::{
    init_logging, AttendanceRecord, AttendanceStore, Config, FaceSnapshot, RandomRecognizer,
    SqliteStore, UserProfile,
};

type Store = AttendanceStore<SqliteStore, RandomRecognizer>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = if cli.command.needs_config() {
        Config::load_from(cli.config.clone()).context("loading configuration")?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Check(cmd) => handle_check(&open_store(&config)?, &cmd).await,
        Command::Register(cmd) => handle_register(&open_store(&config)?, cmd),
        Command::Mark(cmd) => {
            let store = open_store(&config)?;
            let Some(user) = store.find_user(cmd.user_id)? else {
                bail!(rollcall::Error::user_not_found(cmd.user_id));
            };
            store.mark_present(&user)?;
            println!("Attendance marked for {}.", user.name);
            Ok(())
        }
        Command::Users(cmd) => handle_users(&open_store(&config)?, cmd),
        Command::History(cmd) => handle_history(&open_store(&config)?, cmd),
        Command::Stats(cmd) => handle_stats(&open_store(&config)?, cmd.json),
        Command::Export(cmd) => handle_export(&open_store(&config)?, cmd),
        Command::Reset(cmd) => {
            if !cmd.yes {
                println!("This will delete all users and attendance records.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            open_store(&config)?.clear_all()?;
            println!("All data has been cleared.");
            Ok(())
        }
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cli.config, cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    let path = config.database_path();
    let kv = SqliteStore::open(&path)
        .with_context(|| format!("opening attendance database {}", path.display()))?;
    Ok(
        AttendanceStore::with_recognizer(kv, RandomRecognizer::from_config(&config.recognition))
            .with_max_records(config.storage.max_records),
    )
}

fn read_snapshot(path: &Path) -> anyhow::Result<FaceSnapshot> {
    FaceSnapshot::from_file(path)
        .context("could not capture snapshot; check the image file and try again")
}

async fn handle_check(store: &Store, cmd: &CheckCommand) -> anyhow::Result<()> {
    let snapshot = read_snapshot(&cmd.image)?;

    println!("Recognizing face...");
    match store.recognize(&snapshot).await? {
        Some(user) => {
            store.mark_present(&user)?;
            println!("Welcome back, {}! Attendance marked.", user.name);
        }
        None => {
            println!("Face not recognized. Please register first:");
            println!(
                "  rollcall register {} --name <NAME>",
                cmd.image.display()
            );
        }
    }
    Ok(())
}

fn handle_register(store: &Store, cmd: RegisterCommand) -> anyhow::Result<()> {
    let snapshot = read_snapshot(&cmd.image)?;
    let profile = UserProfile {
        name: cmd.name,
        email: cmd.email,
        department: cmd.department,
    };
    let user = store.register(profile, snapshot)?;
    println!("Registration successful! Welcome, {}.", user.name);
    println!("User id: {}", user.id);
    Ok(())
}

fn handle_users(store: &Store, cmd: UsersCommand) -> anyhow::Result<()> {
    match cmd {
        UsersCommand::List { json } => {
            let users = store.list_users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            if users.is_empty() {
                println!("No users registered yet.");
                return Ok(());
            }

            let records = store.list_records()?;
            let today = Local::now().date_naive();
            println!("Registered Users ({})", users.len());
            println!();
            for user in &users {
                let last = report::last_attendance(&records, &user.name);
                let status = match last {
                    Some(ts) if ts.with_timezone(&Local).date_naive() == today => "present",
                    _ => "absent",
                };
                println!("{}  {}", user.id, user.name);
                if !user.email.is_empty() {
                    println!("    Email:       {}", user.email);
                }
                if !user.department.is_empty() {
                    println!("    Department:  {}", user.department);
                }
                println!(
                    "    Registered:  {}",
                    user.registered_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
                match last {
                    Some(ts) => println!(
                        "    Last seen:   {} ({status} today)",
                        ts.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    ),
                    None => println!("    Last seen:   never"),
                }
            }
        }
        UsersCommand::Delete { user_id } => match store.delete_user(user_id)? {
            Some(user) => println!("Deleted {} and their attendance records.", user.name),
            None => println!("No user with id {user_id}."),
        },
    }
    Ok(())
}

fn handle_history(store: &Store, cmd: HistoryCommand) -> anyhow::Result<()> {
    match cmd {
        HistoryCommand::List { limit, format } => {
            let mut records = store.list_records()?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            print_records(&records, format)?;
        }
        HistoryCommand::Clear => {
            store.clear_records()?;
            println!("Attendance history has been cleared.");
        }
    }
    Ok(())
}

fn print_records(records: &[AttendanceRecord], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No attendance records yet.");
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    if format == OutputFormat::Table {
        writeln!(out, "{:<20} {:<12} {}", "TIME", "STATUS", "NAME")?;
    }
    for record in records {
        let time = record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        match format {
            OutputFormat::Table => {
                writeln!(
                    out,
                    "{:<20} {:<12} {}",
                    time,
                    record.status.to_string(),
                    record.name
                )?;
            }
            _ => writeln!(out, "{time} {} {}", record.name, record.status)?,
        }
    }
    Ok(())
}

fn handle_stats(store: &Store, json: bool) -> anyhow::Result<()> {
    let users = store.list_users()?;
    let records = store.list_records()?;
    let now = Local::now();

    let summary = DailySummary::compute(users.len(), &records, &now);
    let activity = report::user_activity(&records, &now);

    if json {
        let value = serde_json::json!({
            "summary": summary,
            "users": activity,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Attendance for {}", now.format("%A, %Y-%m-%d"));
    println!("-------------------------------");
    println!("Total users:      {}", summary.total_users);
    println!("Present today:    {}", summary.present_today);
    println!("Absent today:     {}", summary.absent_today);
    println!("Attendance rate:  {:.1}%", summary.attendance_rate);

    if !activity.is_empty() {
        println!();
        for entry in &activity {
            println!(
                "{:<24} {:<8} this week: {:<3} last: {}",
                entry.name,
                if entry.present_today { "present" } else { "absent" },
                entry.weekly_count,
                entry
                    .last_seen
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

fn handle_export(store: &Store, cmd: ExportCommand) -> anyhow::Result<()> {
    let export = store.snapshot()?;
    let json = serde_json::to_string_pretty(&export)?;

    let path = cmd
        .output
        .unwrap_or_else(|| PathBuf::from(report::export_file_name(&Local::now())));
    if path.as_os_str() == "-" {
        println!("{json}");
        return Ok(());
    }

    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "Exported {} users and {} records to {}",
        export.users.len(),
        export.records.len(),
        path.display()
    );
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.backend().stats()?;
    let users = store.list_users()?.len();
    let records = store.list_records()?.len();

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "database_bytes": stats.db_size_bytes,
            "last_write": stats.last_write,
            "users": users,
            "records": records,
            "max_records": store.max_records(),
            "checked_at": Utc::now(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("rollcall status");
        println!("---------------");
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        match stats.last_write {
            Some(ts) => println!(
                "Last write:    {}",
                ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("Last write:    never"),
        }
        println!("Users:         {users}");
        println!("Records:       {records} (max {})", store.max_records());
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    config_flag: Option<PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
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
                println!("  Max records:        {}", config.storage.max_records);
                println!();
                println!("[Recognition]");
                println!(
                    "  Match probability:  {}",
                    config.recognition.match_probability
                );
                println!("  Delay (ms):         {}", config.recognition.delay_ms);
                match config.recognition.seed {
                    Some(seed) => println!("  Seed:               {seed}"),
                    None => println!("  Seed:               (random)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_flag)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
