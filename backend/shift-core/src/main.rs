use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shift_core::auth::{identify, AdminPolicy, Identity, SessionUser};
use shift_core::board::{ShiftBoard, StaffUpdate};
use shift_core::calendar::{compute_holidays, month_days};
use shift_core::config::Config;
use shift_core::entry::{ScheduleEntry, StatusKind};
use shift_core::export::{export_file_name, write_month_csv};
use shift_core::notify::{self, notify_all, ChatWebhookNotifier, Notification, Notifier};
use shift_core::patterns::{parse_slots, WEEKDAY_SLOTS};
use shift_core::store::{load_or_seed, DebouncedSaver, JsonFileStore, StateStore};

#[derive(Parser)]
#[command(name = "shift-core")]
#[command(version, about = "Monthly shift board: holidays, schedules, shortages and approvals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// State file (defaults to SHIFT_STATE_FILE, then shift_state.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Email of the acting user
    #[arg(long, global = true)]
    email: Option<String>,

    /// Admin passphrase
    #[arg(long, global = true)]
    passphrase: Option<String>,
}

/// Target month; defaults to the current one.
#[derive(Args, Clone, Copy)]
struct MonthArgs {
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    month: Option<u32>,
}

impl MonthArgs {
    fn resolve(self) -> Result<(i32, u32)> {
        let today = Local::now().date_naive();
        let year = self.year.unwrap_or(today.year());
        let month = self.month.unwrap_or(today.month());
        if !(1..=12).contains(&month) {
            bail!("Month must be between 1 and 12, got {}", month);
        }
        Ok((year, month))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List national holidays
    Holidays(MonthArgs),
    /// Generate the month from default shifts if it does not exist yet
    Generate(MonthArgs),
    /// Show default shift summaries
    Summary {
        #[arg(long)]
        staff: Option<String>,
    },
    /// Show days that differ from a staff member's default shift
    Irregularities {
        #[arg(long)]
        staff: String,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Show understaffed days per task
    Shortages(MonthArgs),
    /// Write the month as CSV
    Export {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Set one day, e.g. `8`, `有`, `遅:4` or an empty string
    Set {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        day: u32,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        /// Post an absence notice when setting 欠
        #[arg(long)]
        notify: bool,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Replace a staff member's default shift, e.g. `A,A,休,B,B`
    ApplyPattern {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        pattern: String,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Lock a day as a holiday for everyone, or unlock it
    LockDay {
        #[arg(long)]
        day: u32,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Mark a month as submitted and notify admins
    Submit {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        undo: bool,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Send a month back to the staff member
    Remand {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        undo: bool,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Approve a month and post the approval card
    Approve {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        remarks: Option<String>,
        #[arg(long)]
        undo: bool,
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Add a placeholder staff member
    AddStaff,
    /// Remove a staff member and all of their days
    DeleteStaff {
        #[arg(long)]
        staff: String,
    },
    /// Change a staff member's profile fields
    UpdateStaff {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        employee_id: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        pin: Option<String>,
        /// Empty string clears it
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        chat_user_id: Option<String>,
    },
    /// Add a task
    AddTask {
        #[arg(long)]
        name: String,
        #[arg(long)]
        required: Option<u32>,
    },
    RenameTask {
        #[arg(long)]
        task: String,
        #[arg(long)]
        name: String,
    },
    /// Set how many people a task needs per working day
    SetRequired {
        #[arg(long)]
        task: String,
        #[arg(long)]
        required: u32,
    },
    /// Remove a task from the board and from every skill list
    DeleteTask {
        #[arg(long)]
        task: String,
    },
    /// Make exactly the given staff responsible for a task
    AssignTask {
        #[arg(long)]
        task: String,
        /// Comma separated staff ids; empty clears the task
        #[arg(long, default_value = "")]
        staff: String,
    },
    /// Replace everyone's skills, e.g. `--assign t1=s1,s2 --assign t2=s3`
    BulkAssign {
        #[arg(long = "assign")]
        assignments: Vec<String>,
    },
    /// Add a shift pattern, e.g. `--symbol C --start 10:00 --end 19:00 --break-hours 1`
    AddPattern {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "1")]
        break_hours: String,
    },
    /// Set the chat user ids mentioned on submission (comma separated)
    SetNotificationIds {
        #[arg(long, default_value = "")]
        ids: String,
    },
}

fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Parses `--assign` values of the form `task=staff1,staff2`.
fn parse_assignments(values: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    let mut assignments = BTreeMap::new();
    for value in values {
        let Some((task, staff)) = value.split_once('=') else {
            bail!("Expected task=staff1,staff2, got '{}'", value);
        };
        let task = task.trim();
        if task.is_empty() {
            bail!("Missing task id in '{}'", value);
        }
        assignments.insert(task.to_string(), split_ids(staff));
    }
    Ok(assignments)
}

struct Actor {
    user: SessionUser,
    is_admin: bool,
}

impl Actor {
    fn resolve(cli: &Cli, board: &ShiftBoard, policy: &AdminPolicy) -> Self {
        let email = cli.email.clone().unwrap_or_default();
        let identity = Identity {
            name: email.clone(),
            email,
        };
        let user = identify(&identity, &board.staff);
        let by_passphrase = cli
            .passphrase
            .as_deref()
            .is_some_and(|p| policy.verify_passphrase(p));
        let is_admin = policy.is_admin(&user) || by_passphrase;
        info!("Acting as {} (admin: {})", user.id, is_admin);
        Self { user, is_admin }
    }

    fn require_admin(&self, action: &str) -> Result<()> {
        if !self.is_admin {
            bail!("Only admins can {}", action);
        }
        Ok(())
    }

    fn require_self_or_admin(&self, staff_id: &str, action: &str) -> Result<()> {
        if !self.is_admin && self.user.id != staff_id {
            bail!("Only {} or an admin can {}", staff_id, action);
        }
        Ok(())
    }
}

/// Notification failures are reported but never undo the board change.
async fn send(notifier: &dyn Notifier, notifications: &[Notification]) {
    if let Err(e) = notify_all(notifier, notifications).await {
        warn!("Notification failed: {}", e);
    }
}

/// Runs one command. Returns whether the board changed.
async fn run(
    command: Commands,
    board: &mut ShiftBoard,
    actor: &Actor,
    notifier: &dyn Notifier,
) -> Result<bool> {
    match command {
        Commands::Holidays(month) => {
            let (year, month) = month.resolve()?;
            let holidays = compute_holidays(year, month);
            for day in month_days(year, month).iter().filter(|d| holidays.contains(&d.day)) {
                println!("{}/{}", month, day.label());
            }
            Ok(false)
        }
        Commands::Generate(month) => {
            let (year, month) = month.resolve()?;
            let generated = board.ensure_month(year, month);
            if !generated {
                println!("{}-{} already exists, left untouched", year, month);
            }
            Ok(generated)
        }
        Commands::Summary { staff } => {
            let ids: Vec<String> = match staff {
                Some(id) => vec![id],
                None => board.staff.iter().map(|s| s.id.clone()).collect(),
            };
            for id in ids {
                let member = board.staff_member(&id)?;
                println!("{} {}\n{}\n", member.id, member.name, board.pattern_summary(&id)?);
            }
            Ok(false)
        }
        Commands::Irregularities { staff, month } => {
            let (year, month) = month.resolve()?;
            let generated = board.ensure_month(year, month);
            let lines = board.irregularities(&staff, year, month)?;
            if lines.is_empty() {
                println!("なし");
            }
            for line in lines {
                println!("{}", line);
            }
            Ok(generated)
        }
        Commands::Shortages(month) => {
            let (year, month) = month.resolve()?;
            let generated = board.ensure_month(year, month);
            for row in board.shortages(year, month) {
                println!("{} (必要 {}人): {} day(s) short", row.task_name, row.required, row.shortage_days());
                for (day, cell) in row.cells.iter().filter(|(_, cell)| cell.is_short()) {
                    println!("  {} {}", day.label(), cell);
                }
            }
            Ok(generated)
        }
        Commands::Export { month, out } => {
            let (year, month) = month.resolve()?;
            let generated = board.ensure_month(year, month);
            let path = out.unwrap_or_else(|| PathBuf::from(export_file_name(year, month)));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_month_csv(BufWriter::new(file), board, year, month)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(generated)
        }
        Commands::Set {
            staff,
            day,
            value,
            notify: send_notice,
            month,
        } => {
            let (year, month) = month.resolve()?;
            actor.require_self_or_admin(&staff, "edit this schedule")?;
            let entry: ScheduleEntry = value.parse()?;
            board.ensure_month(year, month);
            board.set_entry(actor.is_admin, &staff, year, month, day, entry.clone())?;
            if send_notice && actor.is_admin && entry == ScheduleEntry::Status(StatusKind::Absent) {
                let name = board.staff_member(&staff)?.name.clone();
                send(notifier, &[notify::absence(&name)]).await;
            }
            Ok(true)
        }
        Commands::ApplyPattern {
            staff,
            pattern,
            month,
        } => {
            let (year, month) = month.resolve()?;
            actor.require_self_or_admin(&staff, "change this default shift")?;
            let slots = parse_slots(&pattern);
            if slots.len() != WEEKDAY_SLOTS {
                bail!("A default shift needs {} slots, got {}", WEEKDAY_SLOTS, slots.len());
            }
            board.apply_pattern(&staff, slots, year, month)?;
            println!("{}", board.pattern_summary(&staff)?);
            Ok(true)
        }
        Commands::LockDay { day, month } => {
            let (year, month) = month.resolve()?;
            actor.require_admin("lock holidays")?;
            board.ensure_month(year, month);
            let locked = board.toggle_day_holiday(year, month, day)?;
            println!("{}/{} {}", month, day, if locked { "locked" } else { "unlocked" });
            Ok(true)
        }
        Commands::Submit { staff, undo, month } => {
            let (year, month) = month.resolve()?;
            actor.require_self_or_admin(&staff, "submit this schedule")?;
            if !undo {
                let name = board.staff_member(&staff)?.name.clone();
                let mentions =
                    notify::submission_mentions(&board.admin_config.submission_notification_ids);
                send(notifier, &[notify::submission(&name, year, month, &mentions)]).await;
            }
            board.set_submitted(&staff, year, month, !undo)?;
            Ok(true)
        }
        Commands::Remand { staff, undo, month } => {
            let (year, month) = month.resolve()?;
            actor.require_admin("remand schedules")?;
            if !undo {
                let member = board.staff_member(&staff)?;
                send(notifier, &[notify::remand(&member.name, &member.chat_user_id)]).await;
            }
            board.set_remanded(&staff, year, month, !undo)?;
            Ok(true)
        }
        Commands::Approve {
            staff,
            remarks,
            undo,
            month,
        } => {
            let (year, month) = month.resolve()?;
            actor.require_admin("approve schedules")?;
            if !undo {
                board.ensure_month(year, month);
                let summary = board.pattern_summary(&staff)?;
                let irregularities = board.irregularities(&staff, year, month)?;
                let messages = notify::approval(
                    board.staff_member(&staff)?,
                    year,
                    month,
                    &summary,
                    &irregularities,
                    remarks.as_deref(),
                    Utc::now().timestamp_millis(),
                );
                send(notifier, &messages).await;
            }
            board.set_approved(&staff, year, month, !undo)?;
            Ok(true)
        }
        Commands::AddStaff => {
            actor.require_admin("add staff")?;
            println!("{}", board.add_staff());
            Ok(true)
        }
        Commands::DeleteStaff { staff } => {
            actor.require_admin("delete staff")?;
            let removed = board.delete_staff(&staff)?;
            println!("Deleted {} {}", removed.id, removed.name);
            Ok(true)
        }
        Commands::UpdateStaff {
            staff,
            name,
            employee_id,
            role,
            pin,
            email,
            chat_user_id,
        } => {
            actor.require_admin("edit staff profiles")?;
            let update = StaffUpdate {
                name,
                employee_id,
                role,
                pin,
                email,
                chat_user_id,
            };
            if update.is_empty() {
                bail!("Nothing to update for {}", staff);
            }
            board.update_staff_info(&staff, update)?;
            Ok(true)
        }
        Commands::AddTask { name, required } => {
            actor.require_admin("add tasks")?;
            println!("{}", board.add_task(&name, required));
            Ok(true)
        }
        Commands::RenameTask { task, name } => {
            actor.require_admin("rename tasks")?;
            board.rename_task(&task, &name)?;
            Ok(true)
        }
        Commands::SetRequired { task, required } => {
            actor.require_admin("change required personnel")?;
            board.set_required_personnel(&task, required)?;
            Ok(true)
        }
        Commands::DeleteTask { task } => {
            actor.require_admin("delete tasks")?;
            let removed = board.delete_task(&task)?;
            println!("Deleted {} {}", removed.id, removed.name);
            Ok(true)
        }
        Commands::AssignTask { task, staff } => {
            actor.require_admin("assign tasks")?;
            board.assign_task_staff(&task, &split_ids(&staff))?;
            Ok(true)
        }
        Commands::BulkAssign { assignments } => {
            actor.require_admin("assign tasks")?;
            board.bulk_assign_tasks(&parse_assignments(&assignments)?);
            Ok(true)
        }
        Commands::AddPattern {
            symbol,
            start,
            end,
            break_hours,
        } => {
            actor.require_admin("add shift patterns")?;
            let Ok(break_hours) = break_hours.trim().parse::<Decimal>() else {
                bail!("Break hours must be a number, got '{}'", break_hours);
            };
            let pattern = board.add_pattern(&symbol, &start, &end, break_hours)?;
            println!("{} {} ({}h)", pattern.id, pattern.display_time, pattern.work_hours.normalize());
            Ok(true)
        }
        Commands::SetNotificationIds { ids } => {
            actor.require_admin("change notification settings")?;
            board.set_submission_notification_ids(&ids);
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Failed to load SHIFT_* configuration")?;
    let state_path = cli.state.clone().unwrap_or_else(|| config.state_file.clone());
    let store: Arc<dyn StateStore> = Arc::new(JsonFileStore::new(state_path.clone()));
    let (mut board, _) = load_or_seed(store.as_ref(), config.seed_admin_config())
        .with_context(|| format!("Failed to load {}", state_path.display()))?;

    let actor = Actor::resolve(&cli, &board, &config.admin_policy());
    let notifier = ChatWebhookNotifier::new(config.webhooks())
        .context("Failed to build the chat webhook client")?;

    let changed = run(cli.command, &mut board, &actor, &notifier).await?;
    if changed {
        let saver = DebouncedSaver::spawn(store, config.save_debounce());
        saver.submit(board);
        saver.shutdown().await;
        info!("Saved {}", state_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_assignments() {
        let parsed = parse_assignments(&["t1=s1, s2".to_string(), "t2=".to_string()]).unwrap();
        assert_eq!(parsed["t1"], vec!["s1", "s2"]);
        assert!(parsed["t2"].is_empty());
        assert!(parse_assignments(&["t1".to_string()]).is_err());
        assert!(parse_assignments(&["=s1".to_string()]).is_err());
    }

    #[test]
    fn cli_accepts_record_commands() {
        let cli = Cli::try_parse_from([
            "shift-core", "add-pattern", "--symbol", "c", "--start", "10:00", "--end", "19:00",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::AddPattern { ref break_hours, .. } if break_hours == "1"
        ));

        let cli = Cli::try_parse_from([
            "shift-core", "bulk-assign", "--assign", "t1=s1", "--assign", "t2=s2,s3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::BulkAssign { ref assignments } if assignments.len() == 2));
    }
}
