// Prayer Rotation - Weekly schedule generator
//
// run     → verify, compute this week, write files, send mail (default)
// show    → print the text schedule for a week or date
// verify  → multi-week invariant checks, non-zero exit on failure
// week    → ISO week / continuous week / cycle position for a date

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use envconfig::Envconfig;
use tracing::{error, info, warn};

use prayer_rotation::{
    archive_previous_schedule, day_name, logging, verify_algorithm, verify_week,
    write_current_files, Config, Delivery, Mailer, RotationEngine, ScheduleView, Severity, WeekCalendar,
    WeekContext,
};

/// Weeks checked before anything is published: two full cycles
const VERIFY_WEEKS: usize = 16;

#[derive(Parser)]
#[command(name = "prayer-rotation", version, about = "Weekly elder prayer rotation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate this week's schedule (default)
    Run {
        /// Run as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the text schedule for a continuous week or a date
    Show {
        #[arg(long, conflicts_with = "date")]
        week: Option<i64>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Verify the rotation over consecutive weeks
    Verify {
        #[arg(long, default_value_t = 1)]
        start: i64,

        #[arg(long, default_value_t = VERIFY_WEEKS)]
        weeks: usize,
    },
    /// Show week numbers for a date
    Week {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::init_from_env()?;
    let command = cli.command.unwrap_or(Command::Run { date: None });

    // Runs append to the activity log next to the schedule files
    let log_dir = match command {
        Command::Run { .. } => Some(config.output_dir()?),
        _ => None,
    };
    let _guard = logging::init(log_dir.as_deref())?;

    match command {
        Command::Run { date } => run(&config, date),
        Command::Show { week, date } => show(&config, week, date),
        Command::Verify { start, weeks } => verify(&config, start, weeks),
        Command::Week { date } => week(&config, date),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn view<'a>(
    config: &'a Config,
    engine: &'a RotationEngine,
    week: &'a prayer_rotation::WeeklyAssignment,
    context: WeekContext,
    generated_at: NaiveDateTime,
) -> ScheduleView<'a> {
    ScheduleView {
        organization: &config.prayer_organization,
        context,
        roster: engine.roster(),
        week,
        band: engine.balance_band(),
        generated_at,
    }
}

// ============================================================================
// RUN
// ============================================================================

fn run(config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let engine = config.build_engine()?;
    let calendar = config.calendar()?;

    let now = now();
    let today = date.unwrap_or(now.date());
    let generated_at = today.and_time(now.time());
    let context = calendar.context(today);

    info!(
        today = %today,
        day = day_name(context.weekday()),
        week = context.display_week,
        continuous_week = context.continuous_week,
        cycle_position = engine.cycle_position(context.continuous_week),
        "starting prayer schedule run"
    );

    // 1. Algorithm verification
    let report = verify_algorithm(&engine, context.continuous_week, VERIFY_WEEKS);
    for issue in &report.issues {
        match issue.severity {
            Severity::Critical => error!(check = issue.check.name(), week = issue.week_index, "{}", issue.message),
            Severity::Warning => warn!(check = issue.check.name(), week = issue.week_index, "{}", issue.message),
        }
    }
    if !report.passed() {
        bail!("Algorithm verification failed ({}); aborting", report.summary());
    }
    info!("{}", report.summary());

    // 2. This week
    let week = engine.assign(context.continuous_week);
    let critical: Vec<_> = verify_week(&engine, &week)
        .into_iter()
        .filter(|i| i.severity == Severity::Critical)
        .collect();
    if !critical.is_empty() {
        for issue in &critical {
            error!(check = issue.check.name(), "{}", issue.message);
        }
        bail!("Schedule validation failed for week {}", context.display_week);
    }

    for assignment in &week.elders {
        info!(elder = %assignment.elder, families = assignment.families.len(), "assignment");
    }
    info!(total = week.total_assigned(), "families assigned this week");

    // 3. Files
    let view = view(config, &engine, &week, context, generated_at);
    let output = config.output_dir()?;
    let mut failures = 0;

    if context.is_monday() {
        if let Err(e) = archive_previous_schedule(&output, today) {
            warn!(error = %e, "could not archive previous schedule; continuing");
        }
    }

    write_current_files(&output, &view.html(), &view.text())?;

    // 4. Mail
    if let Some(mailer) = config.mailer(&output)? {
        let mut messages = Vec::new();
        if context.is_monday() {
            messages.push(view.weekly_message());
        }
        messages.extend(view.daily_message());

        for message in &messages {
            match mailer.send(message) {
                Ok(Delivery::Sent { recipients, .. }) => {
                    info!(subject = %message.subject, recipients, "email sent")
                }
                Ok(Delivery::Spooled(path)) => {
                    info!(subject = %message.subject, path = %path.display(), "email spooled")
                }
                Err(e) => {
                    error!(subject = %message.subject, transport = mailer.name(), error = %e, "failed to deliver message");
                    failures += 1;
                }
            }
        }
    } else {
        info!("email disabled or not configured; skipping mail");
    }

    if failures > 0 {
        bail!("{} message(s) could not be delivered", failures);
    }

    println!("✅ Week {} schedule written to {}", context.display_week, output.display());
    Ok(())
}

// ============================================================================
// SHOW / VERIFY / WEEK
// ============================================================================

fn show(config: &Config, week: Option<i64>, date: Option<NaiveDate>) -> Result<()> {
    let engine = config.build_engine()?;
    let calendar = config.calendar()?;

    let day = match (week, date) {
        (Some(week), _) => calendar.monday_of_week(week)?,
        (None, Some(date)) => date,
        (None, None) => now().date(),
    };
    let context = calendar.context(day);
    let assignment = engine.assign(context.continuous_week);

    print!("{}", view(config, &engine, &assignment, context, now()).text());
    Ok(())
}

fn verify(config: &Config, start: i64, weeks: usize) -> Result<()> {
    let engine = config.build_engine()?;

    println!("🔍 Verifying weeks {}..{}", start, start + weeks as i64 - 1);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for gap in engine.gaps() {
        println!(
            "❌ No redistribution entry: {} at cycle position {}",
            gap.owner, gap.cycle_position
        );
    }

    let report = verify_algorithm(&engine, start, weeks);
    for issue in &report.issues {
        let mark = match issue.severity {
            Severity::Critical => "❌",
            Severity::Warning => "⚠️ ",
        };
        println!("{} [week {}] {}: {}", mark, issue.week_index, issue.check.name(), issue.message);
    }

    println!("\n{}", report.summary());

    engine.ensure_table_complete()?;
    if !report.passed() {
        bail!("verification failed");
    }

    println!("✅ All checks passed");
    Ok(())
}

fn week(config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let engine = config.build_engine()?;
    let calendar: WeekCalendar = config.calendar()?;
    let context = calendar.context(date.unwrap_or(now().date()));

    println!("📅 {} ({})", context.today, day_name(context.weekday()));
    println!("   Week:            {} ({})", context.display_week, context.date_range());
    println!(
        "   Continuous week: {} (since {})",
        context.continuous_week,
        calendar.reference_monday()
    );
    println!(
        "   Cycle position:  {} of {}",
        engine.cycle_position(context.continuous_week),
        engine.cycle_length()
    );
    Ok(())
}
