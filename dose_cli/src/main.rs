use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dose_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dosetrack")]
#[command(about = "Medication dose adherence tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today instead of the local date
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show streak, next dose and compliance (default)
    Status,

    /// Start treatment on a date, or move the start date of an existing regimen
    Start {
        date: NaiveDate,

        /// Schedule for a new regimen: daily, weekdays, or every:N
        #[arg(long)]
        rule: Option<String>,
    },

    /// Mark a dose day as taken
    Mark { date: NaiveDate },

    /// Remove the taken mark from a day
    Unmark { date: NaiveDate },

    /// Mark a day if untaken, unmark it otherwise
    Toggle { date: NaiveDate },

    /// Switch the schedule from a date onwards, keeping earlier history
    Schedule {
        from: NaiveDate,

        /// daily, weekdays, or every:N (anchored at FROM)
        rule: String,
    },

    /// List taken, missed and pending days
    Calendar {
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Write per-day statuses to a CSV file
    Export {
        path: PathBuf,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Show or update the profile name and age
    Profile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        age: Option<u32>,
    },

    /// Replace state with a history where every dose day is taken
    Seed {
        start: NaiveDate,

        through: NaiveDate,

        /// Days to leave untaken (repeatable)
        #[arg(long = "absent")]
        absent: Vec<NaiveDate>,

        /// Schedule to seed with: daily, weekdays, or every:N (anchored at START)
        #[arg(long)]
        rule: Option<String>,
    },
}

/// Everything a command needs besides its own arguments
struct Env {
    state_path: PathBuf,
    today: NaiveDate,
    config: Config,
    default_policy: SchedulePolicy,
}

fn main() -> ExitCode {
    dose_core::logging::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;

    let env = Env {
        state_path: data_dir.join("state.json"),
        // The clock is read here, never inside dose_core
        today: cli.today.unwrap_or_else(|| chrono::Local::now().date_naive()),
        default_policy: config.schedule.policy()?,
        config,
    };
    tracing::debug!("Using state file {:?}, today {}", env.state_path, env.today);

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => cmd_status(&env),
        Commands::Start { date, rule } => cmd_start(&env, date, rule.as_deref()),
        Commands::Mark { date } => cmd_mark(&env, date),
        Commands::Unmark { date } => cmd_unmark(&env, date),
        Commands::Toggle { date } => cmd_toggle(&env, date),
        Commands::Schedule { from, rule } => cmd_schedule(&env, from, &rule),
        Commands::Calendar { from, to } => cmd_calendar(&env, from, to),
        Commands::Export { path, from, to } => cmd_export(&env, &path, from, to),
        Commands::Profile { name, age } => cmd_profile(&env, name, age),
        Commands::Seed {
            start,
            through,
            absent,
            rule,
        } => cmd_seed(&env, start, through, &absent, rule.as_deref()),
    }
}

fn cmd_status(env: &Env) -> Result<()> {
    let state = TrackerState::load(&env.state_path, &env.default_policy)?;
    let summary = summarize(
        state.regimen.as_ref(),
        Some(env.today),
        env.config.analytics.horizon_days,
    );

    match summary {
        Summary::NoRegimen => {
            println!("No treatment started yet.");
            println!("Run `dosetrack start <YYYY-MM-DD>` on the day of your first dose.");
        }
        Summary::Loading => println!("Calculating..."),
        Summary::Ready(report) => {
            let regimen = state.require_regimen()?;
            display_report(regimen, &state.profile, &report);
        }
    }
    Ok(())
}

fn cmd_start(env: &Env, date: NaiveDate, rule: Option<&str>) -> Result<()> {
    let rule = rule.map(|raw| parse_rule(raw, date)).transpose()?;

    let state = TrackerState::update(&env.state_path, &env.default_policy, |state| {
        let regimen = match (&state.regimen, rule) {
            (Some(existing), Some(rule)) => {
                existing.set_start_date(date).migrate_policy(date, rule)?
            }
            (Some(existing), None) => existing.set_start_date(date),
            (None, Some(rule)) => Regimen::begin(date, SchedulePolicy::single(date, rule)),
            (None, None) => Regimen::begin(date, env.default_policy.clone()),
        };
        Ok(TrackerState {
            regimen: Some(regimen),
            ..state.clone()
        })
    })?;

    println!("✓ Treatment start set to {}. Dose marked as taken.", date);
    if let Some(regimen) = &state.regimen {
        println!("  {} taken days on record", regimen.ledger().len());
    }
    Ok(())
}

fn cmd_mark(env: &Env, date: NaiveDate) -> Result<()> {
    modify_regimen(env, |regimen| regimen.mark_taken(date)).map_err(explain)?;
    println!("✓ Dose for {} marked as taken.", date);
    Ok(())
}

fn cmd_unmark(env: &Env, date: NaiveDate) -> Result<()> {
    modify_regimen(env, |regimen| Ok(regimen.unmark(date)))?;
    println!("✓ Dose for {} unmarked.", date);
    Ok(())
}

fn cmd_toggle(env: &Env, date: NaiveDate) -> Result<()> {
    let regimen = modify_regimen(env, |regimen| regimen.toggle(date)).map_err(explain)?;
    if regimen.is_taken(date) {
        println!("✓ Dose for {} marked as taken.", date);
    } else {
        println!("✓ Dose for {} unmarked.", date);
    }
    Ok(())
}

fn cmd_schedule(env: &Env, from: NaiveDate, rule: &str) -> Result<()> {
    let rule = parse_rule(rule, from)?;
    modify_regimen(env, |regimen| regimen.migrate_policy(from, rule))?;
    println!("✓ Schedule from {} is now {}.", from, describe_rule(&rule));
    Ok(())
}

fn cmd_calendar(env: &Env, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let state = TrackerState::load(&env.state_path, &env.default_policy)?;
    let regimen = state.require_regimen()?;
    let analytics = Analytics::new(regimen, env.today);
    let (default_from, default_to) = analytics.default_window(
        env.config.analytics.days_before_start,
        env.config.analytics.days_after_today,
    );

    let sets = analytics.day_sets(from.unwrap_or(default_from), to.unwrap_or(default_to));
    print_day_set("Taken", &sets.taken);
    print_day_set("Missed", &sets.missed);
    print_day_set("Pending", &sets.scheduled_pending);
    Ok(())
}

fn cmd_export(
    env: &Env,
    path: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let state = TrackerState::load(&env.state_path, &env.default_policy)?;
    let regimen = state.require_regimen()?;
    let analytics = Analytics::new(regimen, env.today);

    let file = std::fs::File::create(path)?;
    let count = export_day_statuses(
        &analytics,
        from.unwrap_or(regimen.start_date()),
        to.unwrap_or(env.today),
        file,
    )?;

    println!("✓ Exported {} days to {}", count, path.display());
    Ok(())
}

fn cmd_profile(env: &Env, name: Option<String>, age: Option<u32>) -> Result<()> {
    let state = if name.is_some() || age.is_some() {
        TrackerState::update(&env.state_path, &env.default_policy, |state| {
            Ok(TrackerState {
                profile: state.profile.with_changes(name, age)?,
                ..state.clone()
            })
        })?
    } else {
        TrackerState::load(&env.state_path, &env.default_policy)?
    };

    println!("  Name: {}", state.profile.name.as_deref().unwrap_or("-"));
    match state.profile.age {
        Some(age) => println!("  Age:  {}", age),
        None => println!("  Age:  -"),
    }
    Ok(())
}

fn cmd_seed(
    env: &Env,
    start: NaiveDate,
    through: NaiveDate,
    absent: &[NaiveDate],
    rule: Option<&str>,
) -> Result<()> {
    let policy = match rule {
        Some(raw) => SchedulePolicy::single(start, parse_rule(raw, start)?),
        None => env.default_policy.clone(),
    };
    let outcome = seed_history(start, through, policy, absent);

    TrackerState::update(&env.state_path, &env.default_policy, |state| {
        Ok(TrackerState {
            regimen: Some(outcome.regimen.clone()),
            ..state.clone()
        })
    })?;

    println!(
        "✓ Seeded {} taken days from {} through {}",
        outcome.regimen.ledger().len(),
        start,
        through
    );
    for day in &outcome.ineffective_absences {
        println!("  ! {} is not a scheduled dose day; nothing to leave out", day);
    }
    Ok(())
}

/// Apply a regimen transition and persist the result
fn modify_regimen<F>(env: &Env, f: F) -> Result<Regimen>
where
    F: FnOnce(&Regimen) -> Result<Regimen>,
{
    let state = TrackerState::update(&env.state_path, &env.default_policy, |state| {
        let regimen = f(state.require_regimen()?)?;
        Ok(TrackerState {
            regimen: Some(regimen),
            ..state.clone()
        })
    })?;
    state.regimen.ok_or(Error::NoRegimen)
}

/// Add a hint to errors the user can act on
fn explain(e: Error) -> Error {
    match &e {
        Error::InvalidDoseDay(_) => {
            eprintln!("Only scheduled dose days (or the start date) can be marked.")
        }
        Error::DateBeforeStart(_) => {
            eprintln!("Use `dosetrack start <date>` to move the start date earlier.")
        }
        Error::NoRegimen => eprintln!("Run `dosetrack start <date>` first."),
        _ => {}
    }
    e
}

fn parse_rule(raw: &str, anchor: NaiveDate) -> Result<Rule> {
    match raw.to_lowercase().as_str() {
        "daily" => Ok(Rule::Daily),
        "weekdays" | "weekdays_only" => Ok(Rule::WeekdaysOnly),
        other => other
            .strip_prefix("every:")
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .map(|n| Rule::EveryNDays { n, anchor })
            .ok_or_else(|| {
                Error::InvalidPolicy(format!(
                    "unknown rule {:?} (expected daily, weekdays, or every:N)",
                    raw
                ))
            }),
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::Daily => "daily".into(),
        Rule::WeekdaysOnly => "weekdays only".into(),
        Rule::EveryNDays { n, anchor } => format!("every {} days from {}", n, anchor),
    }
}

fn print_day_set(label: &str, days: &[NaiveDate]) {
    println!("{} ({}):", label, days.len());
    for day in days {
        println!("  {}", day);
    }
}

fn display_report(regimen: &Regimen, profile: &Profile, report: &AdherenceReport) {
    println!("\n╭─────────────────────────────────────────╮");
    match &profile.name {
        Some(name) => println!("│  TREATMENT SUMMARY · {}", name),
        None => println!("│  TREATMENT SUMMARY"),
    }
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Started:        {}", regimen.start_date());
    println!(
        "  Current streak: {} day{}",
        report.current_streak,
        if report.current_streak == 1 { "" } else { "s" }
    );
    match report.next_pending_dose {
        Some(day) => println!("  Next dose:      {}", day),
        None => println!("  Next dose:      All caught up!"),
    }
    match report.compliance.rate {
        Some(rate) => println!(
            "  Compliance:     {}% ({} of {} scheduled doses)",
            rate, report.compliance.taken_count, report.compliance.scheduled_count
        ),
        None => println!("  Compliance:     -%"),
    }
    println!();

    if report.due_today {
        println!("  → Dose due today ({})", report.today);
    } else if regimen.is_taken(report.today) {
        println!("  ✓ Today's dose taken");
    } else {
        println!("  No dose scheduled today");
    }
    println!();
}
