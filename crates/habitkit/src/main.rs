//! habitkit - progression calculator and pipeline demo
//!
//! Inspects the XP curve, streaks and milestones, and runs the full celebration
//! pipeline against an in-memory store.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use habitkit::{Config, InMemoryStore, Session, SessionManager};
use habitkit_shared::levels::{total_xp_for_level, xp_for_next_level};
use habitkit_shared::milestones::{habit_age_days, next_milestone, unlocked_milestones};
use habitkit_shared::streaks::{calculate_streaks_with, StreakOptions};
use habitkit_shared::tiers::{next_tier, tier_for_streak};
use habitkit_shared::titles::current_title;
use habitkit_shared::{Habit, QuestReward, StreakRule};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_USER: &str = "demo-user";

#[derive(Parser)]
#[command(name = "habitkit")]
#[command(about = "Habit progression calculator and celebration pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the XP cost of each level
    Curve {
        /// Last level to print
        #[arg(long, default_value_t = 20)]
        max_level: u32,
    },

    /// Compute streaks for a set of completion dates
    Streak {
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        today: NaiveDate,

        /// Days off that do not break a streak
        #[arg(long = "holiday")]
        holidays: Vec<NaiveDate>,

        /// Completion dates (YYYY-MM-DD)
        dates: Vec<NaiveDate>,
    },

    /// List milestones unlocked by habit age
    Milestones {
        /// Habit creation date
        #[arg(long)]
        created: NaiveDate,

        /// Reference date
        #[arg(long)]
        today: NaiveDate,
    },

    /// Run the progression pipeline against an in-memory store
    Demo {
        /// Config file (defaults to the user config location)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("habitkit=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Curve { max_level } => print_curve(max_level),
        Commands::Streak {
            today,
            holidays,
            dates,
        } => print_streak(today, holidays, dates),
        Commands::Milestones { created, today } => print_milestones(created, today),
        Commands::Demo { config } => {
            let config = match config {
                Some(path) => Config::load_from(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => Config::load(),
            };
            run_demo(config).await?;
        }
    }

    Ok(())
}

fn print_curve(max_level: u32) {
    println!("{:>5}  {:>7}  {:>9}  TITLE", "LEVEL", "COST", "TOTAL");
    for level in 1..=max_level.max(1) {
        println!(
            "{:>5}  {:>7}  {:>9}  {}",
            level,
            xp_for_next_level(level),
            total_xp_for_level(level),
            current_title(level).title
        );
    }
}

fn print_streak(today: NaiveDate, holidays: Vec<NaiveDate>, dates: Vec<NaiveDate>) {
    let options = StreakOptions {
        rule: StreakRule::AnyProgress,
        holidays: holidays.into_iter().collect(),
    };
    let dates: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let stats = calculate_streaks_with(&dates, today, &options);

    println!("Current streak: {} days", stats.current_streak);
    println!("Best streak:    {} days", stats.best_streak);
    println!("Active days:    {}", stats.active_days);
    println!("Tier:           {}", tier_for_streak(stats.current_streak));
    if let Some((tier, days_left)) = next_tier(stats.current_streak) {
        println!("Next tier:      {} in {} days", tier, days_left);
    }
}

fn print_milestones(created: NaiveDate, today: NaiveDate) {
    let age = habit_age_days(created, today);
    println!("Habit age: {} days", age);
    for m in unlocked_milestones(created, today) {
        println!("  [x] {:>3}d  {} (+{} XP)", m.days, m.title, m.reward_xp);
    }
    match next_milestone(age) {
        Some(m) => println!("  [ ] {:>3}d  {} in {} days", m.days, m.title, m.days - age),
        None => println!("  All milestones unlocked"),
    }
}

async fn run_demo(config: Config) -> Result<()> {
    info!("habitkit v{} demo starting", env!("CARGO_PKG_VERSION"));

    let today = Utc::now().date_naive();
    let store = Arc::new(
        InMemoryStore::new(today)
            .with_streak_options(StreakOptions::with_rule(config.progression.streak_rule)),
    );

    // Six days of history, so today's check-in reaches a week
    let mut habit = Habit::new(
        "reading",
        "Read 20 pages",
        &["read"],
        Utc::now() - ChronoDuration::days(6),
    );
    for days_ago in 1..=6 {
        habit.record_task(today - ChronoDuration::days(days_ago), "read");
    }
    store.insert_habit(DEMO_USER, habit);
    store.set_xp(DEMO_USER, 90);

    let manager = Arc::new(SessionManager::new(
        store.clone(),
        store.clone(),
        config.clone(),
    ));
    let (identity_tx, identity_rx) = watch::channel(None);
    let runner = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.run(identity_rx).await })
    };

    let mut sessions = manager.subscribe();
    identity_tx.send_replace(Some(DEMO_USER.to_string()));
    let session = loop {
        sessions.changed().await?;
        if let Some(session) = sessions.borrow_and_update().clone() {
            break session;
        }
    };
    print_snapshot(&session);

    // Let the level watcher settle on its baseline
    tokio::time::sleep(config.timing.watcher_grace() + Duration::from_millis(50)).await;

    let outcome = session.complete_task("reading", "read", today).await?;
    println!(
        "Completed 'read': +{} XP, streak {} days",
        outcome.xp_gained, outcome.streak
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    drain_celebrations(&session, config.timing.celebration_settle()).await;

    session
        .complete_quest("Early bird", QuestReward::Xp { amount: 25 })
        .await;
    if let Some(view) = session.toasts().current() {
        println!(
            "Toast: {} ({})",
            view.toast.quest_name,
            view.toast.reward.describe()
        );
    }
    session.toasts().dismiss();
    print_snapshot(&session);

    identity_tx.send_replace(None);
    drop(identity_tx);
    runner.await?;
    info!("Demo finished");
    Ok(())
}

async fn drain_celebrations(session: &Session, settle: Duration) {
    while let Some(celebration) = session.celebrations().current() {
        println!("Celebration: {}", celebration.headline());
        session.celebrations().dismiss_current_celebration();
        tokio::time::sleep(settle + Duration::from_millis(10)).await;
    }
}

fn print_snapshot(session: &Session) {
    match session.aggregator().snapshot() {
        Some(s) => println!(
            "Level {} {} | {}/{} XP ({:.0}%) | today {}/{} | streak {} days | {} days tracked",
            s.level,
            s.title,
            s.current_level_xp,
            s.xp_for_next_level,
            s.progress_pct,
            s.today_completed,
            s.today_total,
            s.global_streak,
            s.days_tracked
        ),
        None => println!("No stats loaded"),
    }
}
