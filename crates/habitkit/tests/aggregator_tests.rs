//! Stats aggregator tests against the in-memory store.

use chrono::{NaiveDate, TimeZone, Utc};
use habitkit::{Config, InMemoryStore, StatsAggregator};
use habitkit_shared::levels::level_from_total_xp;
use habitkit_shared::{Habit, RolloverPolicy};
use std::sync::Arc;
use std::time::Duration;

const USER: &str = "u1";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
}

fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new(today());
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let mut walk = Habit::new("walk", "Walk", &["walk", "stretch"], created);
    walk.record_task(today(), "walk");
    walk.record_task(today().pred_opt().unwrap(), "walk");
    walk.record_task(today().pred_opt().unwrap(), "stretch");
    store.insert_habit(USER, walk);
    store.insert_habit(USER, Habit::new("read", "Read", &["read"], created));
    store.set_xp(USER, 250);
    Arc::new(store)
}

fn aggregator(store: &Arc<InMemoryStore>, config: &Config) -> StatsAggregator {
    let agg = StatsAggregator::new(store.clone(), store.clone(), config);
    agg.set_user(Some(USER.to_string()));
    agg
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_refresh_composes_snapshot() {
    let store = seeded_store();
    let agg = aggregator(&store, &Config::default());
    assert!(agg.snapshot().is_none());

    agg.refresh_stats(true).await;
    let s = agg.snapshot().expect("snapshot after refresh");
    assert_eq!(s.level, 3);
    assert_eq!(s.current_level_xp, 30);
    assert_eq!(s.xp_for_next_level, 140);
    assert_eq!(s.title, "Apprentice");
    assert_eq!(s.active_habits, 2);
    assert_eq!(s.today_completed, 1);
    assert_eq!(s.today_total, 3);
    assert_eq!(s.total_completions, 3);
    assert_eq!(s.perfect_days, 1);
    assert_eq!(s.global_streak, 2);
    assert_eq!(s.total_streak_days, 2);
    assert_eq!(s.days_tracked, 2);
    // Three check-ins on a two-day streak earn base XP each
    assert_eq!(s.habit_xp, 30);
}

#[tokio::test(start_paused = true)]
async fn test_non_forced_refresh_is_debounced() {
    let store = seeded_store();
    let agg = aggregator(&store, &Config::default());
    agg.refresh_stats(true).await;

    store.set_xp(USER, 400);
    agg.refresh_stats(false).await;
    assert_eq!(agg.snapshot().unwrap().total_xp, 250);

    tokio::time::sleep(Duration::from_millis(1001)).await;
    agg.refresh_stats(false).await;
    assert_eq!(agg.snapshot().unwrap().total_xp, 400);

    store.set_xp(USER, 500);
    agg.refresh_stats(true).await;
    assert_eq!(agg.snapshot().unwrap().total_xp, 500);
}

#[tokio::test(start_paused = true)]
async fn test_first_refresh_is_never_debounced() {
    let store = seeded_store();
    let agg = aggregator(&store, &Config::default());
    agg.refresh_stats(false).await;
    assert!(agg.snapshot().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_xp_failure_keeps_previous_snapshot() {
    let store = seeded_store();
    let agg = aggregator(&store, &Config::default());
    agg.refresh_stats(true).await;
    let before = agg.snapshot().unwrap();

    store.fail_xp_reads(true);
    store.set_xp(USER, 10_000);
    agg.refresh_stats(true).await;
    assert_eq!(agg.snapshot().unwrap(), before);

    // Still inside the window of the last successful refresh
    store.fail_xp_reads(false);
    agg.refresh_stats(false).await;
    assert_eq!(agg.snapshot().unwrap().total_xp, before.total_xp);
    tokio::time::sleep(Duration::from_millis(1001)).await;
    agg.refresh_stats(false).await;
    assert_eq!(agg.snapshot().unwrap().total_xp, 10_000);
}

#[tokio::test(start_paused = true)]
async fn test_failure_before_first_load_leaves_nothing() {
    let store = seeded_store();
    store.fail_xp_reads(true);
    let agg = aggregator(&store, &Config::default());
    agg.refresh_stats(true).await;
    assert!(agg.snapshot().is_none());
    assert!(agg.update_stats_optimistically(10).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_signed_out_refresh_is_noop() {
    let store = seeded_store();
    let agg = aggregator(&store, &Config::default());
    agg.refresh_stats(true).await;

    agg.set_user(None);
    assert!(agg.snapshot().is_none());
    agg.refresh_stats(true).await;
    assert!(agg.snapshot().is_none());
}

// ============================================================================
// Optimistic updates and races
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_optimistic_rollover() {
    let store = seeded_store();
    store.set_xp(USER, 90);
    let agg = aggregator(&store, &Config::default());
    agg.refresh_stats(true).await;

    let outcome = agg.update_stats_optimistically(30).unwrap();
    assert!(outcome.leveled_up);
    assert_eq!(outcome.new_level, 2);
    let s = agg.snapshot().unwrap();
    assert_eq!(s.current_level_xp, 20);
    assert_eq!(s.xp_for_next_level, 120);
    assert_eq!(s.total_xp, 120);
}

#[tokio::test(start_paused = true)]
async fn test_single_rollover_policy_from_config() {
    let store = seeded_store();
    store.set_xp(USER, 0);
    let mut config = Config::default();
    config.progression.rollover = RolloverPolicy::Single;
    let agg = aggregator(&store, &config);
    agg.refresh_stats(true).await;

    // 100 + 120 would be two levels; the legacy policy stops after one
    let outcome = agg.update_stats_optimistically(300).unwrap();
    assert_eq!(outcome.new_level, 2);
    assert_eq!(agg.snapshot().unwrap().current_level_xp, 200);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_resolving_last_overwrites_optimistic() {
    let store = seeded_store();
    store.set_xp(USER, 100);
    let agg = Arc::new(aggregator(&store, &Config::default()));
    agg.refresh_stats(true).await;

    store.set_latency(Duration::from_millis(100));
    let in_flight = {
        let agg = agg.clone();
        tokio::spawn(async move { agg.refresh_stats(true).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    agg.update_stats_optimistically(50);
    assert_eq!(agg.snapshot().unwrap().total_xp, 150);

    in_flight.await.unwrap();
    assert_eq!(agg.snapshot().unwrap().total_xp, 100);
}

#[tokio::test(start_paused = true)]
async fn test_result_dropped_when_user_changes_mid_flight() {
    let store = seeded_store();
    let agg = Arc::new(aggregator(&store, &Config::default()));
    store.set_latency(Duration::from_millis(100));

    let in_flight = {
        let agg = agg.clone();
        tokio::spawn(async move { agg.refresh_stats(true).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    agg.set_user(Some("u2".to_string()));

    in_flight.await.unwrap();
    assert!(agg.snapshot().is_none());
    assert_eq!(agg.user_id().as_deref(), Some("u2"));
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_each_replacement() {
    let store = seeded_store();
    let agg = aggregator(&store, &Config::default());
    let mut rx = agg.subscribe();

    agg.refresh_stats(true).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().level, 3);

    agg.update_stats_optimistically(5);
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().total_xp, 255);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_optimistic_updates_all_land() {
    let store = seeded_store();
    let agg = Arc::new(aggregator(&store, &Config::default()));
    agg.refresh_stats(true).await;
    let start = agg.snapshot().unwrap().total_xp;

    let writers: Vec<_> = (0..8)
        .map(|_| {
            let agg = agg.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    agg.update_stats_optimistically(1).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let s = agg.snapshot().unwrap();
    assert_eq!(s.total_xp, start + 1600);
    assert_eq!(s.level, level_from_total_xp(start + 1600).level);
}
