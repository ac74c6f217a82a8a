//! Quest toast timing tests on tokio's paused clock.

use habitkit::{QuestToastQueue, ToastTimings};
use habitkit_shared::QuestReward;
use std::time::Duration;

fn queue() -> QuestToastQueue {
    QuestToastQueue::new(ToastTimings::default())
}

fn xp(amount: u64) -> QuestReward {
    QuestReward::Xp { amount }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn showing(queue: &QuestToastQueue) -> Option<(String, bool)> {
    queue
        .current()
        .map(|v| (v.toast.quest_name.clone(), v.visible))
}

#[tokio::test(start_paused = true)]
async fn test_auto_dismiss_timing() {
    let q = queue();
    q.show("A", xp(10));
    q.show("B", xp(20));
    assert_eq!(q.pending_len(), 1);

    advance(4999).await;
    assert_eq!(showing(&q), Some(("A".into(), true)));

    // t = 5001: hidden but not yet cleared
    advance(2).await;
    assert_eq!(showing(&q), Some(("A".into(), false)));
    assert_eq!(q.pending_len(), 1);

    // t = 5449: hide animation plus gap not over
    advance(448).await;
    assert_eq!(showing(&q), Some(("A".into(), false)));

    // t = 5451
    advance(2).await;
    assert_eq!(showing(&q), Some(("B".into(), true)));
    assert_eq!(q.pending_len(), 0);

    // B gets its own full display window
    advance(4998).await;
    assert_eq!(showing(&q), Some(("B".into(), true)));
    advance(2).await;
    assert_eq!(showing(&q), Some(("B".into(), false)));
    advance(451).await;
    assert_eq!(showing(&q), None);
}

#[tokio::test(start_paused = true)]
async fn test_manual_dismiss_cancels_display_timer() {
    let q = queue();
    q.show("A", xp(10));
    q.show("B", xp(20));

    advance(1000).await;
    q.dismiss();
    assert_eq!(showing(&q), Some(("A".into(), false)));

    advance(449).await;
    assert_eq!(showing(&q), Some(("A".into(), false)));
    advance(2).await;
    assert_eq!(showing(&q), Some(("B".into(), true)));

    // A's original auto-dismiss at t = 5000 must not touch B
    advance(4000).await;
    assert_eq!(showing(&q), Some(("B".into(), true)));
}

#[tokio::test(start_paused = true)]
async fn test_fifo_order_and_ids() {
    let q = queue();
    let ids: Vec<_> = ["first", "second", "third"]
        .iter()
        .map(|name| q.show(name, xp(5)))
        .collect();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let view = q.current().expect("a toast should be showing");
        assert!(view.visible);
        seen.push(view.toast.id);
        q.dismiss();
        advance(451).await;
    }
    assert_eq!(seen, ids);
    assert!(q.current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_show_during_hide_waits() {
    let q = queue();
    q.show("A", xp(10));
    advance(5100).await;
    assert_eq!(showing(&q), Some(("A".into(), false)));

    q.show("B", QuestReward::Title {
        title: "Early Riser".into(),
    });
    assert_eq!(showing(&q), Some(("A".into(), false)));
    assert_eq!(q.pending_len(), 1);

    advance(351).await;
    assert_eq!(showing(&q), Some(("B".into(), true)));
}

#[tokio::test(start_paused = true)]
async fn test_show_after_idle_is_immediate() {
    let q = queue();
    q.show("A", xp(10));
    advance(6000).await;
    assert!(q.current().is_none());

    q.show("B", xp(10));
    assert_eq!(showing(&q), Some(("B".into(), true)));
}

#[tokio::test(start_paused = true)]
async fn test_custom_timings() {
    let q = QuestToastQueue::new(ToastTimings {
        display: Duration::from_millis(1000),
        hide: Duration::from_millis(100),
        gap: Duration::from_millis(50),
    });
    q.show("A", xp(1));
    q.show("B", xp(1));
    advance(1151).await;
    assert_eq!(showing(&q), Some(("B".into(), true)));
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_with_nothing_showing() {
    let q = queue();
    q.dismiss();
    assert!(q.current().is_none());
    assert_eq!(q.pending_len(), 0);
}
