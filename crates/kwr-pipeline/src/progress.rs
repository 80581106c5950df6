//! Progress Bus (§2 item J): emits stage/job progress events to subscribers.
//! Built on a `tokio::sync::broadcast` channel, the same fan-out primitive
//! the teacher reaches for wherever more than one reader needs the same
//! stream of async events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kwr_core::ids::RunId;
use kwr_core::models::Stage;
use kwr_core::traits::EventPublisher;
use kwr_core::Result;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub run_id: RunId,
    pub stage: Stage,
    pub stage_progress_pct: u8,
    pub overall_progress_pct: u8,
    pub message: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(run_id: RunId, stage: Stage, stage_progress_pct: u8, overall_progress_pct: u8) -> Self {
        Self {
            run_id,
            stage,
            stage_progress_pct,
            overall_progress_pct,
            message: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Broadcasts progress events; persistence (throttled to 10% increments) is
/// the caller's responsibility, not the bus's.
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for ProgressBus {
    type Event = ProgressEvent;

    async fn publish(&self, event: ProgressEvent) -> Result<()> {
        // No subscribers is not an error: a run submitted without a live
        // status-watcher still completes normally.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Aggregates per-stage fractional progress into the Run-level percentage,
/// per `overall = Σ stage_weight · stage_progress_fraction`.
pub fn aggregate_progress(completed_stages: &[Stage], current_stage: Option<Stage>, current_stage_fraction: f32) -> u8 {
    let mut total = 0.0f32;
    for stage in &Stage::ORDERED {
        let weight = stage.weight_pct() as f32;
        if completed_stages.contains(stage) {
            total += weight;
        } else if Some(*stage) == current_stage {
            total += weight * current_stage_fraction.clamp(0.0, 1.0);
        }
    }
    total.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = ProgressBus::default();
        let mut rx = bus.subscribe();
        let run_id = RunId::new();
        bus.publish(ProgressEvent::new(run_id, Stage::Expansion, 50, 20)).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.run_id, run_id);
        assert_eq!(received.stage_progress_pct, 50);
    }

    #[test]
    fn aggregate_progress_counts_completed_stages_fully() {
        let completed = vec![Stage::Initialization, Stage::Expansion];
        let pct = aggregate_progress(&completed, Some(Stage::Universe), 0.5);
        // 5 + 40 + (25 * 0.5) = 57.5 -> rounds to 58
        assert_eq!(pct, 58);
    }

    #[test]
    fn aggregate_progress_is_complete_when_all_stages_done() {
        let pct = aggregate_progress(&Stage::ORDERED, None, 0.0);
        assert_eq!(pct, 100);
    }
}
