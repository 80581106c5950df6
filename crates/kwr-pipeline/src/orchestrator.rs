//! Pipeline Orchestrator (§4.H): a fixed stage DAG run as a sequence of
//! `StageRunner`-wrapped `PipelineStage` implementations, built the way the
//! teacher's `SearchPipeline::builder()` assembles a step list.
//!
//! Unlike the teacher's pipeline, every stage here is additionally gated by
//! dependency completion and a running budget check, and the whole run can
//! be cancelled mid-flight — those concerns live in `StageRunner`, not in
//! `PipelineBuilder` itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kwr_core::models::{Run, RunStatus, Stage};
use kwr_core::traits::EventPublisher;
use kwr_core::{KwrError, Result};
use tokio::sync::Notify;

use crate::progress::{aggregate_progress, ProgressBus, ProgressEvent};

/// One DAG node. Implementations live outside this crate's orchestrator
/// module (expansion/clustering/scoring/roadmap each expose a pure function;
/// the binary wires each into a `PipelineStage` with provider access).
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage(&self) -> Stage;

    /// Runs this stage to completion against `run`, mutating it in place
    /// (e.g. recording keyword/cluster counts) and returning `Ok(())` on
    /// success. Implementations must check `cancellation` at every batch
    /// boundary, per §5.
    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()>;

    /// Optional post-stage quality gate. Returning `Ok(false)` means "warn,
    /// don't abort"; returning `Err` aborts the run.
    async fn quality_gate(&self, _run: &Run) -> Result<bool> {
        Ok(true)
    }
}

/// Cloneable cancellation signal checked at every batch boundary, mirroring
/// `tokio_util::sync::CancellationToken` without taking the dependency.
#[derive(Clone)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(KwrError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Gates a `PipelineStage` on dependency completion and the Run's remaining
/// budget before dispatch.
struct StageRunner {
    stage: Box<dyn PipelineStage>,
    depends_on: Vec<Stage>,
    estimated_cost: f64,
}

impl StageRunner {
    fn ready(&self, completed: &[Stage]) -> bool {
        self.depends_on.iter().all(|dep| completed.contains(dep))
    }
}

/// Assembles the fixed stage DAG: `expansion -> universe -> clustering ->
/// scoring -> roadmap -> export -> cleanup`.
pub struct PipelineBuilder {
    runners: Vec<StageRunner>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self { runners: Vec::new() }
    }

    pub fn add_stage(mut self, stage: Box<dyn PipelineStage>, depends_on: Vec<Stage>, estimated_cost: f64) -> Self {
        self.runners.push(StageRunner {
            stage,
            depends_on,
            estimated_cost,
        });
        self
    }

    pub fn build(self, progress: Arc<ProgressBus>, strict_quality_gates: bool, max_retries: u32) -> Orchestrator {
        Orchestrator {
            runners: self.runners,
            progress,
            strict_quality_gates,
            max_retries,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns no global state; constructed fresh per Run by the service's DI
/// container, per the §9 redesign flag against singleton providers.
pub struct Orchestrator {
    runners: Vec<StageRunner>,
    progress: Arc<ProgressBus>,
    strict_quality_gates: bool,
    max_retries: u32,
}

impl Orchestrator {
    /// Drives `run` through every ready stage in dependency order until the
    /// DAG is exhausted or a stage fails terminally.
    pub async fn execute(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        run.transition_to(RunStatus::Processing)?;

        loop {
            cancellation.check().map_err(|e| {
                let _ = run.transition_to(RunStatus::Cancelled);
                e
            })?;

            let Some(runner) = self
                .runners
                .iter()
                .find(|r| r.ready(&run.completed_stages) && !run.completed_stages.contains(&r.stage.stage()))
            else {
                break;
            };

            if run.would_exceed_budget(runner.estimated_cost) {
                run.transition_to(RunStatus::Failed)?;
                return Err(KwrError::budget_exceeded(
                    run.api_usage.total_cost + runner.estimated_cost,
                    run.budget_limit,
                ));
            }

            run.current_stage = Some(runner.stage.stage());
            self.publish_progress(run, 0.0).await;

            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match runner.stage.run(run, cancellation).await {
                    Ok(()) => break,
                    Err(e) if e.is_retryable() && attempt < self.max_retries => continue,
                    Err(e) if e.is_run_terminal() => {
                        run.transition_to(RunStatus::Failed)?;
                        run.error_log.push(e.to_string());
                        return Err(e);
                    }
                    Err(e) => {
                        run.transition_to(RunStatus::Failed)?;
                        run.error_log.push(e.to_string());
                        return Err(e);
                    }
                }
            }

            match runner.stage.quality_gate(run).await {
                Ok(true) => {}
                Ok(false) => {
                    run.warnings.push(format!("quality gate warning after {:?}", runner.stage.stage()));
                }
                Err(e) if self.strict_quality_gates => {
                    run.transition_to(RunStatus::Failed)?;
                    run.error_log.push(e.to_string());
                    return Err(e);
                }
                Err(e) => {
                    run.warnings.push(e.to_string());
                }
            }

            run.mark_stage_completed(runner.stage.stage());
            self.publish_progress(run, 1.0).await;
        }

        run.transition_to(RunStatus::Completed)?;
        Ok(())
    }

    /// Resumes a `Failed` run from its last completed stage. The caller is
    /// responsible for verifying the run's persisted data is intact before
    /// calling this; inputs are re-validated as part of the next stage's
    /// normal dispatch.
    pub async fn resume(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        if run.status != RunStatus::Failed {
            return Err(KwrError::internal("resume is only valid for a Failed run"));
        }
        run.status = RunStatus::Pending;
        run.error_log.clear();
        self.execute(run, cancellation).await
    }

    async fn publish_progress(&self, run: &Run, stage_fraction: f32) {
        let overall = aggregate_progress(&run.completed_stages, run.current_stage, stage_fraction);
        if let Some(stage) = run.current_stage {
            let event = ProgressEvent::new(run.id, stage, (stage_fraction * 100.0) as u8, overall);
            let _ = self.progress.publish(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwr_core::values::Phrase;

    struct AlwaysOk(Stage);

    #[async_trait]
    impl PipelineStage for AlwaysOk {
        fn stage(&self) -> Stage {
            self.0
        }

        async fn run(&self, _run: &mut Run, _cancellation: &CancellationSignal) -> Result<()> {
            Ok(())
        }
    }

    struct AlwaysFails(Stage);

    #[async_trait]
    impl PipelineStage for AlwaysFails {
        fn stage(&self) -> Stage {
            self.0
        }

        async fn run(&self, _run: &mut Run, _cancellation: &CancellationSignal) -> Result<()> {
            Err(KwrError::internal("boom"))
        }
    }

    fn new_run() -> Run {
        Run::new("owner", vec![Phrase::new("seed").unwrap()], "US", "en", serde_json::json!({}), 100.0).unwrap()
    }

    #[tokio::test]
    async fn executes_stages_in_dependency_order() {
        let progress = Arc::new(ProgressBus::default());
        let orchestrator = PipelineBuilder::new()
            .add_stage(Box::new(AlwaysOk(Stage::Expansion)), vec![], 1.0)
            .add_stage(Box::new(AlwaysOk(Stage::Universe)), vec![Stage::Expansion], 1.0)
            .build(progress, false, 3);

        let mut run = new_run();
        orchestrator.execute(&mut run, &CancellationSignal::new()).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.completed_stages.contains(&Stage::Expansion));
        assert!(run.completed_stages.contains(&Stage::Universe));
    }

    #[tokio::test]
    async fn terminal_failure_marks_run_failed() {
        let progress = Arc::new(ProgressBus::default());
        let orchestrator = PipelineBuilder::new()
            .add_stage(Box::new(AlwaysFails(Stage::Expansion)), vec![], 1.0)
            .build(progress, false, 1);

        let mut run = new_run();
        let result = orchestrator.execute(&mut run, &CancellationSignal::new()).await;
        assert!(result.is_err());
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn budget_breach_fails_before_dispatch() {
        let progress = Arc::new(ProgressBus::default());
        let orchestrator = PipelineBuilder::new()
            .add_stage(Box::new(AlwaysOk(Stage::Expansion)), vec![], 1_000.0)
            .build(progress, false, 1);

        let mut run = new_run();
        let result = orchestrator.execute(&mut run, &CancellationSignal::new()).await;
        assert!(matches!(result, Err(KwrError::BudgetExceeded { .. })));
    }

    #[tokio::test]
    async fn cancellation_stops_the_run() {
        let progress = Arc::new(ProgressBus::default());
        let orchestrator = PipelineBuilder::new()
            .add_stage(Box::new(AlwaysOk(Stage::Expansion)), vec![], 1.0)
            .build(progress, false, 1);

        let mut run = new_run();
        let cancellation = CancellationSignal::new();
        cancellation.cancel();
        let result = orchestrator.execute(&mut run, &cancellation).await;
        assert!(result.is_err());
        assert_eq!(run.status, RunStatus::Cancelled);
    }
}
