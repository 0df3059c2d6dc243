use super::*;
use crate::capabilities::{
    HistoryEntry, KillSwitch, MockKnowledgeStore, PlanningOracle, PolicyGate, PolicySnippet,
    Proposal, ProposedAction, ReasoningOracle, StepRunner, ToolDescriptor, ToolExecutor,
    ToolOutcome,
};
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, VigilEvent};
use crate::guardian::{Decision, DecisionEngine, DecisionKind, GuardianConfig};
use crate::overseer::{AuditLog, LocalKillSwitch};
use crate::partner::{ExecutorConfig, StepExecutor, StepOutcome, StepReport};
use crate::utils::RetryConfig;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Stubs
// ============================================================================

/// Planner answering from a queue, then `["<goal> step"]`
#[derive(Default)]
struct StubPlanner {
    answers: Mutex<VecDeque<Result<Vec<String>>>>,
    calls: AtomicUsize,
}

impl StubPlanner {
    fn with(answers: Vec<Result<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl PlanningOracle for StubPlanner {
    async fn generate_plan(&self, goal: &str, _context: &serde_json::Value) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![format!("{goal} step")]))
    }
}

fn plan(steps: &[&str]) -> Result<Vec<String>> {
    Ok(steps.iter().map(|s| s.to_string()).collect())
}

/// Gate with a fixed plan verdict; actions always pass
struct PlanGate(DecisionKind);

#[async_trait::async_trait]
impl PolicyGate for PlanGate {
    async fn validate_plan(&self, _task_id: &str, _plan: &[String]) -> Result<Decision> {
        Ok(match self.0 {
            DecisionKind::Allow => Decision::allow("ok"),
            DecisionKind::Deny => Decision::deny("plan touches production"),
            DecisionKind::Ambiguous => Decision::ambiguous("unclear intent"),
        })
    }

    async fn validate_action(
        &self,
        _task_id: &str,
        _step_goal: &str,
        _action: &ProposedAction,
    ) -> Result<Decision> {
        Ok(Decision::allow("ok"))
    }
}

/// Runner with per-goal scripted results; unscripted steps complete
#[derive(Default)]
struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<Result<StepReport>>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedRunner {
    fn new() -> Self {
        Self::default()
    }

    fn script(self, goal: &str, results: Vec<Result<StepReport>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(goal.to_string(), results.into());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StepRunner for ScriptedRunner {
    async fn run_step(&self, _task_id: &str, step_goal: &str) -> Result<StepReport> {
        self.calls.lock().unwrap().push(step_goal.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(step_goal)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(StepReport::completed("done")))
    }
}

/// Runner whose first call blocks until released
struct BlockingRunner {
    release: Arc<Notify>,
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl StepRunner for BlockingRunner {
    async fn run_step(&self, _task_id: &str, step_goal: &str) -> Result<StepReport> {
        let first = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(step_goal.to_string());
            calls.len() == 1
        };
        if first {
            self.release.notified().await;
        }
        Ok(StepReport::completed("done"))
    }
}

/// Runner that engages the kill switch while its step is in flight
struct HaltingRunner {
    switch: Arc<LocalKillSwitch>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl StepRunner for HaltingRunner {
    async fn run_step(&self, _task_id: &str, _step_goal: &str) -> Result<StepReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.switch.set_halted(true, Some("maintenance".into()));
        Ok(StepReport::completed("done"))
    }
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_retry(
        RetryConfig::new()
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_millis(10)),
    )
}

fn orchestrator(
    planner: Arc<dyn PlanningOracle>,
    gate: Arc<dyn PolicyGate>,
    runner: Arc<dyn StepRunner>,
    kill: Arc<LocalKillSwitch>,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(planner, gate, runner, kill, fast_config()))
}

/// Poll until the task leaves the active states and its driver has exited
async fn settle(orch: &Arc<Orchestrator>, id: &str) -> Task {
    for _ in 0..1000 {
        let task = orch.status(id).await.unwrap();
        if !task.status.is_active() && !orch.tasks.is_driving(id) {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {id} did not settle");
}

fn statuses(task: &Task) -> Vec<TaskStatus> {
    task.history.iter().map(|t| t.to).collect()
}

// ============================================================================
// Scenario A: end to end with the real engine and executor
// ============================================================================

struct PingOracle;

#[async_trait::async_trait]
impl ReasoningOracle for PingOracle {
    async fn propose_action(
        &self,
        _goal: &str,
        _tools: &[ToolDescriptor],
        history: &[HistoryEntry],
    ) -> Result<Proposal> {
        if history.is_empty() {
            Ok(Proposal::Action(
                ProposedAction::new(
                    "run_script",
                    json!({"path": "/srv/scripts/check_connectivity.sh", "args": "8.8.8.8"}),
                )
                .with_thought("ping 8.8.8.8 through the connectivity script"),
            ))
        } else {
            Ok(Proposal::Satisfied {
                thought: "connectivity confirmed".into(),
            })
        }
    }
}

struct PingTool;

#[async_trait::async_trait]
impl ToolExecutor for PingTool {
    async fn execute(&self, _task_id: &str, _action: &ProposedAction) -> Result<ToolOutcome> {
        Ok(ToolOutcome::Success {
            observation: "3 packets transmitted, 3 received".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_ping_completes() {
    let mut store = MockKnowledgeStore::new();
    store.expect_get_policies().returning(|_| {
        Ok(vec![
            PolicySnippet::new("Disallow: delete", "seed"),
            PolicySnippet::new("Disallow: shutdown", "seed"),
        ])
    });
    store
        .expect_get_tools()
        .returning(|| Ok(vec![ToolDescriptor::new("run_script", "Run a command")]));
    store.expect_append_memory().returning(|_| Ok(()));
    let store = Arc::new(store);

    let engine = Arc::new(DecisionEngine::new(store.clone(), GuardianConfig::default()));
    let executor = Arc::new(StepExecutor::new(
        store,
        Arc::new(PingOracle),
        engine.clone(),
        Arc::new(PingTool),
        ExecutorConfig::default(),
    ));
    let bus = Arc::new(EventBus::new(64));
    let mut rx = bus.subscribe();
    let orch = Arc::new(
        Orchestrator::new(
            StubPlanner::with(vec![plan(&["check connectivity"])]),
            engine,
            executor,
            Arc::new(LocalKillSwitch::new()),
            fast_config(),
        )
        .with_event_bus(bus),
    );

    let id = orch.submit("ping 8.8.8.8", None).await.unwrap();
    assert!(id.starts_with("task-"));

    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.current_step_index, 1);
    assert_eq!(
        statuses(&task),
        vec![
            TaskStatus::Planning,
            TaskStatus::PlanValidating,
            TaskStatus::Executing,
            TaskStatus::Completed
        ]
    );

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    assert!(seen.iter().any(|e| matches!(
        e,
        VigilEvent::StepFinished { outcome: StepOutcome::StepCompleted, .. }
    )));
    assert!(seen.iter().all(|e| e.task_id() == Some(id.as_str())));
}

// ============================================================================
// Planning and validation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_denied_plan_is_rejected_without_running_steps() {
    let runner = Arc::new(ScriptedRunner::new());
    let orch = orchestrator(
        Arc::new(StubPlanner::default()),
        Arc::new(PlanGate(DecisionKind::Deny)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );

    let id = orch.submit("drop the prod tables", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Rejected);
    assert_eq!(task.pause_reason.as_deref(), Some("plan touches production"));
    assert!(runner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_plan_counts_as_deny() {
    let orch = orchestrator(
        Arc::new(StubPlanner::default()),
        Arc::new(PlanGate(DecisionKind::Ambiguous)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("something vague", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Rejected);
    assert_eq!(task.pause_reason.as_deref(), Some("ambiguous: unclear intent"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_plan_fails() {
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["  ", ""])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("nothing to do", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.pause_reason.unwrap().contains("empty plan"));
}

#[tokio::test(start_paused = true)]
async fn test_planning_error_fails_without_retry() {
    let planner = StubPlanner::with(vec![Err(Error::Planning("no JSON in output".into()))]);
    let orch = orchestrator(
        planner.clone(),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("ping 8.8.8.8", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(planner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_planning_failure_is_retried() {
    let planner = StubPlanner::with(vec![
        Err(Error::TransientUnavailable("oracle restarting".into())),
        plan(&["check connectivity"]),
    ]);
    let orch = orchestrator(
        planner.clone(),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("ping 8.8.8.8", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(planner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_blank_goal_is_invalid() {
    let orch = orchestrator(
        Arc::new(StubPlanner::default()),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    assert!(matches!(orch.submit("   ", None).await, Err(Error::InvalidInput(_))));
    assert_eq!(orch.task_count(), 0);
}

// ============================================================================
// Kill switch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_halted_system_rejects_new_tasks() {
    let kill = Arc::new(LocalKillSwitch::new());
    kill.set_halted(true, None);
    let planner = Arc::new(StubPlanner::default());
    let orch = orchestrator(
        planner.clone(),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        kill,
    );

    let id = orch.submit("ping 8.8.8.8", None).await.unwrap();
    let task = orch.status(&id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Rejected);
    assert_eq!(task.pause_reason.as_deref(), Some(SYSTEM_HALTED));
    assert!(task.plan.is_empty());

    settle(&orch, &id).await;
    assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_halt_takes_effect_at_next_step_boundary() {
    let kill = Arc::new(LocalKillSwitch::new());
    let runner = Arc::new(HaltingRunner {
        switch: kill.clone(),
        calls: AtomicUsize::new(0),
    });
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["first", "second"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        kill.clone(),
    );

    let id = orch.submit("two steps", None).await.unwrap();
    let task = settle(&orch, &id).await;
    // the in-flight step finished; the next one never started
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(task.status, TaskStatus::WaitingApproval);
    assert_eq!(task.current_step_index, 1);
    assert_eq!(task.pause_reason.as_deref(), Some(SYSTEM_HALTED));

    kill.set_halted(false, None);
    orch.approve(&id, None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
}

// ============================================================================
// Pause, approve, replan
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_scenario_d_resume_at_paused_step() {
    let runner = Arc::new(ScriptedRunner::new().script(
        "b",
        vec![Ok(StepReport::deviation("deviation"))],
    ));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a", "b", "c"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );

    let id = orch.submit("three steps", None).await.unwrap();
    let paused = settle(&orch, &id).await;
    assert_eq!(paused.status, TaskStatus::PausedDeviation);
    assert_eq!(paused.current_step_index, 1);
    assert_eq!(paused.pause_reason.as_deref(), Some("deviation"));

    let resumed = orch.approve(&id, None).await.unwrap();
    assert_eq!(resumed.status, TaskStatus::Executing);
    assert_eq!(resumed.current_step_index, paused.current_step_index);
    assert!(resumed.pause_reason.is_none());

    let done = settle(&orch, &id).await;
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.current_step_index, 3);
    // step a ran once; b is retried from exactly where it paused
    assert_eq!(runner.calls(), vec!["a", "b", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_action_waits_for_approval_with_note() {
    let runner = Arc::new(ScriptedRunner::new().script(
        "restart web",
        vec![Ok(StepReport::rejected("hard-deny pattern matched: shutdown (system shutdown)"))],
    ));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["restart web"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner,
        Arc::new(LocalKillSwitch::new()),
    );

    let id = orch.submit("restart the web tier", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::WaitingApproval);
    assert_eq!(task.current_step_index, 0);

    orch.approve(&id, Some("operator checked it".into()))
        .await
        .unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task
        .history
        .iter()
        .any(|t| t.reason.as_deref() == Some("approved: operator checked it")));
}

#[tokio::test(start_paused = true)]
async fn test_approve_requires_paused_task() {
    let orch = orchestrator(
        Arc::new(StubPlanner::default()),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("ping 8.8.8.8", None).await.unwrap();
    settle(&orch, &id).await;

    let err = orch.approve(&id, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { ref from, .. } if from == "COMPLETED"));
    assert!(matches!(
        orch.approve("task-missing", None).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_replan_from_completed_resets_everything() {
    let runner = Arc::new(ScriptedRunner::new());
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a", "b"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("first goal", None).await.unwrap();
    let done = settle(&orch, &id).await;
    assert_eq!(done.current_step_index, 2);

    let reset = orch.replan(&id, "second goal").await.unwrap();
    assert_eq!(reset.status, TaskStatus::Planning);
    assert_eq!(reset.current_step_index, 0);
    assert!(reset.plan.is_empty());
    assert_eq!(reset.goal, "second goal");

    let done = settle(&orch, &id).await;
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.plan, vec!["second goal step"]);
    assert_eq!(runner.calls(), vec!["a", "b", "second goal step"]);
}

#[tokio::test(start_paused = true)]
async fn test_replan_while_step_in_flight_drops_stale_result() {
    let release = Arc::new(Notify::new());
    let runner = Arc::new(BlockingRunner {
        release: release.clone(),
        calls: Mutex::new(Vec::new()),
    });
    let orch = orchestrator(
        Arc::new(StubPlanner::default()),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );

    let id = orch.submit("old", None).await.unwrap();
    while runner.calls.lock().unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    orch.replan(&id, "new").await.unwrap();
    release.notify_one();

    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.plan, vec!["new step"]);
    assert_eq!(task.current_step_index, 1);
    assert_eq!(*runner.calls.lock().unwrap(), vec!["old step", "new step"]);
}

#[tokio::test]
async fn test_replan_unknown_task_is_not_found() {
    let orch = orchestrator(
        Arc::new(StubPlanner::default()),
        Arc::new(PlanGate(DecisionKind::Allow)),
        Arc::new(ScriptedRunner::new()),
        Arc::new(LocalKillSwitch::new()),
    );
    assert!(matches!(
        orch.replan("task-nope", "goal").await,
        Err(Error::NotFound(_))
    ));
}

// ============================================================================
// Transient step failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unreachable_executor_fails_after_bounded_retries() {
    let runner = Arc::new(ScriptedRunner::new().script(
        "a",
        (0..5)
            .map(|_| Err(Error::TransientUnavailable("partner unreachable".into())))
            .collect(),
    ));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("one step", None).await.unwrap();
    let task = settle(&orch, &id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(runner.calls().len(), 3);
    assert!(task.pause_reason.unwrap().contains("partner unreachable"));
}

#[tokio::test(start_paused = true)]
async fn test_step_timeout_is_retried() {
    let runner = Arc::new(ScriptedRunner::new().with_delay(Duration::from_secs(10)));
    let orch = Arc::new(Orchestrator::new(
        StubPlanner::with(vec![plan(&["slow"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
        fast_config().with_step_timeout(Duration::from_secs(1)),
    ));
    let id = orch.submit("slow work", None).await.unwrap();
    let task = settle(&orch, &id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(runner.calls().len(), 3);
    assert!(task.pause_reason.unwrap().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_step_failure_recovers() {
    let runner = Arc::new(ScriptedRunner::new().script(
        "a",
        vec![Err(Error::TransientUnavailable("blip".into()))],
    ));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("one step", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(runner.calls(), vec!["a", "a"]);
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_step_failure_is_retried() {
    let runner = Arc::new(ScriptedRunner::new().script(
        "a",
        vec![Err(Error::Internal("executor crashed".into()))],
    ));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("one step", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(runner.calls(), vec!["a", "a"]);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_step_input_fails_without_retry() {
    let runner = Arc::new(ScriptedRunner::new().script(
        "a",
        vec![Err(Error::InvalidInput("step goal is blank".into()))],
    ));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );
    let id = orch.submit("one step", None).await.unwrap();
    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(runner.calls(), vec!["a"]);
    assert!(task.pause_reason.unwrap().contains("after 1 attempt(s)"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_driver_is_single_flight() {
    let runner = Arc::new(ScriptedRunner::new().with_delay(Duration::from_millis(50)));
    let orch = orchestrator(
        StubPlanner::with(vec![plan(&["a", "b", "c"])]),
        Arc::new(PlanGate(DecisionKind::Allow)),
        runner.clone(),
        Arc::new(LocalKillSwitch::new()),
    );

    let id = orch.submit("three steps", None).await.unwrap();
    for _ in 0..8 {
        orch.spawn_driver(&id);
    }

    let task = settle(&orch, &id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.current_step_index, 3);
    assert_eq!(runner.calls(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_tasks_run_concurrently_and_are_listed() {
    let runner = Arc::new(ScriptedRunner::new().with_delay(Duration::from_millis(100)));
    let audit = Arc::new(AuditLog::new(500));
    let orch = Arc::new(
        Orchestrator::new(
            Arc::new(StubPlanner::default()),
            Arc::new(PlanGate(DecisionKind::Allow)),
            runner.clone(),
            Arc::new(LocalKillSwitch::new()),
            fast_config(),
        )
        .with_audit(audit.clone()),
    );

    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(orch.submit(&format!("goal {i}"), Some(json!({"n": i}))).await.unwrap());
    }
    for id in &ids {
        assert_eq!(settle(&orch, id).await.status, TaskStatus::Completed);
    }

    let listed = orch.list().await;
    assert_eq!(listed.len(), 10);
    assert!(listed.iter().all(|s| s.status == TaskStatus::Completed));
    assert_eq!(runner.calls().len(), 10);
    // four transitions per task
    assert_eq!(audit.recent(500, Some(&ids[0])).len(), 4);
}

#[test]
fn test_status_serializes_screaming_snake() {
    assert_eq!(
        serde_json::to_value(TaskStatus::PausedDeviation).unwrap(),
        "PAUSED_DEVIATION"
    );
    assert_eq!(TaskStatus::PlanValidating.to_string(), "PLAN_VALIDATING");
    assert!(TaskStatus::WaitingApproval.is_paused());
    assert!(!TaskStatus::Completed.is_active());
}
