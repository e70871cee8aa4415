use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::*;
use crate::agent::AgentReply;
use crate::config::AgentConfig;
use crate::memory::{InMemoryTranscriptStore, TranscriptKey, TranscriptStore, parse_role};

const EPS: f64 = 1e-9;

// Scripted step for the mock invoker
enum Step {
    Reply(String),
    Fail(AgentCallError),
    Hang,
}

#[derive(Debug, Clone)]
struct RecordedCall {
    role: AgentRole,
    memory_id: String,
    input: AgentInput,
    /// Whether `memory_id` was the live session for `role` during the call
    was_live: bool,
}

// Mock AgentInvoker: plays back scripted steps, then falls back to canned
// replies per purpose
struct ScriptedInvoker {
    memory: Arc<AgentMemoryStore>,
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedInvoker {
    fn new(memory: Arc<AgentMemoryStore>) -> Self {
        Self {
            memory,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, purpose: InputPurpose) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.input.purpose == purpose)
            .count()
    }

    fn canned(purpose: InputPurpose) -> String {
        match purpose {
            InputPurpose::Plan => planner_json(3),
            InputPurpose::Feedback => {
                "You held your ground.\n- Calm tone\n- Clear goal\nTip: Pause before replying."
                    .to_string()
            }
            InputPurpose::OpeningLine => "So, what did you want to talk about?".to_string(),
            InputPurpose::ReflectionOpening => "How did that feel?".to_string(),
            InputPurpose::Turn | InputPurpose::ReflectionTurn => "I hear you.".to_string(),
            InputPurpose::SparringLevel | InputPurpose::SparringRounds => "{}".to_string(),
        }
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        role: AgentRole,
        memory_id: &str,
        input: &AgentInput,
    ) -> std::result::Result<AgentReply, AgentCallError> {
        let was_live = self
            .memory
            .get(role)
            .await
            .is_some_and(|s| s.pseudonymous_id == memory_id);
        self.calls.lock().unwrap().push(RecordedCall {
            role,
            memory_id: memory_id.to_string(),
            input: input.clone(),
            was_live,
        });

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(AgentReply::new(text)),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(AgentReply::new(Self::canned(input.purpose))),
        }
    }
}

// Mock TranscriptStore that can be switched offline
struct FlakyStore {
    inner: InMemoryTranscriptStore,
    offline: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: InMemoryTranscriptStore::new(),
            offline: AtomicBool::new(false),
        }
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> std::result::Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::unavailable("disk unplugged"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TranscriptStore for FlakyStore {
    async fn allocate(&self, id: &str, at: DateTime<Utc>) -> std::result::Result<(), StorageError> {
        self.check()?;
        self.inner.allocate(id, at).await
    }

    async fn append(&self, id: &str, turns: &[ChatTurn]) -> std::result::Result<(), StorageError> {
        self.check()?;
        self.inner.append(id, turns).await
    }

    async fn read_all(&self, id: &str) -> std::result::Result<Vec<ChatTurn>, StorageError> {
        self.check()?;
        self.inner.read_all(id).await
    }

    async fn clear(&self, id: &str) -> std::result::Result<(), StorageError> {
        self.check()?;
        self.inner.clear(id).await
    }

    async fn delete_key(&self, id: &str) -> std::result::Result<(), StorageError> {
        self.check()?;
        self.inner.delete_key(id).await
    }

    async fn list_keys(&self) -> std::result::Result<Vec<TranscriptKey>, StorageError> {
        self.check()?;
        self.inner.list_keys().await
    }
}

fn planner_json(count: usize) -> String {
    let scenarios: Vec<String> = (1..=count)
        .map(|i| {
            format!(
                r#"{{"title": "Option {i}", "summary": "Summary {i}", "focus": "Focus {i}", "agent_instructions": "Behave like counterpart {i}"}}"#
            )
        })
        .collect();
    format!(r#"{{"scenarios": [{}]}}"#, scenarios.join(", "))
}

fn team_lead() -> PreparationInput {
    PreparationInput::new("team lead", "conflict escalation", "stay calm")
}

struct Harness {
    backend: Arc<FlakyStore>,
    memory: Arc<AgentMemoryStore>,
    invoker: Arc<ScriptedInvoker>,
    controller: StageController,
}

fn harness_with(config: SparrConfig) -> Harness {
    let backend = Arc::new(FlakyStore::new());
    let memory = Arc::new(AgentMemoryStore::new(backend.clone()));
    let invoker = Arc::new(ScriptedInvoker::new(memory.clone()));
    let controller = StageController::new(invoker.clone(), memory.clone(), config).unwrap();
    Harness {
        backend,
        memory,
        invoker,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(SparrConfig::default())
}

async fn in_chat() -> Harness {
    let mut h = harness();
    h.controller.submit_preparation(team_lead()).await.unwrap();
    h.controller.select_scenario(1).await.unwrap();
    h
}

async fn in_feedback() -> Harness {
    let mut h = in_chat().await;
    h.controller.send_message("Can I finish my point?").await.unwrap();
    h.controller.end_chat().await.unwrap();
    h
}

#[tokio::test]
async fn test_team_lead_flow_reaches_scenario_chat() {
    let mut h = harness();

    let options = h.controller.submit_preparation(team_lead()).await.unwrap();
    assert_eq!(options.len(), 3);
    assert_eq!(h.controller.stage(), Stage::ScenarioSelection);
    assert_eq!(h.controller.context().preparation, Some(team_lead()));

    let chosen = h.controller.select_scenario(2).await.unwrap();
    assert_eq!(chosen, options[1]);

    let context = h.controller.context();
    assert_eq!(context.stage, Stage::ScenarioChat);
    assert_eq!(context.selected_scenario.as_ref(), Some(&options[1]));
    assert_eq!(context.turn_count, 0);

    let scenario = context.session(AgentRole::Scenario).unwrap().clone();
    assert_eq!(h.memory.get(AgentRole::Scenario).await, Some(scenario.clone()));
    assert!(h.memory.transcript(&scenario).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_planner_session_is_recreated_for_every_plan() {
    let mut h = harness();
    h.invoker.push(Step::Fail(AgentCallError::Failed("503".into())));

    assert!(h.controller.submit_preparation(team_lead()).await.is_err());
    let first = h.memory.get(AgentRole::Planner).await.unwrap();

    h.controller.submit_preparation(team_lead()).await.unwrap();
    let second = h.memory.get(AgentRole::Planner).await.unwrap();

    assert_ne!(first.pseudonymous_id, second.pseudonymous_id);
    let calls = h.invoker.calls();
    assert_eq!(calls[0].memory_id, first.pseudonymous_id);
    assert_eq!(calls[1].memory_id, second.pseudonymous_id);
}

#[tokio::test]
async fn test_parameter_p2_follows_turn_threshold() {
    let mut h = in_chat().await;
    let expected = [0.45, 0.40, 0.45];

    for (i, p2) in expected.iter().enumerate() {
        h.controller.send_message(&format!("message {i}")).await.unwrap();
        let params = h.controller.context().parameters;
        assert!((params.p2() - p2).abs() < EPS, "turn {}: p2 = {}", i + 1, params.p2());
        assert_eq!(params.p1(), 0.5);
        assert_eq!(params.p5(), 0.5);
    }

    assert_eq!(h.controller.context().turn_count, 3);
    let transcript = h.controller.transcript(AgentRole::Scenario).await.unwrap();
    assert_eq!(transcript.len(), 6);
    assert_eq!(transcript[0].text, "message 0");
    assert_eq!(transcript[1].speaker, Speaker::Agent);
}

#[tokio::test]
async fn test_scenario_turn_carries_instructions_and_parameters() {
    let mut h = in_chat().await;
    h.controller.send_message("  hello  ").await.unwrap();
    h.controller.send_message("again").await.unwrap();

    let turns: Vec<RecordedCall> = h
        .invoker
        .calls()
        .into_iter()
        .filter(|c| c.input.purpose == InputPurpose::Turn)
        .collect();
    assert_eq!(turns[0].input.user_message, "hello");
    assert_eq!(turns[0].input.instructions, "Behave like counterpart 1");
    // parameters are the ones before the update
    assert_eq!(turns[0].input.parameters, Some(ParameterVector::default()));
    assert!((turns[1].input.parameters.unwrap().p2() - 0.45).abs() < EPS);
}

#[tokio::test]
async fn test_learning_config_is_honoured() {
    let mut config = SparrConfig::default();
    config.learning.turn_threshold = 1;
    config.learning.step = 0.1;
    let mut h = harness_with(config);
    h.controller.start_prebuilt("steamroller").await.unwrap();

    h.controller.send_message("hi").await.unwrap();
    assert!((h.controller.context().parameters.p2() - 0.6).abs() < EPS);
}

#[tokio::test]
async fn test_entering_feedback_twice_invokes_agent_once() {
    let mut h = in_chat().await;
    h.controller.send_message("I would like to finish").await.unwrap();

    let first = h.controller.enter_feedback().await.unwrap();
    let second = h.controller.enter_feedback().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.invoker.calls_for(InputPurpose::Feedback), 1);
    assert_eq!(first.points, vec!["Calm tone", "Clear goal"]);
    assert_eq!(first.tip.as_deref(), Some("Pause before replying."));
    assert_eq!(h.controller.stage(), Stage::Feedback);
}

#[tokio::test]
async fn test_feedback_gets_rendered_transcript() {
    let mut h = in_chat().await;
    h.controller.send_message("Please let me finish.").await.unwrap();
    h.controller.end_chat().await.unwrap();

    let call = h
        .invoker
        .calls()
        .into_iter()
        .find(|c| c.role == AgentRole::Feedback)
        .unwrap();
    assert_eq!(
        call.input.user_message,
        "User: Please let me finish.\nCounterpart: I hear you."
    );
    assert_eq!(call.input.instructions, "Focus 1");
}

#[tokio::test]
async fn test_ending_chat_without_turns_skips_agent() {
    let mut h = in_chat().await;

    let feedback = h.controller.end_chat().await.unwrap();

    assert!(feedback.skipped);
    assert_eq!(h.invoker.calls_for(InputPurpose::Feedback), 0);
    assert!(h.memory.get(AgentRole::Feedback).await.is_some());
    assert_eq!(h.controller.stage(), Stage::Feedback);
}

#[tokio::test]
async fn test_feedback_failure_keeps_chat_open() {
    let mut h = in_chat().await;
    h.controller.send_message("hello").await.unwrap();
    h.invoker.push(Step::Fail(AgentCallError::Failed("overloaded".into())));

    let err = h.controller.end_chat().await.unwrap_err();

    assert!(err.is_agent_call());
    assert_eq!(h.controller.stage(), Stage::ScenarioChat);
    assert!(h.controller.context().feedback.is_none());
    // the chat can continue
    h.controller.send_message("still here").await.unwrap();
}

#[tokio::test]
async fn test_every_call_uses_the_live_session_of_its_role() {
    let mut h = in_chat().await;
    h.controller.request_opening_line().await.unwrap();
    h.controller.send_message("one").await.unwrap();
    h.controller.end_chat().await.unwrap();
    h.controller.opt_into_reflection().await.unwrap();
    h.controller.request_reflection_opening().await.unwrap();
    h.controller.send_reflection_message("it went ok").await.unwrap();

    let calls = h.invoker.calls();
    assert_eq!(calls.len(), 6);
    for call in calls {
        assert!(call.was_live, "{:?} called with a dead session", call.role);
        assert_eq!(parse_role(&call.memory_id), Some(call.role));
    }
}

#[tokio::test]
async fn test_reflection_leaves_learning_profile_alone() {
    let mut h = in_feedback().await;
    let before = h.controller.context().parameters;

    h.controller.opt_into_reflection().await.unwrap();
    h.controller.send_reflection_message("I felt rushed").await.unwrap();
    h.controller.send_reflection_message("but stayed calm").await.unwrap();

    let context = h.controller.context();
    assert_eq!(context.parameters, before);
    assert_eq!(context.turn_count, 1);
    assert_eq!(context.reflection_turn_count, 2);
    assert_eq!(
        h.controller.transcript(AgentRole::Reflection).await.unwrap().len(),
        4
    );
}

#[tokio::test]
async fn test_reflection_opening_reports_skipped_scenario() {
    let mut h = in_chat().await;
    h.controller.end_chat().await.unwrap();
    h.controller.opt_into_reflection().await.unwrap();

    let question = h.controller.request_reflection_opening().await.unwrap();
    assert_eq!(question, "How did that feel?");

    let call = h.invoker.calls().pop().unwrap();
    assert_eq!(call.input.purpose, InputPurpose::ReflectionOpening);
    assert!(call.input.scenario_skipped);

    let err = h.controller.request_reflection_opening().await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_opening_line_only_before_first_turn() {
    let mut h = in_chat().await;

    let line = h.controller.request_opening_line().await.unwrap();
    assert_eq!(line, "So, what did you want to talk about?");
    assert_eq!(h.controller.context().turn_count, 0);
    assert_eq!(h.controller.context().parameters, ParameterVector::default());

    let err = h.controller.request_opening_line().await.unwrap_err();
    assert!(err.is_validation());

    h.controller.send_message("hi").await.unwrap();
    let transcript = h.controller.transcript(AgentRole::Scenario).await.unwrap();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[0].speaker, Speaker::Agent);
}

#[tokio::test]
async fn test_restart_restores_defaults_and_erases_memory() {
    let mut h = in_feedback().await;
    h.controller.opt_into_reflection().await.unwrap();
    h.controller.send_reflection_message("thanks").await.unwrap();

    h.controller.restart().await.unwrap();

    assert_eq!(h.controller.context(), &SessionContext::new());
    assert!(h.memory.live_roles().await.is_empty());
    assert!(h.backend.inner.is_empty().await);
}

#[tokio::test]
async fn test_finish_keeps_feedback_and_erases_memory() {
    let mut h = in_feedback().await;

    h.controller.finish().await.unwrap();

    assert_eq!(h.controller.stage(), Stage::Completed);
    assert!(h.controller.context().active_sessions.is_empty());
    assert!(h.backend.inner.is_empty().await);
    match h.controller.view().unwrap() {
        StageView::Completed { feedback } => assert!(feedback.is_some()),
        other => panic!("unexpected view {other:?}"),
    }

    h.controller.restart().await.unwrap();
    assert_eq!(h.controller.stage(), Stage::Preparation);
}

#[tokio::test]
async fn test_illegal_actions_change_nothing() {
    let mut h = harness();

    let err = h.controller.send_message("hello").await.unwrap_err();
    assert_eq!(
        err,
        SparrError::invalid_transition(Stage::Preparation, "send_message")
    );
    assert!(h.controller.restart().await.unwrap_err().is_invalid_transition());
    assert!(h.controller.finish().await.unwrap_err().is_invalid_transition());
    assert!(h.controller.enter_feedback().await.unwrap_err().is_invalid_transition());

    let mut h = in_chat().await;
    let before = h.controller.context().clone();
    assert!(h.controller.select_scenario(1).await.unwrap_err().is_invalid_transition());
    assert!(h.controller.opt_into_reflection().await.unwrap_err().is_invalid_transition());
    assert!(h.controller.restart().await.unwrap_err().is_invalid_transition());
    assert_eq!(h.controller.context(), &before);
    assert_eq!(h.invoker.calls_for(InputPurpose::Turn), 0);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_call() {
    let mut h = harness();
    let err = h
        .controller
        .submit_preparation(PreparationInput::new("lead", " ", "calm"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(h.invoker.calls().is_empty());
    assert!(h.memory.get(AgentRole::Planner).await.is_none());

    h.controller.submit_preparation(team_lead()).await.unwrap();
    assert!(h.controller.select_scenario(0).await.unwrap_err().is_validation());
    assert!(h.controller.select_scenario(4).await.unwrap_err().is_validation());
    assert_eq!(h.controller.stage(), Stage::ScenarioSelection);

    h.controller.select_scenario(3).await.unwrap();
    assert!(h.controller.send_message("   ").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_malformed_plan_stays_in_preparation() {
    let mut h = harness();
    h.invoker.push(Step::Reply(planner_json(2)));

    let err = h.controller.submit_preparation(team_lead()).await.unwrap_err();

    assert!(matches!(
        err,
        SparrError::AgentCall(AgentCallError::Malformed(_))
    ));
    assert_eq!(h.controller.stage(), Stage::Preparation);
    assert!(h.controller.context().preparation.is_none());
    assert!(h.controller.context().scenario_options.is_empty());
}

#[tokio::test]
async fn test_surplus_planner_options_are_truncated() {
    let mut h = harness();
    h.invoker.push(Step::Reply(format!("Here you go:\n{}", planner_json(5))));

    let options = h.controller.submit_preparation(team_lead()).await.unwrap();
    assert_eq!(options.len(), 3);
    assert_eq!(options[2].title, "Option 3");
}

#[tokio::test]
async fn test_empty_reply_is_malformed_and_not_committed() {
    let mut h = in_chat().await;
    h.invoker.push(Step::Reply("   ".into()));

    let err = h.controller.send_message("hello").await.unwrap_err();

    assert_eq!(
        err,
        SparrError::AgentCall(AgentCallError::Malformed("empty reply".into()))
    );
    assert_eq!(h.controller.context().turn_count, 0);
    assert!(h.controller.transcript(AgentRole::Scenario).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_commits_nothing() {
    let mut config = SparrConfig::default();
    config.agent = AgentConfig { timeout_secs: 5 };
    let mut h = harness_with(config);
    h.controller.start_prebuilt("silent_wall").await.unwrap();
    h.invoker.push(Step::Hang);

    let err = h.controller.send_message("hello?").await.unwrap_err();

    assert_eq!(
        err,
        SparrError::AgentCall(AgentCallError::Timeout(Duration::from_secs(5)))
    );
    assert!(err.is_retryable());
    assert_eq!(h.controller.context().turn_count, 0);
    assert_eq!(h.controller.context().parameters, ParameterVector::default());
    assert!(h.controller.transcript(AgentRole::Scenario).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_commits_nothing_and_installs_fresh_token() {
    let mut h = in_chat().await;
    h.invoker.push(Step::Hang);
    let token = h.controller.cancellation_token();

    let (result, ()) = tokio::join!(h.controller.send_message("hello"), async {
        tokio::task::yield_now().await;
        token.cancel();
    });
    let err = result.unwrap_err();

    assert_eq!(err, SparrError::AgentCall(AgentCallError::Cancelled));
    assert_eq!(h.controller.context().turn_count, 0);
    assert!(h.controller.transcript(AgentRole::Scenario).await.unwrap().is_empty());

    assert!(!h.controller.cancellation_token().is_cancelled());
    h.controller.send_message("hello again").await.unwrap();
    assert_eq!(h.controller.context().turn_count, 1);
}

#[tokio::test]
async fn test_unused_cancellation_does_not_reach_next_call() {
    let mut h = harness();
    h.controller.submit_preparation(team_lead()).await.unwrap();
    h.controller.cancellation_token().cancel();

    h.controller.select_scenario(1).await.unwrap();
    h.controller.send_message("hello").await.unwrap();

    assert_eq!(h.controller.context().turn_count, 1);
}

#[tokio::test]
async fn test_arm_cancellation_replaces_cancelled_token() {
    let mut h = in_chat().await;
    h.controller.cancellation_token().cancel();

    let armed = h.controller.arm_cancellation();

    assert!(!armed.is_cancelled());
    assert!(!h.controller.cancellation_token().is_cancelled());
    h.controller.send_message("hello").await.unwrap();
}

#[tokio::test]
async fn test_storage_failure_on_select_keeps_stage() {
    let mut h = harness();
    h.controller.submit_preparation(team_lead()).await.unwrap();
    let before = h.controller.context().clone();

    h.backend.set_offline(true);
    let err = h.controller.select_scenario(1).await.unwrap_err();
    h.backend.set_offline(false);

    assert!(err.is_storage());
    assert_eq!(h.controller.context(), &before);
    assert!(h.memory.get(AgentRole::Scenario).await.is_none());

    h.controller.select_scenario(1).await.unwrap();
    assert_eq!(h.controller.stage(), Stage::ScenarioChat);
}

#[tokio::test]
async fn test_storage_failure_on_restart_keeps_references_consistent() {
    let mut h = in_feedback().await;

    h.backend.set_offline(true);
    let err = h.controller.restart().await.unwrap_err();
    h.backend.set_offline(false);

    assert!(err.is_storage());
    assert_eq!(h.controller.stage(), Stage::Feedback);
    for (role, session) in &h.controller.context().active_sessions {
        assert_eq!(h.memory.get(*role).await.as_ref(), Some(session));
    }

    h.controller.restart().await.unwrap();
    assert!(h.memory.live_roles().await.is_empty());
}

#[tokio::test]
async fn test_prebuilt_skips_planning() {
    let mut h = harness();

    let option = h.controller.start_prebuilt("guilt_tripper").await.unwrap();

    assert_eq!(h.controller.stage(), Stage::ScenarioChat);
    assert_eq!(option.opponent_name.as_deref(), Some("Leif"));
    assert!(h.controller.context().preparation.is_some());
    assert!(h.invoker.calls().is_empty());
    assert!(h.memory.get(AgentRole::Planner).await.is_none());

    let mut h = harness();
    assert!(h.controller.start_prebuilt("nope").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_handle_dispatches_actions() {
    let mut h = harness();

    let outcome = h
        .controller
        .handle(UserAction::SubmitPreparation(team_lead()))
        .await
        .unwrap();
    assert!(matches!(outcome, ActionOutcome::OptionsReady { ref options } if options.len() == 3));

    let outcome = h.controller.handle(UserAction::SelectScenario(2)).await.unwrap();
    assert!(matches!(outcome, ActionOutcome::ScenarioStarted { .. }));

    let outcome = h
        .controller
        .handle(UserAction::SendMessage("hi".into()))
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::AgentSaid { text: "I hear you.".into() });

    let outcome = h.controller.handle(UserAction::ViewFeedback).await.unwrap();
    assert!(matches!(outcome, ActionOutcome::FeedbackReady { .. }));

    assert_eq!(
        h.controller.handle(UserAction::Finish).await.unwrap(),
        ActionOutcome::Completed
    );
    assert_eq!(
        h.controller.handle(UserAction::Restart).await.unwrap(),
        ActionOutcome::Restarted
    );
}

#[tokio::test]
async fn test_view_follows_stage() {
    let mut h = in_chat().await;
    h.controller.send_message("hi").await.unwrap();

    match h.controller.view().unwrap() {
        StageView::ScenarioChat {
            turn_count,
            parameters,
            ..
        } => {
            assert_eq!(turn_count, 1);
            assert!((parameters.p2() - 0.45).abs() < EPS);
        }
        other => panic!("unexpected view {other:?}"),
    }
    assert_eq!(h.controller.view().unwrap().stage(), Stage::ScenarioChat);
}

#[tokio::test]
async fn test_shutdown_erases_everything_from_any_stage() {
    let mut h = in_chat().await;
    h.controller.send_message("hi").await.unwrap();

    h.controller.shutdown().await.unwrap();

    assert!(h.memory.live_roles().await.is_empty());
    assert!(h.backend.inner.is_empty().await);
    assert_eq!(h.controller.stage(), Stage::Preparation);
}

#[tokio::test]
async fn test_resume_continues_saved_chat() {
    let mut h = in_chat().await;
    h.controller.send_message("first").await.unwrap();
    let saved = h.controller.context().clone();

    // a new process sees only the durable store
    let memory = Arc::new(AgentMemoryStore::new(h.backend.clone()));
    let invoker = Arc::new(ScriptedInvoker::new(memory.clone()));
    let mut resumed =
        StageController::resume(invoker.clone(), memory.clone(), SparrConfig::default(), saved.clone())
            .await
            .unwrap();

    assert_eq!(resumed.context(), &saved);
    resumed.send_message("second").await.unwrap();
    assert_eq!(resumed.context().turn_count, 2);
    assert_eq!(resumed.transcript(AgentRole::Scenario).await.unwrap().len(), 4);
    assert!(invoker.calls().iter().all(|c| c.was_live));
}

#[tokio::test]
async fn test_resume_without_backing_memory_starts_over() {
    let mut h = in_chat().await;
    h.controller.send_message("first").await.unwrap();
    let saved = h.controller.context().clone();
    h.controller.shutdown().await.unwrap();

    let memory = Arc::new(AgentMemoryStore::new(h.backend.clone()));
    let invoker = Arc::new(ScriptedInvoker::new(memory.clone()));
    let resumed = StageController::resume(invoker, memory.clone(), SparrConfig::default(), saved)
        .await
        .unwrap();

    assert_eq!(resumed.context(), &SessionContext::new());
    assert!(memory.live_roles().await.is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let backend = Arc::new(InMemoryTranscriptStore::new());
    let memory = Arc::new(AgentMemoryStore::new(backend));
    let invoker = Arc::new(ScriptedInvoker::new(memory.clone()));
    let mut config = SparrConfig::default();
    config.learning.step = 0.0;

    let result = StageController::new(invoker, memory, config);
    assert!(matches!(result, Err(SparrError::Config(_))));
}
