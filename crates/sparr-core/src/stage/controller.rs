use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::action::{ActionOutcome, StageView, UserAction};
use super::context::SessionContext;
use super::model::Stage;
use crate::agent::{AgentInput, AgentInvoker, AgentRole, InputPurpose, call_bounded};
use crate::config::SparrConfig;
use crate::error::{AgentCallError, Result, SparrError, StorageError};
use crate::learning::ParameterVector;
use crate::memory::{AgentMemoryStore, ChatTurn, MemorySession, Speaker};
use crate::scenario::{
    FeedbackResult, PreparationInput, ScenarioOption, find_prebuilt, parse_scenario_options,
};

/// Drives one user through the stages.
///
/// `StageController` is responsible for:
/// - Rejecting actions that are not legal in the current stage
/// - Recreating each role's memory session at the right transition
/// - Bounding and cancelling agent calls
/// - Committing turns and parameter updates only after a call succeeded
///
/// Every action takes `&mut self`, so at most one agent call is in flight.
pub struct StageController {
    context: SessionContext,
    memory: Arc<AgentMemoryStore>,
    invoker: Arc<dyn AgentInvoker>,
    config: SparrConfig,
    /// Cancels the in-flight agent call; replaced after each cancellation.
    cancel: CancellationToken,
}

impl StageController {
    /// Creates a controller for a fresh run.
    ///
    /// # Errors
    ///
    /// Returns [`SparrError::Config`] if `config` does not validate.
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        memory: Arc<AgentMemoryStore>,
        config: SparrConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            context: SessionContext::new(),
            memory,
            invoker,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Continues a run saved by a previous process.
    ///
    /// Persisted memory sessions are restored first. References in `saved`
    /// that the store cannot back are dropped, and sessions the store holds
    /// that `saved` does not reference are erased. If the saved stage can no
    /// longer continue, the run starts over from preparation.
    pub async fn resume(
        invoker: Arc<dyn AgentInvoker>,
        memory: Arc<AgentMemoryStore>,
        config: SparrConfig,
        saved: SessionContext,
    ) -> Result<Self> {
        let mut controller = Self::new(invoker, memory, config)?;
        controller.memory.restore().await?;
        controller.adopt(saved).await?;
        Ok(controller)
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn stage(&self) -> Stage {
        self.context.stage
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn config(&self) -> &SparrConfig {
        &self.config
    }

    /// Token that abandons the agent call of the action currently running.
    ///
    /// A cancelled token is replaced when the next action starts, so fetch it
    /// again before each action (see [`arm_cancellation`](Self::arm_cancellation)).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Token for the next action.
    ///
    /// A cancellation left over from an earlier action is discarded first,
    /// so it can only ever abandon the call this token is handed out for.
    pub fn arm_cancellation(&mut self) -> CancellationToken {
        self.discard_stale_cancellation();
        self.cancel.clone()
    }

    fn discard_stale_cancellation(&mut self) {
        if self.cancel.is_cancelled() {
            tracing::debug!(target: "sparr::stage", "Discarding stale cancellation");
            self.cancel = CancellationToken::new();
        }
    }

    /// What the front end should render for the current stage.
    pub fn view(&self) -> Result<StageView> {
        let context = &self.context;
        let view = match context.stage {
            Stage::Preparation => StageView::Preparation,
            Stage::ScenarioSelection => StageView::ScenarioSelection {
                options: context.scenario_options.clone(),
            },
            Stage::ScenarioChat => StageView::ScenarioChat {
                scenario: self.selected_scenario()?.clone(),
                turn_count: context.turn_count,
                parameters: context.parameters,
            },
            Stage::Feedback => StageView::Feedback {
                feedback: self.cached_feedback()?,
            },
            Stage::Reflection => StageView::Reflection {
                feedback: self.cached_feedback()?,
                turn_count: context.reflection_turn_count,
            },
            Stage::Completed => StageView::Completed {
                feedback: context.feedback.clone(),
            },
        };
        Ok(view)
    }

    /// Transcript of the run's live session for `role`.
    pub async fn transcript(&self, role: AgentRole) -> Result<Vec<ChatTurn>> {
        let session = self.verified_session(role).await?;
        Ok(self.memory.transcript(&session).await?)
    }

    // ============================================================================
    // Dispatch
    // ============================================================================

    /// Applies a [`UserAction`] coming from the front end.
    pub async fn handle(&mut self, action: UserAction) -> Result<ActionOutcome> {
        tracing::debug!(target: "sparr::stage", stage = %self.context.stage, action = action.name(), "Handling action");
        match action {
            UserAction::SubmitPreparation(input) => {
                let options = self.submit_preparation(input).await?;
                Ok(ActionOutcome::OptionsReady { options })
            }
            UserAction::StartPrebuilt(id) => {
                let scenario = self.start_prebuilt(&id).await?;
                Ok(ActionOutcome::ScenarioStarted { scenario })
            }
            UserAction::SelectScenario(index) => {
                let scenario = self.select_scenario(index).await?;
                Ok(ActionOutcome::ScenarioStarted { scenario })
            }
            UserAction::RequestOpeningLine => {
                let text = self.request_opening_line().await?;
                Ok(ActionOutcome::AgentSaid { text })
            }
            UserAction::SendMessage(text) => {
                let text = self.send_message(&text).await?;
                Ok(ActionOutcome::AgentSaid { text })
            }
            UserAction::EndChat => {
                let feedback = self.end_chat().await?;
                Ok(ActionOutcome::FeedbackReady { feedback })
            }
            UserAction::ViewFeedback => {
                let feedback = self.enter_feedback().await?;
                Ok(ActionOutcome::FeedbackReady { feedback })
            }
            UserAction::OptIntoReflection => {
                self.opt_into_reflection().await?;
                Ok(ActionOutcome::ReflectionStarted)
            }
            UserAction::RequestReflectionOpening => {
                let text = self.request_reflection_opening().await?;
                Ok(ActionOutcome::AgentSaid { text })
            }
            UserAction::SendReflectionMessage(text) => {
                let text = self.send_reflection_message(&text).await?;
                Ok(ActionOutcome::AgentSaid { text })
            }
            UserAction::Finish => {
                self.finish().await?;
                Ok(ActionOutcome::Completed)
            }
            UserAction::Restart => {
                self.restart().await?;
                Ok(ActionOutcome::Restarted)
            }
        }
    }

    // ============================================================================
    // Preparation and selection
    // ============================================================================

    /// Plans three scenarios from the user's preparation input.
    ///
    /// The planner gets a brand-new memory session on every call. On any
    /// failure the run stays in preparation.
    pub async fn submit_preparation(
        &mut self,
        input: PreparationInput,
    ) -> Result<Vec<ScenarioOption>> {
        self.ensure_stage(&[Stage::Preparation], "submit_preparation")?;
        input.validate()?;
        let input = input.trimmed();

        self.open_session(AgentRole::Planner).await?;
        let request = AgentInput::new(InputPurpose::Plan, String::new())
            .with_preparation(Some(&input));
        let raw = self.call_agent(AgentRole::Planner, &request).await?;
        let options = parse_scenario_options(&raw)?;

        self.context.preparation = Some(input);
        self.context.scenario_options = options.clone();
        self.advance(Stage::ScenarioSelection);
        Ok(options)
    }

    /// Starts the chat with option `index` (1-based).
    pub async fn select_scenario(&mut self, index: usize) -> Result<ScenarioOption> {
        self.ensure_stage(&[Stage::ScenarioSelection], "select_scenario")?;
        let count = self.context.scenario_options.len();
        let option = index
            .checked_sub(1)
            .and_then(|i| self.context.scenario_options.get(i))
            .cloned()
            .ok_or_else(|| {
                SparrError::validation(format!("scenario must be between 1 and {count}, got {index}"))
            })?;

        self.begin_scenario(option.clone(), None).await?;
        Ok(option)
    }

    /// Skips planning and starts a catalogue scenario.
    pub async fn start_prebuilt(&mut self, id: &str) -> Result<ScenarioOption> {
        self.ensure_stage(&[Stage::Preparation], "start_prebuilt")?;
        let prebuilt = find_prebuilt(id)
            .ok_or_else(|| SparrError::validation(format!("unknown prebuilt scenario '{id}'")))?;

        self.begin_scenario(prebuilt.option.clone(), Some(prebuilt.preparation))
            .await?;
        Ok(prebuilt.option)
    }

    async fn begin_scenario(
        &mut self,
        option: ScenarioOption,
        preparation: Option<PreparationInput>,
    ) -> Result<()> {
        self.open_session(AgentRole::Scenario).await?;

        if let Some(preparation) = preparation {
            self.context.preparation = Some(preparation);
        }
        self.context.selected_scenario = Some(option);
        self.context.turn_count = 0;
        self.advance(Stage::ScenarioChat);
        Ok(())
    }

    // ============================================================================
    // Scenario chat
    // ============================================================================

    /// Lets the counterpart open the conversation.
    ///
    /// Only allowed before the first exchange. The line is stored as an
    /// agent-only turn and does not count as a turn.
    pub async fn request_opening_line(&mut self) -> Result<String> {
        self.ensure_stage(&[Stage::ScenarioChat], "request_opening_line")?;
        let session = self.verified_session(AgentRole::Scenario).await?;
        if self.context.turn_count > 0 || self.memory.turn_count(&session).await? > 0 {
            return Err(SparrError::validation(
                "the opening line can only be requested before the conversation starts",
            ));
        }

        let request = self.scenario_input(InputPurpose::OpeningLine, String::new())?;
        let reply = self.call_agent(AgentRole::Scenario, &request).await?;
        self.commit(AgentRole::Scenario, &[ChatTurn::agent(reply.clone())])
            .await?;
        Ok(reply)
    }

    /// Sends one message to the counterpart and returns its answer.
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        self.ensure_stage(&[Stage::ScenarioChat], "send_message")?;
        let message = non_empty_message(text)?;

        let request = self.scenario_input(InputPurpose::Turn, message.clone())?;
        let reply = self.call_agent(AgentRole::Scenario, &request).await?;
        self.commit(
            AgentRole::Scenario,
            &[ChatTurn::user(message), ChatTurn::agent(reply.clone())],
        )
        .await?;

        self.context.turn_count += 1;
        self.context.parameters = self
            .context
            .parameters
            .update(self.context.turn_count, &self.config.learning);
        tracing::info!(
            target: "sparr::stage",
            turn_count = self.context.turn_count,
            p2 = self.context.parameters.p2(),
            "Scenario turn committed"
        );
        Ok(reply)
    }

    fn scenario_input(&self, purpose: InputPurpose, message: String) -> Result<AgentInput> {
        let scenario = self.selected_scenario()?;
        Ok(AgentInput::new(purpose, message)
            .with_instructions(scenario.agent_instructions.clone())
            .with_parameters(self.context.parameters)
            .with_preparation(self.context.preparation.as_ref())
            .with_scenario(Some(scenario)))
    }

    // ============================================================================
    // Feedback
    // ============================================================================

    /// Ends the scenario chat and produces feedback on it.
    ///
    /// A chat without a single user turn gets the canned skipped result and
    /// no agent call. If the feedback agent fails the chat stays open.
    pub async fn end_chat(&mut self) -> Result<FeedbackResult> {
        self.ensure_stage(&[Stage::ScenarioChat], "end_chat")?;

        let transcript = if self.context.turn_count == 0 {
            None
        } else {
            let scenario = self.verified_session(AgentRole::Scenario).await?;
            Some(self.memory.transcript(&scenario).await?)
        };

        self.open_session(AgentRole::Feedback).await?;
        let feedback = match transcript {
            None => FeedbackResult::skipped(),
            Some(turns) => {
                let scenario = self.selected_scenario()?;
                let request = AgentInput::new(InputPurpose::Feedback, render_transcript(&turns))
                    .with_instructions(scenario.focus.clone())
                    .with_preparation(self.context.preparation.as_ref())
                    .with_scenario(Some(scenario));
                let raw = self.call_agent(AgentRole::Feedback, &request).await?;
                let feedback = FeedbackResult::parse(&raw)?;
                self.commit(AgentRole::Feedback, &[ChatTurn::agent(feedback.text.clone())])
                    .await?;
                feedback
            }
        };

        self.context.feedback = Some(feedback.clone());
        self.advance(Stage::Feedback);
        Ok(feedback)
    }

    /// Feedback for the finished chat, computed at most once.
    pub async fn enter_feedback(&mut self) -> Result<FeedbackResult> {
        match self.context.stage {
            Stage::ScenarioChat => self.end_chat().await,
            Stage::Feedback => self.cached_feedback(),
            stage => Err(SparrError::invalid_transition(stage, "enter_feedback")),
        }
    }

    // ============================================================================
    // Reflection
    // ============================================================================

    pub async fn opt_into_reflection(&mut self) -> Result<()> {
        self.ensure_stage(&[Stage::Feedback], "opt_into_reflection")?;
        self.open_session(AgentRole::Reflection).await?;
        self.context.reflection_turn_count = 0;
        self.advance(Stage::Reflection);
        Ok(())
    }

    /// Asks the reflection agent for its first question.
    pub async fn request_reflection_opening(&mut self) -> Result<String> {
        self.ensure_stage(&[Stage::Reflection], "request_reflection_opening")?;
        let session = self.verified_session(AgentRole::Reflection).await?;
        if self.context.reflection_turn_count > 0 || self.memory.turn_count(&session).await? > 0 {
            return Err(SparrError::validation(
                "the reflection has already started",
            ));
        }

        let request = self.reflection_input(InputPurpose::ReflectionOpening, String::new());
        let reply = self.call_agent(AgentRole::Reflection, &request).await?;
        self.commit(AgentRole::Reflection, &[ChatTurn::agent(reply.clone())])
            .await?;
        Ok(reply)
    }

    /// Sends one reflection message. Leaves the learning profile alone.
    pub async fn send_reflection_message(&mut self, text: &str) -> Result<String> {
        self.ensure_stage(&[Stage::Reflection], "send_reflection_message")?;
        let message = non_empty_message(text)?;

        let request = self.reflection_input(InputPurpose::ReflectionTurn, message.clone());
        let reply = self.call_agent(AgentRole::Reflection, &request).await?;
        self.commit(
            AgentRole::Reflection,
            &[ChatTurn::user(message), ChatTurn::agent(reply.clone())],
        )
        .await?;

        self.context.reflection_turn_count += 1;
        tracing::info!(
            target: "sparr::stage",
            reflection_turn_count = self.context.reflection_turn_count,
            "Reflection turn committed"
        );
        Ok(reply)
    }

    fn reflection_input(&self, purpose: InputPurpose, message: String) -> AgentInput {
        AgentInput::new(purpose, message)
            .with_preparation(self.context.preparation.as_ref())
            .with_scenario(self.context.selected_scenario.as_ref())
            .with_scenario_skipped(self.context.scenario_skipped())
    }

    // ============================================================================
    // Ending a run
    // ============================================================================

    /// Closes the run: every memory session is erased, feedback stays
    /// visible.
    pub async fn finish(&mut self) -> Result<()> {
        self.ensure_stage(&[Stage::Feedback, Stage::Reflection], "finish")?;
        self.erase_all_sessions().await?;
        self.advance(Stage::Completed);
        Ok(())
    }

    /// Erases all memory and returns to preparation with default parameters.
    pub async fn restart(&mut self) -> Result<()> {
        if !self.context.stage.allows_restart() {
            return Err(SparrError::invalid_transition(self.context.stage, "restart"));
        }
        self.erase_all_sessions().await?;
        self.context = SessionContext::new();
        tracing::info!(target: "sparr::stage", "Run restarted");
        Ok(())
    }

    /// Erases all memory regardless of stage, for process teardown.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.erase_all_sessions().await?;
        self.context = SessionContext::new();
        tracing::info!(target: "sparr::stage", "Controller shut down");
        Ok(())
    }

    async fn erase_all_sessions(&mut self) -> Result<()> {
        let result = self.memory.delete_all().await;
        self.sync_sessions().await;
        result?;
        Ok(())
    }

    /// Drops references to sessions the store no longer holds.
    async fn sync_sessions(&mut self) {
        let mut kept = BTreeMap::new();
        for (role, session) in std::mem::take(&mut self.context.active_sessions) {
            if self.is_live(&session).await {
                kept.insert(role, session);
            }
        }
        self.context.active_sessions = kept;
    }

    // ============================================================================
    // Memory and agent plumbing
    // ============================================================================

    /// Replaces the memory session of `role` and references the new one.
    async fn open_session(&mut self, role: AgentRole) -> Result<MemorySession> {
        let session = self.memory.reset(role).await?;
        self.context.active_sessions.insert(role, session.clone());
        Ok(session)
    }

    /// The referenced session for `role`, checked against the store.
    async fn verified_session(&self, role: AgentRole) -> Result<MemorySession> {
        let session = self
            .context
            .session(role)
            .cloned()
            .ok_or_else(|| SparrError::internal(format!("no memory session for role {role}")))?;
        if !self.is_live(&session).await {
            return Err(StorageError::StaleSession {
                id: session.pseudonymous_id,
            }
            .into());
        }
        Ok(session)
    }

    async fn is_live(&self, session: &MemorySession) -> bool {
        self.memory
            .get(session.role)
            .await
            .is_some_and(|live| live.pseudonymous_id == session.pseudonymous_id)
    }

    async fn commit(&self, role: AgentRole, turns: &[ChatTurn]) -> Result<()> {
        let session = self.verified_session(role).await?;
        self.memory.append(&session, turns).await?;
        Ok(())
    }

    /// Invokes the agent for `role`, bounded by the configured timeout and
    /// the cancellation token. Returns the trimmed reply.
    async fn call_agent(&mut self, role: AgentRole, input: &AgentInput) -> Result<String> {
        let session = self.verified_session(role).await?;
        let result = call_bounded(
            self.invoker.as_ref(),
            role,
            session.id(),
            input,
            self.config.agent.timeout(),
            &self.cancel,
        )
        .await;
        if matches!(result, Err(AgentCallError::Cancelled)) {
            self.cancel = CancellationToken::new();
        }
        Ok(result?)
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    /// Rejects `action` outside `allowed` stages and starts the action with
    /// a live cancellation token.
    fn ensure_stage(&mut self, allowed: &[Stage], action: &'static str) -> Result<()> {
        self.discard_stale_cancellation();
        if allowed.contains(&self.context.stage) {
            Ok(())
        } else {
            Err(SparrError::invalid_transition(self.context.stage, action))
        }
    }

    fn advance(&mut self, to: Stage) {
        tracing::info!(target: "sparr::stage", from = %self.context.stage, to = %to, "Stage changed");
        self.context.stage = to;
    }

    fn selected_scenario(&self) -> Result<&ScenarioOption> {
        self.context
            .selected_scenario
            .as_ref()
            .ok_or_else(|| SparrError::internal("scenario chat without a selected scenario"))
    }

    fn cached_feedback(&self) -> Result<FeedbackResult> {
        self.context
            .feedback
            .clone()
            .ok_or_else(|| SparrError::internal("feedback stage without a feedback result"))
    }

    async fn adopt(&mut self, mut saved: SessionContext) -> Result<()> {
        let [p1, p2, p3, p4, p5] = saved.parameters.values();
        if ParameterVector::new(p1, p2, p3, p4, p5).is_err() {
            tracing::warn!(target: "sparr::stage", "Saved parameters out of range, using defaults");
            saved.parameters = ParameterVector::default();
        }

        let mut backed = BTreeMap::new();
        for (role, session) in std::mem::take(&mut saved.active_sessions) {
            if self.is_live(&session).await {
                backed.insert(role, session);
            } else {
                tracing::warn!(target: "sparr::stage", role = %role, "Saved memory session is gone");
            }
        }
        saved.active_sessions = backed;

        for role in self.memory.live_roles().await {
            if !saved.active_sessions.contains_key(&role) {
                self.memory.delete(role).await?;
            }
        }

        if resumable(&saved) {
            tracing::info!(target: "sparr::stage", stage = %saved.stage, "Run resumed");
            self.context = saved;
        } else {
            tracing::warn!(target: "sparr::stage", stage = %saved.stage, "Saved run cannot continue, starting over");
            self.context = saved;
            self.erase_all_sessions().await?;
            self.context = SessionContext::new();
        }
        Ok(())
    }
}

fn resumable(context: &SessionContext) -> bool {
    let has = |role: AgentRole| context.active_sessions.contains_key(&role);
    match context.stage {
        Stage::Preparation | Stage::Completed => true,
        Stage::ScenarioSelection => !context.scenario_options.is_empty(),
        Stage::ScenarioChat => context.selected_scenario.is_some() && has(AgentRole::Scenario),
        Stage::Feedback => context.feedback.is_some(),
        Stage::Reflection => context.feedback.is_some() && has(AgentRole::Reflection),
    }
}

fn non_empty_message(text: &str) -> Result<String> {
    let message = text.trim();
    if message.is_empty() {
        return Err(SparrError::validation("message must not be empty"));
    }
    Ok(message.to_string())
}

/// Plain-text rendering of a scenario transcript for the feedback agent.
fn render_transcript(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.speaker {
                Speaker::User => "User",
                Speaker::Agent => "Counterpart",
            };
            format!("{speaker}: {}", turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
