// gateway.rs: The authorization gateway.
//
// Every step a planner asks for goes through the same pipeline:
//
//   token validate → policy allow → param schema check → executor (bounded)
//   → policy consume
//
// Any stage can refuse the step; the first refusal is returned as a
// StepFailure and nothing after it runs. Quota is consumed only after the
// executor reports success.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use fg_actions::{ActionRegistry, Clock, Executor, Params, Plan};
use fg_capability::{SigningKey, TokenAuthority};
use fg_policy::{Actor, ActorHistory, PolicyEngine};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, StepFailure};
use crate::report::{RunReport, StepReport};
use crate::run::{PlanRun, PlanRunState};

pub struct AuthorizationGateway {
    registry: ActionRegistry,
    policy: PolicyEngine,
    authority: TokenAuthority,
    executor: Arc<dyn Executor>,
    executor_timeout: Duration,
}

impl AuthorizationGateway {
    pub fn new(
        registry: ActionRegistry,
        policy: PolicyEngine,
        authority: TokenAuthority,
        executor: Arc<dyn Executor>,
        executor_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            policy,
            authority,
            executor,
            executor_timeout,
        }
    }

    /// Assemble a gateway from config, reading the signing key from the
    /// environment variable the config names.
    pub fn from_config(
        config: &GatewayConfig,
        registry: ActionRegistry,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GatewayError> {
        let key = SigningKey::from_env(&config.signing_key_env)?;
        Self::with_key(config, key, registry, executor, clock)
    }

    /// Assemble a gateway from config with an explicit signing key.
    pub fn with_key(
        config: &GatewayConfig,
        key: SigningKey,
        registry: ActionRegistry,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GatewayError> {
        let policy = PolicyEngine::with_parts(
            config.policy.clone(),
            clock.clone(),
            Arc::new(ActorHistory::new()),
        )?;
        let authority = TokenAuthority::new(key, config.token_config(), clock)?;

        tracing::info!(
            actions = registry.len(),
            replay_scope = %config.replay_scope,
            token_ttl_secs = config.token_ttl_secs,
            executor_timeout_ms = config.executor_timeout_ms,
            "authorization gateway ready"
        );
        Ok(Self::new(
            registry,
            policy,
            authority,
            executor,
            config.executor_timeout(),
        ))
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn authority(&self) -> &TokenAuthority {
        &self.authority
    }

    /// Accept a plan and mint its token.
    ///
    /// An empty plan completes immediately without a token.
    pub fn capture(&self, subject: &str, plan: Plan) -> PlanRun {
        let mut run = PlanRun::new(subject, plan);

        // Transitions out of Captured are all legal, so these cannot fail.
        let moved = if run.plan.is_empty() {
            tracing::info!(run_id = %run.run_id, subject, "empty plan; nothing to authorize");
            run.transition(PlanRunState::Completed)
        } else {
            match self.authority.mint(subject, &run.plan) {
                Ok(token) => run.authorize(token),
                Err(e) => {
                    tracing::error!(run_id = %run.run_id, subject, error = %e, "token mint failed");
                    run.transition(PlanRunState::Denied {
                        reason: e.to_string(),
                    })
                }
            }
        };
        if let Err(e) = moved {
            tracing::error!(run_id = %run.run_id, error = %e, "capture left run in unexpected state");
        }
        run
    }

    /// Authorize and dispatch one call.
    pub async fn execute_step(
        &self,
        token: &str,
        action: &str,
        params: &Params,
        caller: &Actor,
    ) -> Result<Value, StepFailure> {
        let (token_id, bound_step) = self
            .authority
            .validate(token, action, params, Some(&caller.identity))
            .into_result()?;

        let decision = self.policy.allow(caller, action, params);
        if !decision.is_allowed() {
            tracing::warn!(
                %token_id,
                caller = %caller.identity,
                action,
                reason = decision.reason(),
                "policy denied step"
            );
            return Err(StepFailure::PolicyDenied {
                reason: decision.reason().to_string(),
            });
        }

        self.registry.validate_params(action, params)?;

        let output = match tokio::time::timeout(
            self.executor_timeout,
            self.executor.execute(action, params),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(%token_id, action, error = %e, "executor failed");
                return Err(StepFailure::ExecutorFailed {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                let after_ms = self.executor_timeout.as_millis() as u64;
                tracing::warn!(%token_id, action, after_ms, "executor timed out");
                return Err(StepFailure::TimedOut { after_ms });
            }
        };

        self.policy.consume(caller, action, params);
        tracing::info!(
            %token_id,
            bound_step,
            caller = %caller.identity,
            action,
            "step executed"
        );
        Ok(output)
    }

    /// Run every step of an authorized plan, stopping at the first failure.
    ///
    /// Steps after a failure are reported as skipped. A run that is already
    /// complete because its plan was empty yields an empty report.
    pub async fn run(&self, run: &mut PlanRun, caller: &Actor) -> Result<RunReport, GatewayError> {
        if run.state == PlanRunState::Completed && run.plan.is_empty() {
            return Ok(report_for(run, Vec::new()));
        }

        run.transition(PlanRunState::Executing)?;
        let token = run.token.clone().ok_or(GatewayError::MissingToken(run.run_id))?;

        let mut steps = Vec::with_capacity(run.plan.steps.len());
        let mut aborted = false;
        for (index, step) in run.plan.steps.iter().enumerate() {
            if aborted {
                steps.push(StepReport::skipped(index, &step.action));
                continue;
            }
            match self
                .execute_step(token.as_str(), &step.action, &step.params, caller)
                .await
            {
                Ok(output) => steps.push(StepReport::succeeded(index, &step.action, output)),
                Err(failure) => {
                    tracing::warn!(
                        run_id = %run.run_id,
                        index,
                        action = %step.action,
                        failure = %failure,
                        "step failed; aborting remaining steps"
                    );
                    steps.push(StepReport::failed(index, &step.action, failure));
                    aborted = true;
                }
            }
        }

        run.transition(PlanRunState::Completed)?;
        tracing::info!(
            run_id = %run.run_id,
            steps = steps.len(),
            aborted,
            "plan run completed"
        );
        Ok(report_for(run, steps))
    }
}

fn report_for(run: &PlanRun, steps: Vec<StepReport>) -> RunReport {
    RunReport {
        run_id: run.run_id,
        subject: run.subject.clone(),
        state: run.state.clone(),
        steps,
    }
}
