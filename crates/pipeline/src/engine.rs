//! The generic pipeline: context → instruction → gateway → extraction →
//! validation → merge (or produce).
//!
//! Every call site runs the same engine with its own [`CallSite`]. Each run
//! gets an invocation id, and the stage trail is logged and returned.

use chrono::NaiveDate;
use fieldscribe_config::UnknownFieldPolicy;
use fieldscribe_core::{EntitySnapshot, Error, ExtractionFailure, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compiler::{CallContext, InstructionCompiler, Instructions};
use crate::extractor::{self, ExtractionOutcome};
use crate::gateway::ModelGateway;
use crate::merge::{self, PolicyTable};
use crate::narrative::NarrativeContext;
use crate::schema::Schema;
use crate::stage::{Stage, StageTracker};
use crate::validation::{self, ValidationGate};

/// Everything that distinguishes one call site from another.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub name: &'static str,
    pub schema: Schema,
    pub policies: PolicyTable,
    pub instructions: Instructions,
    /// The merged or produced object must hold every required field.
    pub require_complete: bool,
    /// Treat a reply with no payload at all as an empty update.
    pub empty_on_missing_payload: bool,
    /// An explicit `null` or `""` clears an optional field instead of
    /// meaning "not mentioned".
    pub clear_on_empty: bool,
    /// Overrides the gateway's default temperature.
    pub temperature: Option<f32>,
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct Run<T> {
    pub value: T,
    pub trail: Vec<Stage>,
    pub invocation_id: Uuid,
}

impl<T> Run<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Run<U> {
        Run {
            value: f(self.value),
            trail: self.trail,
            invocation_id: self.invocation_id,
        }
    }
}

/// Output of an update run.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutput {
    /// The new snapshot (the input one is untouched).
    pub snapshot: EntitySnapshot,
    /// The validated changes that were merged.
    pub changes: Map<String, Value>,
}

/// Output of a produce run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProduceOutput {
    pub payload: Map<String, Value>,
    /// True when the history was empty and the gateway was skipped.
    pub short_circuited: bool,
}

/// Per-run bookkeeping: id, variant name and stage trail.
struct Invocation {
    id: Uuid,
    variant: &'static str,
    tracker: StageTracker,
}

impl Invocation {
    fn start(variant: &'static str) -> Self {
        let id = Uuid::new_v4();
        info!(variant, invocation_id = %id, "Pipeline run started");
        Self {
            id,
            variant,
            tracker: StageTracker::new(),
        }
    }

    fn step(&mut self, stage: Stage) -> Result<()> {
        self.tracker
            .advance(stage)
            .map_err(|e| Error::Internal(e.to_string()))?;
        debug!(variant = self.variant, invocation_id = %self.id, stage = %stage, "Stage reached");
        Ok(())
    }

    /// Record a terminal failure, then hand the error back.
    fn fail(&mut self, stage: Stage, error: Error) -> Error {
        if let Err(e) = self.step(stage) {
            return e;
        }
        warn!(
            variant = self.variant,
            invocation_id = %self.id,
            trail = %self.tracker.render(),
            error = %error,
            "Pipeline run failed"
        );
        error
    }

    fn finish<T>(self, value: T) -> Run<T> {
        info!(
            variant = self.variant,
            invocation_id = %self.id,
            trail = %self.tracker.render(),
            "Pipeline run finished"
        );
        Run {
            value,
            trail: self.tracker.into_trail(),
            invocation_id: self.id,
        }
    }
}

pub struct Pipeline {
    gateway: ModelGateway,
    unknown_fields: UnknownFieldPolicy,
}

impl Pipeline {
    pub fn new(gateway: ModelGateway) -> Self {
        Self {
            gateway,
            unknown_fields: UnknownFieldPolicy::default(),
        }
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Extract an update from `request` and merge it into `snapshot`.
    pub async fn run_update(
        &self,
        site: &CallSite,
        snapshot: &EntitySnapshot,
        request: &str,
        today: NaiveDate,
    ) -> Result<Run<UpdateOutput>> {
        let mut run = Invocation::start(site.name);
        run.step(Stage::ContextBuilt)?;

        let instructions = InstructionCompiler::new(&site.instructions, &site.schema).compile(
            CallContext::Snapshot(snapshot),
            request,
            today,
        );
        run.step(Stage::InstructionCompiled)?;

        let payload = self.invoke_and_extract(site, &mut run, &instructions).await?;

        let update = match ValidationGate::new(&site.schema, self.unknown_fields)
            .clearing(site.clear_on_empty)
            .validate(payload) {
            Ok(update) => update,
            Err(e) => return Err(run.fail(Stage::ValidationFailed, e.into())),
        };
        run.step(Stage::Validated)?;

        let changes = update.fields().clone();
        let merged = merge::merge(snapshot, update, &site.policies);
        if site.require_complete
            && let Err(e) = validation::check_complete(&merged, &site.schema)
        {
            return Err(run.fail(Stage::ValidationFailed, e.into()));
        }
        run.step(Stage::Merged)?;

        Ok(run.finish(UpdateOutput {
            snapshot: merged,
            changes,
        }))
    }

    /// Produce an output-only object from a narrative of prior interactions.
    ///
    /// An empty history never reaches the gateway: `fallback` is returned.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_produce(
        &self,
        site: &CallSite,
        subject: &str,
        history: &NarrativeContext,
        facts: &[(String, String)],
        request: &str,
        today: NaiveDate,
        fallback: impl FnOnce() -> Map<String, Value>,
    ) -> Result<Run<ProduceOutput>> {
        let mut run = Invocation::start(site.name);
        run.step(Stage::ContextBuilt)?;

        if history.is_empty() {
            info!(variant = site.name, invocation_id = %run.id, "No history, returning fixed result");
            run.step(Stage::Produced)?;
            return Ok(run.finish(ProduceOutput {
                payload: fallback(),
                short_circuited: true,
            }));
        }

        let instructions = InstructionCompiler::new(&site.instructions, &site.schema).compile(
            CallContext::Narrative {
                subject,
                context: history,
                facts,
            },
            request,
            today,
        );
        run.step(Stage::InstructionCompiled)?;

        let payload = self.invoke_and_extract(site, &mut run, &instructions).await?;

        let update = match ValidationGate::new(&site.schema, self.unknown_fields)
            .clearing(site.clear_on_empty)
            .validate(payload) {
            Ok(update) => update,
            Err(e) => return Err(run.fail(Stage::ValidationFailed, e.into())),
        };
        run.step(Stage::Validated)?;

        let produced = EntitySnapshot::from_fields(update.into_fields());
        if site.require_complete
            && let Err(e) = validation::check_complete(&produced, &site.schema)
        {
            return Err(run.fail(Stage::ValidationFailed, e.into()));
        }
        run.step(Stage::Produced)?;

        Ok(run.finish(ProduceOutput {
            payload: produced.fields,
            short_circuited: false,
        }))
    }

    async fn invoke_and_extract(
        &self,
        site: &CallSite,
        run: &mut Invocation,
        instructions: &str,
    ) -> Result<Map<String, Value>> {
        let raw = match self.gateway.complete_with(instructions, site.temperature).await {
            Ok(raw) => raw,
            Err(e) => return Err(run.fail(Stage::GatewayFailed, e.into())),
        };
        run.step(Stage::GatewayInvoked)?;

        let payload = match extractor::extract(&raw) {
            ExtractionOutcome::Parsed(payload) => payload,
            ExtractionOutcome::Failed(ExtractionFailure::NoPayload { .. })
                if site.empty_on_missing_payload =>
            {
                warn!(
                    variant = site.name,
                    invocation_id = %run.id,
                    "Reply held no payload, treating it as an empty update"
                );
                Map::new()
            }
            ExtractionOutcome::Failed(failure) => {
                return Err(run.fail(Stage::ExtractionFailed, failure.into()));
            }
        };
        run.step(Stage::Parsed)?;
        Ok(payload)
    }
}
