//! Interaction service: the five call sites wired to a record store.

use chrono::NaiveDate;
use fieldscribe_core::store::{HistoryPage, HistoryQuery, RecordStore};
use fieldscribe_core::{EntitySnapshot, Error, InteractionFields, InteractionRecord, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::engine::{Pipeline, Run, UpdateOutput};
use crate::narrative::{DEFAULT_WINDOW, NarrativeContext};
use crate::schema::Schema;
use crate::validation;
use crate::variants::{NextAction, Suggestions, Summary, converse, edit, log, suggest, summarize};

pub struct InteractionService {
    pipeline: Pipeline,
    store: Arc<dyn RecordStore>,
    history_window: usize,
    suggestion_temperature: f32,
}

impl InteractionService {
    pub fn new(pipeline: Pipeline, store: Arc<dyn RecordStore>) -> Self {
        Self {
            pipeline,
            store,
            history_window: DEFAULT_WINDOW,
            suggestion_temperature: 0.5,
        }
    }

    pub fn from_config(
        pipeline: Pipeline,
        store: Arc<dyn RecordStore>,
        config: &fieldscribe_config::PipelineConfig,
    ) -> Self {
        Self {
            pipeline: pipeline.with_unknown_fields(config.unknown_fields),
            store,
            history_window: config.history_window,
            suggestion_temperature: config.suggestion_temperature,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Extract a complete record from `statement` and store it.
    pub async fn log(&self, statement: &str, today: NaiveDate) -> Result<Run<InteractionRecord>> {
        let run = self
            .pipeline
            .run_update(&log::call_site(), &EntitySnapshot::new(), statement, today)
            .await?;
        let fields = InteractionFields::from_field_map(&run.value.snapshot.fields)?;
        let record = self.store.create(fields).await?;
        info!(id = record.id, hcp = %record.fields.hcp_name, "Interaction logged");
        Ok(run.map(|_| record))
    }

    /// Apply one chat message to a draft. Nothing is stored.
    pub async fn converse(
        &self,
        draft: &EntitySnapshot,
        message: &str,
        today: NaiveDate,
    ) -> Result<Run<UpdateOutput>> {
        self.pipeline
            .run_update(&converse::call_site(), draft, message, today)
            .await
    }

    /// Store a finished draft.
    pub async fn save_draft(&self, draft: &EntitySnapshot) -> Result<InteractionRecord> {
        validation::check_complete(draft, &Schema::interaction())?;
        let fields = InteractionFields::from_field_map(&draft.fields)?;
        Ok(self.store.create(fields).await?)
    }

    /// Apply a natural-language edit to a stored record.
    ///
    /// The write is rejected with a conflict if the record changed since it
    /// was read.
    pub async fn edit(&self, id: i64, command: &str, today: NaiveDate) -> Result<Run<InteractionRecord>> {
        let current = self
            .store
            .get(id)
            .await?
            .ok_or(fieldscribe_core::StoreError::NotFound(id))?;
        let snapshot = current.snapshot();

        let run = self
            .pipeline
            .run_update(&edit::call_site(), &snapshot, command, today)
            .await?;

        let edited = InteractionFields::from_field_map(&run.value.snapshot.fields)?;
        if edited == current.fields {
            info!(id, "Edit produced no changes");
            return Ok(run.map(|_| current));
        }

        let updated = self
            .store
            .apply_fields(id, &run.value.snapshot.fields, snapshot.version)
            .await?;
        info!(id, version = updated.version, "Interaction edited");
        Ok(run.map(|_| updated))
    }

    pub async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        Ok(self.store.fetch(query).await?)
    }

    /// Briefing on the most recent interactions with `hcp_name`.
    pub async fn summarize(&self, hcp_name: &str, today: NaiveDate) -> Result<Run<Summary>> {
        let records = self.recent(hcp_name).await?;
        let history = NarrativeContext::build(&records, self.history_window);

        let run = self
            .pipeline
            .run_produce(
                &summarize::call_site(),
                hcp_name,
                &history,
                &[],
                &summarize::request_for(hcp_name),
                today,
                || Summary::no_history().to_fields(),
            )
            .await?;

        let summary: Summary = serde_json::from_value(Value::Object(run.value.payload.clone()))?;
        Ok(run.map(|_| summary))
    }

    /// Three ranked next actions for `hcp_name`. Empty when there is no history.
    pub async fn suggest(&self, hcp_name: &str, today: NaiveDate) -> Result<Run<Vec<NextAction>>> {
        let records = self.recent(hcp_name).await?;
        let history = NarrativeContext::build(&records, self.history_window);
        let facts = records
            .first()
            .map(|r| suggest::facts(r.fields.date, today))
            .unwrap_or_default();

        let run = self
            .pipeline
            .run_produce(
                &suggest::call_site(self.suggestion_temperature),
                hcp_name,
                &history,
                &facts,
                &suggest::request_for(hcp_name),
                today,
                || Suggestions::default().to_fields(),
            )
            .await?;

        let suggestions: Suggestions = serde_json::from_value(Value::Object(run.value.payload.clone()))?;
        Ok(run.map(|_| suggestions.suggestions))
    }

    async fn recent(&self, hcp_name: &str) -> Result<Vec<InteractionRecord>> {
        if self.history_window == 0 {
            return Err(Error::Config {
                message: "history_window must be at least 1".into(),
            });
        }
        let query = HistoryQuery::for_name(hcp_name).with_page_size(self.history_window);
        Ok(self.store.fetch(&query).await?.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ModelGateway;
    use crate::stage::Stage;
    use crate::test_helpers::ScriptedProvider;
    use fieldscribe_core::{StoreError, ValidationError};
    use fieldscribe_store::InMemoryStore;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 19).unwrap()
    }

    fn service(replies: &[&str]) -> (InteractionService, Arc<ScriptedProvider>, Arc<InMemoryStore>) {
        let provider = Arc::new(ScriptedProvider::replies(replies));
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Pipeline::new(ModelGateway::new(provider.clone(), "m"));
        (InteractionService::new(pipeline, store.clone()), provider, store)
    }

    const LOG_REPLY: &str = "<thinking>Meeting with Dr. Rossi</thinking>\n```json\n{\
        \"hcp_name\": \"Dr. Rossi\", \"interaction_type\": \"Meeting\", \"date\": \"2025-08-19\", \
        \"time\": \"14:30\", \"attendees\": \"Dr. Rossi\", \"topics_discussed\": \"OncoBoost\", \
        \"sentiment\": \"Positive\", \"materials_shared\": [\"brochure\"], \"outcomes\": \"\", \
        \"follow_up_actions\": \"\"}\n```";

    #[tokio::test]
    async fn log_stores_a_complete_record() {
        let (svc, _, store) = service(&[LOG_REPLY]);
        let run = svc.log("Met Dr. Rossi today", today()).await.unwrap();
        let record = run.value;
        assert_eq!(record.id, 1);
        assert_eq!(record.fields.attendees, vec!["Dr. Rossi"]);
        assert_eq!(record.fields.outcomes, None);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(run.trail.last(), Some(&Stage::Merged));
    }

    #[tokio::test]
    async fn log_rejects_incomplete_extraction() {
        let (svc, _, store) = service(&["```json\n{\"hcp_name\": \"Dr. Rossi\"}\n```"]);
        let err = svc.log("Dr. Rossi", today()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingRequired { .. })));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn edit_merges_and_bumps_version() {
        let (svc, _, store) = service(&[
            LOG_REPLY,
            "```json\n{\"sentiment\": \"Neutral\", \"materials_shared\": [\"brochure\", \"sample kit\"]}\n```",
        ]);
        let logged = svc.log("x", today()).await.unwrap().value;

        let edited = svc.edit(logged.id, "left a sample kit, mood was neutral", today()).await.unwrap();
        assert_eq!(edited.value.version, 2);
        assert_eq!(edited.value.fields.sentiment.as_str(), "Neutral");
        assert_eq!(edited.value.fields.materials_shared, vec!["brochure", "sample kit"]);
        assert_eq!(store.get(logged.id).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn failed_edit_leaves_record_untouched() {
        let (svc, _, store) = service(&[LOG_REPLY, "```json\n{\"sentiment\": \"meh\"}\n```"]);
        let logged = svc.log("x", today()).await.unwrap().value;
        assert!(svc.edit(logged.id, "mood was meh", today()).await.is_err());
        assert_eq!(store.get(logged.id).await.unwrap().unwrap(), logged);
    }

    #[tokio::test]
    async fn edit_can_remove_list_items_and_clear_fields() {
        let (svc, _, store) = service(&[
            LOG_REPLY,
            "```json\n{\"materials_shared\": [\"brochure\", \"sample kit\"], \"outcomes\": \"Will prescribe\"}\n```",
            "```json\n{\"materials_shared\": [\"brochure\"], \"outcomes\": \"\"}\n```",
        ]);
        let logged = svc.log("x", today()).await.unwrap().value;
        svc.edit(logged.id, "add a sample kit, she will prescribe", today()).await.unwrap();

        let edited = svc
            .edit(logged.id, "remove the sample kit and clear the outcome", today())
            .await
            .unwrap()
            .value;
        assert_eq!(edited.fields.materials_shared, vec!["brochure"]);
        assert_eq!(edited.fields.outcomes, None);
        assert_eq!(edited.version, 3);
        assert_eq!(store.get(logged.id).await.unwrap().unwrap().fields, edited.fields);
    }

    #[tokio::test]
    async fn edit_that_changes_nothing_is_not_written() {
        let (svc, _, store) = service(&[
            LOG_REPLY,
            "```json\n{\"sentiment\": \"Positive\", \"materials_shared\": [\"brochure\"], \"outcomes\": null}\n```",
        ]);
        let logged = svc.log("x", today()).await.unwrap().value;

        let run = svc.edit(logged.id, "it was positive, left a brochure", today()).await.unwrap();
        assert_eq!(run.value, logged);
        assert_eq!(store.get(logged.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn edit_with_one_invalid_field_applies_none_of_them() {
        let (svc, _, store) = service(&[
            LOG_REPLY,
            "```json\n{\"materials_shared\": [\"brochure\", \"sample kit\"], \"sentiment\": \"Thrilled\"}\n```",
        ]);
        let logged = svc.log("x", today()).await.unwrap().value;

        let err = svc.edit(logged.id, "she was thrilled with the sample kit", today()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::NotInDomain { .. })));

        let stored = store.get(logged.id).await.unwrap().unwrap();
        assert_eq!(stored, logged);
        assert_eq!(stored.fields.materials_shared, vec!["brochure"]);
    }

    #[tokio::test]
    async fn edit_of_missing_record_never_calls_model() {
        let (svc, provider, _) = service(&[]);
        let err = svc.edit(9, "x", today()).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound(9))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn converse_then_save_draft() {
        let (svc, _, store) = service(&[
            "```json\n{\"hcp_name\": \"Dr. Chen\", \"interaction_type\": \"Virtual\", \"date\": \"2025-08-19\", \"time\": \"10:00\", \"topics_discussed\": \"CardioPlus\", \"sentiment\": \"Positive\"}\n```",
            "No JSON this time, sorry.",
        ]);
        let first = svc.converse(&EntitySnapshot::new(), "Met Dr. Chen", today()).await.unwrap();
        let second = svc.converse(&first.value.snapshot, "thanks", today()).await.unwrap();
        assert_eq!(second.value.snapshot, first.value.snapshot);
        assert_eq!(store.count().await.unwrap(), 0);

        let saved = svc.save_draft(&second.value.snapshot).await.unwrap();
        assert_eq!(saved.fields.hcp_name, "Dr. Chen");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn incomplete_draft_cannot_be_saved() {
        let (svc, _, _) = service(&[]);
        let draft = EntitySnapshot::new().with_field("hcp_name", json!("Dr. Chen"));
        assert!(matches!(
            svc.save_draft(&draft).await,
            Err(Error::Validation(ValidationError::MissingRequired { .. }))
        ));
    }

    #[tokio::test]
    async fn summarize_without_history_skips_model() {
        let (svc, provider, _) = service(&[]);
        let run = svc.summarize("Dr. Nobody", today()).await.unwrap();
        assert_eq!(run.value, Summary::no_history());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn suggest_without_history_is_empty() {
        let (svc, provider, _) = service(&[]);
        let run = svc.suggest("Dr. Nobody", today()).await.unwrap();
        assert!(run.value.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn suggest_includes_gap_and_parses_ranked_actions() {
        let (svc, provider, _) = service(&[
            LOG_REPLY,
            "```json\n{\"suggestions\": [{\"suggestion\": \"Send PI\", \"rationale\": \"Requested\"}, {\"suggestion\": \"Book call\", \"rationale\": \"Momentum\"}]}\n```",
        ]);
        svc.log("x", today()).await.unwrap();

        let later = NaiveDate::from_ymd_opt(2025, 8, 29).unwrap();
        let run = svc.suggest("rossi", later).await.unwrap();
        assert_eq!(run.value.len(), 2);
        assert_eq!(run.value[0].action, "Send PI");

        let request = provider.last_request().unwrap();
        assert!(request.messages[0].content.contains("Days since last interaction: 10"));
        assert_eq!(request.temperature, 0.5);
    }

    #[tokio::test]
    async fn summarize_with_history_calls_model_once() {
        let (svc, provider, _) = service(&[
            LOG_REPLY,
            "```json\n{\"relationship_status\": \"Advancing\", \"key_takeaways\": [\"Likes OncoBoost\"], \"suggested_focus\": \"Onboarding\"}\n```",
        ]);
        svc.log("x", today()).await.unwrap();
        let run = svc.summarize("Dr. Rossi", today()).await.unwrap();
        assert_eq!(run.value.relationship_status, "Advancing");
        assert_eq!(provider.calls(), 2);
        assert!(provider.last_request().unwrap().messages[0].content.contains("a Meeting with a 'Positive' sentiment"));
    }
}
