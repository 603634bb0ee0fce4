//! Shared test helpers: a scripted provider and record builders.

use chrono::{NaiveDate, NaiveTime, Utc};
use fieldscribe_core::message::Message;
use fieldscribe_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use fieldscribe_core::{GatewayError, InteractionFields, InteractionRecord, InteractionType, Sentiment};
use std::sync::Mutex;
use std::time::Duration;

/// A provider that returns scripted replies in order and records requests.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, GatewayError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                panic!("ScriptedProvider: no more replies (call #{})", self.calls());
            }
            replies.remove(0)
        };

        next.map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// A stored record for `name` on `date` at 14:30.
pub fn record(id: i64, name: &str, date: (i32, u32, u32)) -> InteractionRecord {
    InteractionRecord {
        id,
        fields: InteractionFields {
            hcp_name: name.into(),
            interaction_type: InteractionType::Meeting,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            attendees: vec![name.into()],
            topics_discussed: "OncoBoost efficacy data".into(),
            voice_note_summary: None,
            materials_shared: vec!["brochure".into()],
            samples_distributed: vec![],
            sentiment: Sentiment::Positive,
            outcomes: Some("Agreed to review trial data".into()),
            follow_up_actions: vec![],
            ai_suggested_followups: vec![],
        },
        created_at: Utc::now(),
        updated_at: Utc::now(),
        version: 1,
    }
}
