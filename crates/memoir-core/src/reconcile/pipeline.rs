//! End-to-end reconciliation against an LLM collaborator.

use std::sync::Arc;

use serde::Serialize;

use crate::config::MemoirConfig;
use crate::error::MemoirResult;
use crate::traits::{ApplyReport, GenerationOptions, Llm, MemoryStore};
use crate::types::{FactExtractionResult, MemoryItem, ReconciliationEntry};

use super::normalizer::{normalize_facts, normalize_reconciliation};
use super::prompts::{PromptBuilder, PromptPair};

/// Facts extracted from a conversation and the decisions taken on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub facts: FactExtractionResult,
    pub entries: Vec<ReconciliationEntry>,
}

/// Runs fact extraction and memory reconciliation through an [`Llm`].
///
/// Transport errors from the LLM are returned to the caller. Anything the
/// model says is normalized, so a successful call always yields a valid
/// result, possibly empty.
pub struct Reconciler {
    llm: Arc<dyn Llm>,
    prompts: PromptBuilder,
    json_response_format: bool,
}

impl Reconciler {
    /// Create a reconciler with the stock prompts.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self {
            llm,
            prompts: PromptBuilder::new(),
            json_response_format: true,
        }
    }

    /// Create a reconciler honoring custom prompts and format settings.
    pub fn from_config(llm: Arc<dyn Llm>, config: &MemoirConfig) -> Self {
        Self {
            llm,
            prompts: PromptBuilder::from_config(config),
            json_response_format: config.json_response_format,
        }
    }

    /// Use a specific prompt builder.
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Enable or disable requesting JSON mode from the provider.
    pub fn with_json_response_format(mut self, enabled: bool) -> Self {
        self.json_response_format = enabled;
        self
    }

    /// Extract facts from conversation turns.
    pub async fn extract_facts<S: AsRef<str> + Sync>(
        &self,
        turns: &[S],
    ) -> MemoirResult<FactExtractionResult> {
        let request = self.prompts.fact_extraction_request(turns);
        let text = self.complete(&request).await?;
        let result = normalize_facts(&text);
        tracing::debug!(facts = result.facts.len(), "Extracted facts");
        Ok(result)
    }

    /// Decide what to do with each memory given the new facts.
    ///
    /// The returned entries satisfy the id invariants for `old_memory`.
    pub async fn reconcile<S: AsRef<str> + Sync>(
        &self,
        old_memory: &[MemoryItem],
        new_facts: &[S],
    ) -> MemoirResult<Vec<ReconciliationEntry>> {
        let request = self.prompts.reconciliation_request(old_memory, new_facts);
        let text = self.complete(&request).await?;
        let entries = normalize_reconciliation(&text, old_memory);
        tracing::debug!(
            entries = entries.len(),
            snapshot = old_memory.len(),
            "Reconciled memory"
        );
        Ok(entries)
    }

    /// Extract facts, then reconcile them against `old_memory`.
    ///
    /// The reconciliation call is skipped when no facts are found.
    pub async fn process<S: AsRef<str> + Sync>(
        &self,
        turns: &[S],
        old_memory: &[MemoryItem],
    ) -> MemoirResult<ReconciliationOutcome> {
        let facts = self.extract_facts(turns).await?;
        if facts.is_empty() {
            tracing::debug!("No facts extracted, skipping reconciliation");
            return Ok(ReconciliationOutcome {
                facts,
                entries: Vec::new(),
            });
        }

        let entries = self.reconcile(old_memory, &facts.facts).await?;
        Ok(ReconciliationOutcome { facts, entries })
    }

    /// Process a conversation against a store's snapshot and apply the result.
    pub async fn process_into<S: AsRef<str> + Sync>(
        &self,
        turns: &[S],
        store: &dyn MemoryStore,
    ) -> MemoirResult<(ReconciliationOutcome, ApplyReport)> {
        let snapshot = store.snapshot().await?;
        let outcome = self.process(turns, &snapshot).await?;
        let report = store.apply(&outcome.entries).await?;
        Ok((outcome, report))
    }

    async fn complete(&self, request: &PromptPair) -> MemoirResult<String> {
        let options = (self.json_response_format && self.llm.supports_json_mode())
            .then(GenerationOptions::json);

        let response = self
            .llm
            .generate(&request.to_messages(), options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "LLM request failed");
                e
            })?;

        if response.has_tool_calls() {
            tracing::debug!(
                tool_calls = response.tool_calls.len(),
                "Ignoring tool calls in LLM response"
            );
        }

        Ok(response.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::MemoirError;
    use crate::store::InMemoryStore;
    use crate::traits::{LlmResponse, ResponseFormat, Tool, ToolChoice};
    use crate::types::{MemoryEvent, Message, MessageRole};

    /// Replays canned responses and records the requests it saw.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<MemoirResult<LlmResponse>>>,
        requests: Mutex<Vec<(Vec<Message>, Option<GenerationOptions>)>>,
        json_mode: bool,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<MemoirResult<LlmResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                json_mode: true,
            }
        }

        fn replying(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(LlmResponse::text(*t))).collect())
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Llm for ScriptedLlm {
        async fn generate(
            &self,
            messages: &[Message],
            options: Option<GenerationOptions>,
        ) -> MemoirResult<LlmResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), options));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(MemoirError::llm("script exhausted")))
        }

        async fn generate_with_tools(
            &self,
            messages: &[Message],
            _tools: &[Tool],
            _tool_choice: ToolChoice,
            options: Option<GenerationOptions>,
        ) -> MemoirResult<LlmResponse> {
            self.generate(messages, options).await
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn supports_json_mode(&self) -> bool {
            self.json_mode
        }
    }

    #[tokio::test]
    async fn test_extract_facts_normalizes_fenced_response() {
        let llm = Arc::new(ScriptedLlm::replying(&["```json\n{\"facts\": [\"Name is John\"]}\n```"]));
        let reconciler = Reconciler::new(llm.clone());

        let result = reconciler.extract_facts(&["Hi, I'm John"]).await.unwrap();
        assert_eq!(result.facts, vec!["Name is John"]);

        let requests = llm.requests.lock().unwrap();
        let (messages, options) = &requests[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[1].content.ends_with("Hi, I'm John"));
        assert_eq!(
            options.as_ref().and_then(|o| o.response_format.clone()),
            Some(ResponseFormat::Json)
        );
    }

    #[tokio::test]
    async fn test_json_mode_not_requested_when_unsupported_or_disabled() {
        let mut llm = ScriptedLlm::replying(&["{}"]);
        llm.json_mode = false;
        let llm = Arc::new(llm);
        Reconciler::new(llm.clone()).extract_facts(&["x"]).await.unwrap();
        assert!(llm.requests.lock().unwrap()[0].1.is_none());

        let llm = Arc::new(ScriptedLlm::replying(&["{}"]));
        Reconciler::new(llm.clone())
            .with_json_response_format(false)
            .extract_facts(&["x"])
            .await
            .unwrap();
        assert!(llm.requests.lock().unwrap()[0].1.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_unchanged_memory() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"memory":[{"id":"0","text":"Likes cheese pizza","event":"NONE"}]}"#,
        ]));
        let old = vec![MemoryItem::new("0", "Likes cheese pizza")];

        let entries = Reconciler::new(llm)
            .reconcile(&old, &["Loves cheese pizza"])
            .await
            .unwrap();

        assert_eq!(entries, vec![ReconciliationEntry::unchanged("0", "Likes cheese pizza")]);
    }

    #[tokio::test]
    async fn test_reconcile_drops_hallucinated_delete() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"memory":[{"id":"99","text":"Ghost","event":"DELETE"},{"id":"1","text":"Plays chess","event":"ADD"}]}"#,
        ]));
        let old = vec![MemoryItem::new("0", "Name is John")];

        let entries = Reconciler::new(llm)
            .reconcile(&old, &["Plays chess"])
            .await
            .unwrap();

        assert_eq!(entries, vec![ReconciliationEntry::add("1", "Plays chess")]);
    }

    #[tokio::test]
    async fn test_garbage_reconciliation_degrades_to_empty() {
        let llm = Arc::new(ScriptedLlm::replying(&["I'm sorry, I can't help with that."]));
        let entries = Reconciler::new(llm)
            .reconcile(&[MemoryItem::new("0", "Name is John")], &["Name is Jon"])
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(MemoirError::api("connection reset"))]));
        let err = Reconciler::new(llm).extract_facts(&["hello"]).await.unwrap_err();
        assert!(matches!(err, MemoirError::Network { .. }));
    }

    #[tokio::test]
    async fn test_process_skips_reconciliation_without_facts() {
        let llm = Arc::new(ScriptedLlm::replying(&[r#"{"facts": []}"#]));
        let outcome = Reconciler::new(llm.clone())
            .process(&["Hi."], &[MemoryItem::new("0", "Name is John")])
            .await
            .unwrap();

        assert!(outcome.facts.is_empty());
        assert!(outcome.entries.is_empty());
        assert_eq!(llm.request_count(), 1);
    }

    #[tokio::test]
    async fn test_process_into_store() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"facts": ["Dislikes cheese pizza"]}"#,
            r#"{"memory": [
                {"id": "0", "text": "Name is John", "event": "NONE"},
                {"id": "1", "text": "Loves cheese pizza", "event": "DELETE"},
                {"id": "2", "text": "Dislikes cheese pizza", "event": "ADD"}
            ]}"#,
        ]));
        let store = InMemoryStore::from_items(vec![
            MemoryItem::new("0", "Name is John"),
            MemoryItem::new("1", "Loves cheese pizza"),
        ]);

        let (outcome, report) = Reconciler::new(llm.clone())
            .process_into(&["I don't like cheese pizza anymore"], &store)
            .await
            .unwrap();

        assert_eq!(outcome.facts.facts, vec!["Dislikes cheese pizza"]);
        assert_eq!(outcome.entries.len(), 3);
        assert_eq!(report.added, 1);
        assert_eq!(report.deleted, 1);

        // The snapshot goes into the second prompt verbatim.
        let requests = llm.requests.lock().unwrap();
        assert!(requests[1].0[1].content.contains("\"Loves cheese pizza\""));

        let items = store.snapshot().await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .all(|item| item.text != "Loves cheese pizza"));
        assert_eq!(outcome.entries[2].event, MemoryEvent::Add);
    }

    #[tokio::test]
    async fn test_custom_prompts_from_config() {
        let llm = Arc::new(ScriptedLlm::replying(&["{}"]));
        let config = MemoirConfig::builder()
            .custom_fact_extraction_prompt("Only extract pets.")
            .build();

        Reconciler::from_config(llm.clone(), &config)
            .extract_facts(&["I have a cat"])
            .await
            .unwrap();

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].0[0].content.starts_with("Only extract pets."));
    }
}
