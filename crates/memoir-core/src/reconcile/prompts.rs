//! Prompt protocols for fact extraction and memory reconciliation.

use chrono::{NaiveDate, Utc};

use crate::config::MemoirConfig;
use crate::types::{Message, MemoryItem};

/// A rendered request: system instructions plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// The pair as a two-message conversation.
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

const JSON_ONLY_PREAMBLE: &str = "You are a JSON-only response bot. Never include any other text or explanation. Never use markdown code blocks or any other formatting. Never add any comments or explanations. Never use backticks or any other special characters.";

const FACT_EXTRACTION_BODY: &str = r#"IMPORTANT: Your response MUST be a valid JSON object with EXACTLY this structure:
{
  "facts": [
    "fact 1",
    "fact 2",
    ...
  ]
}

Types of Information to Remember:
1. Personal Preferences: likes, dislikes, preferences in food, products, activities, entertainment
2. Personal Details: names, relationships, important dates
3. Plans and Intentions: upcoming events, trips, goals
4. Activity Preferences: dining, travel, hobbies, services
5. Health and Wellness: dietary restrictions, fitness routines
6. Professional Details: job titles, work habits, career goals
7. Miscellaneous: favorite books, movies, brands
8. Basic Facts: clear, factual statements

Examples:
Input: Hi.
Output: {"facts": []}

Input: The sky is blue and the grass is green.
Output: {"facts": ["Sky is blue", "Grass is green"]}

Input: Hi, I am looking for a restaurant in San Francisco.
Output: {"facts": ["Looking for a restaurant in San Francisco"]}

Rules:
1. ALWAYS return a valid JSON object with a 'facts' array
2. NEVER include any text outside the JSON object
3. NEVER include code blocks or markdown formatting
4. NEVER add any comments or explanations
5. NEVER use backticks or any other special characters
6. If no relevant information, return {"facts": []}
7. Keep facts in the same language as the input
8. Break down complex statements into individual facts
9. Mention each fact once, in the order it first appears"#;

const RECONCILIATION_SYSTEM: &str = "You are a JSON-only response bot. You must ALWAYS respond with a valid JSON object containing a 'memory' array. Never include any other text or explanation. Never use markdown code blocks or any other formatting. Never add any comments or explanations. Never use backticks or any other special characters.";

const RECONCILIATION_GUIDELINES: &str = r#"You are a smart memory manager which controls the memory of a system.
You can perform four operations: (1) add into the memory, (2) update the memory, (3) delete from the memory, and (4) no change.

Compare newly retrieved facts with the existing memory. For each new fact, decide whether to:
- ADD: Add it to the memory as a new element
- UPDATE: Update an existing memory element
- DELETE: Delete an existing memory element
- NONE: Make no change (if the fact is already present or irrelevant)

There are specific guidelines to select which operation to perform:

1. **Add**: If the retrieved facts contain new information not present in the memory, add it with a NEW id that is not used by any existing memory element.
    - Old Memory: [{"id": "0", "text": "User is a software engineer"}]
    - Retrieved facts: ["Name is John"]
    - New Memory:
        {"memory": [
            {"id": "0", "text": "User is a software engineer", "event": "NONE"},
            {"id": "1", "text": "Name is John", "event": "ADD"}
        ]}

2. **Update**: If the retrieved facts contain information that is already present in the memory but the information is totally different, update it.
    If the retrieved fact conveys the same thing as an existing element, keep the one which has the most information.
    Example (a): memory "User likes to play cricket", fact "Loves to play cricket with friends" -> update the memory.
    Example (b): memory "Likes cheese pizza", fact "Loves cheese pizza" -> no update, they convey the same information.
    When updating, keep the same id and put the previous text in "old_memory".
    - Old Memory: [{"id": "0", "text": "I really like cheese pizza"}, {"id": "1", "text": "User likes to play cricket"}]
    - Retrieved facts: ["Loves chicken pizza", "Loves to play cricket with friends"]
    - New Memory:
        {"memory": [
            {"id": "0", "text": "Loves cheese and chicken pizza", "event": "UPDATE", "old_memory": "I really like cheese pizza"},
            {"id": "1", "text": "Loves to play cricket with friends", "event": "UPDATE", "old_memory": "User likes to play cricket"}
        ]}

3. **Delete**: If the retrieved facts contradict the information present in the memory, or the direction is to delete it, delete it.
    - Old Memory: [{"id": "0", "text": "Name is John"}, {"id": "1", "text": "Loves cheese pizza"}]
    - Retrieved facts: ["Dislikes cheese pizza"]
    - New Memory:
        {"memory": [
            {"id": "0", "text": "Name is John", "event": "NONE"},
            {"id": "1", "text": "Loves cheese pizza", "event": "DELETE"}
        ]}

4. **No Change**: If the retrieved facts are already present in the memory, make no change.
    - Old Memory: [{"id": "0", "text": "Name is John"}]
    - Retrieved facts: ["Name is John"]
    - New Memory:
        {"memory": [
            {"id": "0", "text": "Name is John", "event": "NONE"}
        ]}"#;

const RECONCILIATION_CLOSING: &str = r#"Follow the instructions mentioned below:
- Do not return anything from the few shot examples provided above.
- If the current memory is empty, add the new retrieved facts to the memory.
- Return the updated memory in JSON format only, as {"memory": [{"id": ..., "text": ..., "event": ..., "old_memory": ...}]}.
- If there is an addition, generate a new id that does not collide with any existing id.
- If there is an update, the id must remain the same and only the text changes.
- IDs for UPDATE, DELETE and NONE MUST be copied from the existing memory above. Never invent an id for these events.
- Only include "old_memory" for UPDATE events.
- DO NOT RETURN ANYTHING ELSE OTHER THAN THE JSON FORMAT.
- DO NOT WRAP THE JSON IN "```json" OR "```"."#;

/// Join conversation turns into the block embedded in the extraction request.
pub fn join_turns<S: AsRef<str>>(turns: &[S]) -> String {
    turns
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders both request protocols, honoring custom prompt overrides.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    custom_fact_extraction_prompt: Option<String>,
    custom_update_memory_prompt: Option<String>,
}

impl PromptBuilder {
    /// Builder with the stock prompts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder using the custom prompts from the configuration, if any.
    pub fn from_config(config: &MemoirConfig) -> Self {
        Self {
            custom_fact_extraction_prompt: config.custom_fact_extraction_prompt.clone(),
            custom_update_memory_prompt: config.custom_update_memory_prompt.clone(),
        }
    }

    /// Replace the fact extraction system prompt. The current date is still appended.
    pub fn with_fact_extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_fact_extraction_prompt = Some(prompt.into());
        self
    }

    /// Replace the reconciliation guidelines. Snapshot and facts are still embedded.
    pub fn with_update_memory_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_update_memory_prompt = Some(prompt.into());
        self
    }

    /// Fact extraction request dated today (UTC).
    pub fn fact_extraction_request<S: AsRef<str>>(&self, turns: &[S]) -> PromptPair {
        self.fact_extraction_request_on(turns, Utc::now().date_naive())
    }

    /// Fact extraction request grounded on the given date.
    pub fn fact_extraction_request_on<S: AsRef<str>>(
        &self,
        turns: &[S],
        date: NaiveDate,
    ) -> PromptPair {
        let date = date.format("%Y-%m-%d");
        let system = match &self.custom_fact_extraction_prompt {
            Some(custom) => format!("{}\n\nToday's date is {}.", custom, date),
            None => format!(
                "{} You must ALWAYS respond with a valid JSON object containing a 'facts' array, even if empty. Example: {{\"facts\": []}}.\n\n{}\n10. Today's date is {}",
                JSON_ONLY_PREAMBLE, FACT_EXTRACTION_BODY, date
            ),
        };

        let user = format!(
            "Extract facts from this conversation. Remember to return ONLY a JSON object with a 'facts' array:\n{}",
            join_turns(turns)
        );

        PromptPair { system, user }
    }

    /// Reconciliation request embedding the snapshot and the new facts verbatim.
    pub fn reconciliation_request<S: AsRef<str>>(
        &self,
        old_memory: &[MemoryItem],
        new_facts: &[S],
    ) -> PromptPair {
        let memory_json =
            serde_json::to_string_pretty(old_memory).unwrap_or_else(|_| "[]".to_string());
        let facts: Vec<&str> = new_facts.iter().map(|f| f.as_ref()).collect();
        let facts_json = serde_json::to_string_pretty(&facts).unwrap_or_else(|_| "[]".to_string());

        let guidelines = self
            .custom_update_memory_prompt
            .as_deref()
            .unwrap_or(RECONCILIATION_GUIDELINES);

        let user = format!(
            "{}\n\nBelow is the current content of my memory which I have collected till now. You have to update it in the following format only:\n\n{}\n\nThe new retrieved facts are mentioned below. You have to analyze the new retrieved facts and determine whether these facts should be added, updated, or deleted in the memory.\n\n{}\n\n{}\n\nDo not return anything except the JSON format.",
            guidelines, memory_json, facts_json, RECONCILIATION_CLOSING
        );

        PromptPair::new(RECONCILIATION_SYSTEM, user)
    }
}

/// Fact extraction request with the stock prompt, dated today (UTC).
pub fn build_fact_extraction_request<S: AsRef<str>>(turns: &[S]) -> PromptPair {
    PromptBuilder::new().fact_extraction_request(turns)
}

/// Reconciliation request with the stock prompt.
pub fn build_reconciliation_request<S: AsRef<str>>(
    old_memory: &[MemoryItem],
    new_facts: &[S],
) -> PromptPair {
    PromptBuilder::new().reconciliation_request(old_memory, new_facts)
}
