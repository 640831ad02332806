use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, warn};

use super::GenerativeBackend;
use crate::theme_spec::ThemeSpec;

/// Fixed palette returned when generation is skipped or both keys fail.
const DEFAULT_THEME_JSON: &str = r##"{"background":"#FFFFFF","text":"#111111","accent":"#3D7DFF","button":"#1976D2","secondary":"#F5F5F5","cardBackground":"#FFFFFF","borderColor":"#DDDDDD","headerColor":"#3D7DFF"}"##;

const DEFAULT_QUESTIONS: [&str; 2] = [
    "What should I wear today?",
    "What should I prepare for an outdoor event today?",
];

const ANSWER_MISSING_WEATHER: &str = "Unable to generate answer: weather data is missing.";
const ANSWER_MISSING_QUESTION: &str = "Please provide a valid question.";
const ANSWER_UNAVAILABLE: &str =
    "Unable to generate answer at this time. Please try again later.";

const THEME_INSTRUCTION: &str = "\n\nReturn ONLY a JSON object with these fields: \
background, text, accent, button, secondary, cardBackground, borderColor, headerColor, emoji. \
Emoji is optional. All colors must be hex like #RRGGBB. \
Ensure readable contrast between text and background (aim >= 4.5:1).";

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\.\-\*\+\s]+").unwrap());

/// Client for the generative model with primary/backup key failover.
///
/// Once the primary key fails it is never retried for the lifetime of the
/// process; the flag is shared by all callers. Every operation degrades to a
/// fixed default instead of surfacing an error.
pub struct LlmClient {
    backend: Arc<dyn GenerativeBackend>,
    primary_key: String,
    backup_key: String,
    primary_failed: AtomicBool,
}

impl LlmClient {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        primary_key: impl Into<String>,
        backup_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            primary_key: primary_key.into(),
            backup_key: backup_key.into(),
            primary_failed: AtomicBool::new(false),
        }
    }

    /// Generates theme JSON for a free-text description. A blank description
    /// short-circuits to the default palette without any model call.
    pub async fn generate_theme_json(&self, description: &str) -> String {
        if description.trim().is_empty() {
            debug!("Empty description, using default theme");
            return DEFAULT_THEME_JSON.to_string();
        }

        let prompt = format!("{}{}", description.trim(), THEME_INSTRUCTION);

        if !self.primary_failed.load(Ordering::Relaxed) && !self.primary_key.is_empty() {
            if let Some(json) = self
                .theme_json_with_key(&self.primary_key, &prompt, "PRIMARY")
                .await
            {
                return json;
            }
            self.primary_failed.store(true, Ordering::Relaxed);
            warn!("Primary key failed, trying backup");
        }

        if !self.backup_key.is_empty() {
            if let Some(json) = self
                .theme_json_with_key(&self.backup_key, &prompt, "BACKUP")
                .await
            {
                return json;
            }
        }

        error!("Both API keys failed, using default theme");
        DEFAULT_THEME_JSON.to_string()
    }

    /// Generates a ThemeSpec; output that cannot be coerced into a valid
    /// spec falls back to the default light palette.
    pub async fn generate_theme_spec(&self, description: &str) -> ThemeSpec {
        let json = self.generate_theme_json(description).await;
        let spec = ThemeSpec::from_json(&json);
        if spec.is_valid() {
            spec
        } else {
            ThemeSpec::default_light()
        }
    }

    /// Generates 2-3 practical questions for the given weather summary.
    pub async fn generate_questions(&self, weather_summary: &str) -> Vec<String> {
        if weather_summary.trim().is_empty() {
            error!("Empty weather data provided");
            return default_questions();
        }

        let prompt = build_questions_prompt(weather_summary);
        match self.generate_text(&prompt).await {
            Some(text) => parse_questions(&text),
            None => {
                error!("Both API keys failed for weather questions, using defaults");
                default_questions()
            }
        }
    }

    /// Answers a weather question; degrades to fixed apology strings on
    /// missing input or dual-key failure.
    pub async fn generate_answer(&self, weather_summary: &str, question: &str) -> String {
        if weather_summary.trim().is_empty() {
            error!("Empty weather data provided");
            return ANSWER_MISSING_WEATHER.to_string();
        }
        if question.trim().is_empty() {
            error!("Empty question provided");
            return ANSWER_MISSING_QUESTION.to_string();
        }

        let prompt = build_answer_prompt(weather_summary, question);
        match self.generate_text(&prompt).await {
            Some(text) => text.trim().to_string(),
            None => {
                error!("Both API keys failed for weather answer");
                ANSWER_UNAVAILABLE.to_string()
            }
        }
    }

    /// Fire-and-forget theme generation; the callback receives the spec (or
    /// the default on failure) from the spawned task.
    pub fn generate_theme_spec_async<F>(self: &Arc<Self>, description: &str, callback: F)
    where
        F: FnOnce(ThemeSpec) + Send + 'static,
    {
        let client = Arc::clone(self);
        let description = description.to_string();
        tokio::spawn(async move {
            let spec = client.generate_theme_spec(&description).await;
            callback(spec);
        });
    }

    pub fn generate_questions_async<F>(self: &Arc<Self>, weather_summary: &str, callback: F)
    where
        F: FnOnce(Vec<String>) + Send + 'static,
    {
        let client = Arc::clone(self);
        let weather_summary = weather_summary.to_string();
        tokio::spawn(async move {
            let questions = client.generate_questions(&weather_summary).await;
            callback(questions);
        });
    }

    pub fn generate_answer_async<F>(
        self: &Arc<Self>,
        weather_summary: &str,
        question: &str,
        callback: F,
    ) where
        F: FnOnce(String) + Send + 'static,
    {
        let client = Arc::clone(self);
        let weather_summary = weather_summary.to_string();
        let question = question.to_string();
        tokio::spawn(async move {
            let answer = client.generate_answer(&weather_summary, &question).await;
            callback(answer);
        });
    }

    /// One key attempt for theme output: the extracted span must parse as
    /// JSON or the attempt counts as a failure.
    async fn theme_json_with_key(
        &self,
        api_key: &str,
        prompt: &str,
        key_label: &str,
    ) -> Option<String> {
        debug!(key = key_label, "Generating theme");
        match self.backend.generate(api_key, prompt).await {
            Ok(text) => {
                let json = extract_json(&text);
                match serde_json::from_str::<serde_json::Value>(&json) {
                    Ok(_) => {
                        debug!(key = key_label, "Theme generation succeeded");
                        Some(json)
                    }
                    Err(e) => {
                        error!(key = key_label, error = %e, "Model output was not valid JSON");
                        None
                    }
                }
            }
            Err(e) => {
                error!(key = key_label, error = %e, "Theme generation failed");
                None
            }
        }
    }

    async fn text_with_key(&self, api_key: &str, prompt: &str, key_label: &str) -> Option<String> {
        debug!(key = key_label, "Generating text");
        match self.backend.generate(api_key, prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                error!(key = key_label, error = %e, "Text generation failed");
                None
            }
        }
    }

    /// Failover loop for plain-text output; `None` when both keys fail.
    async fn generate_text(&self, prompt: &str) -> Option<String> {
        if !self.primary_failed.load(Ordering::Relaxed) && !self.primary_key.is_empty() {
            if let Some(text) = self.text_with_key(&self.primary_key, prompt, "PRIMARY").await {
                return Some(text);
            }
            self.primary_failed.store(true, Ordering::Relaxed);
            warn!("Primary key failed, trying backup");
        }

        if !self.backup_key.is_empty() {
            if let Some(text) = self.text_with_key(&self.backup_key, prompt, "BACKUP").await {
                return Some(text);
            }
        }
        None
    }
}

fn default_questions() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

fn build_questions_prompt(weather_summary: &str) -> String {
    format!(
        "Today's weather is: {weather_summary}\n\n\
         Please generate exactly 2-3 context-specific questions based on the given weather data \
         that users might ask to help them make decisions about their day. \
         The questions should be practical and relevant to the current weather conditions. \
         Examples of good questions: 'What should I wear today?', \
         'What should I prepare for an outdoor event today?', 'Is it safe to go outside?', \
         'What activities are suitable for this weather?', etc.\n\n\
         Return ONLY the questions, one per line, without numbering or bullet points. \
         Each question should be on its own line. Do not include any additional text or explanations."
    )
}

fn build_answer_prompt(weather_summary: &str, question: &str) -> String {
    format!(
        "Today's weather is: {weather_summary}\n\n\
         Question: {question}\n\n\
         Please provide a helpful, practical answer to this question based on the current \
         weather conditions. Be specific and actionable. Keep your answer concise (2-4 sentences)."
    )
}

/// Extracts the JSON span from model output that may be wrapped in code
/// fences or surrounded by prose.
pub(crate) fn extract_json(text: &str) -> String {
    let mut t = text.trim();

    if let Some(start) = t.find("```json") {
        if let Some(end) = t.rfind("```") {
            if end > start + 7 {
                t = t[start + 7..end].trim();
            }
        }
    } else if let Some(start) = t.find("```") {
        if let Some(end) = t.rfind("```") {
            if end > start + 3 {
                t = t[start + 3..end].trim();
            }
        }
    }

    match (t.find('{'), t.rfind('}')) {
        (Some(start), Some(end)) if end > start => t[start..=end].to_string(),
        _ => t.to_string(),
    }
}

/// Parses line-oriented question output: strips leading numbering/bullet
/// markers, drops short lines, caps at three, and guarantees at least the
/// two fixed defaults.
pub(crate) fn parse_questions(text: &str) -> Vec<String> {
    let mut questions: Vec<String> = text
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|line| line.chars().count() > 5)
        .collect();

    if questions.len() < 2 {
        return default_questions();
    }
    questions.truncate(3);
    questions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_theme_json_is_a_valid_spec() {
        let spec = ThemeSpec::from_json(DEFAULT_THEME_JSON);
        assert!(spec.is_valid());
        assert_eq!(spec.accent, "#3D7DFF");
    }

    #[test]
    fn extracts_plain_json_unchanged() {
        assert_eq!(extract_json(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn extracts_json_from_fenced_block() {
        let text = "Here is your theme:\n```json\n{\"background\":\"#000000\"}\n```\nEnjoy!";
        assert_eq!(extract_json(text), "{\"background\":\"#000000\"}");

        let text = "```\n{\"a\":1}\n```";
        assert_eq!(extract_json(text), "{\"a\":1}");
    }

    #[test]
    fn extracts_json_from_surrounding_prose() {
        let text = "Sure! {\"a\": {\"b\": 2}} hope that helps";
        assert_eq!(extract_json(text), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn extract_without_braces_returns_trimmed_input() {
        assert_eq!(extract_json("  no json here  "), "no json here");
    }

    #[test]
    fn parses_questions_and_strips_markers() {
        let text = "1. What should I wear today?\n- Is it safe to cycle?\n* Should I water the garden?";
        let questions = parse_questions(text);
        assert_eq!(
            questions,
            vec![
                "What should I wear today?",
                "Is it safe to cycle?",
                "Should I water the garden?"
            ]
        );
    }

    #[test]
    fn short_lines_are_discarded() {
        let text = "ok\nWhat should I wear today?\n-\nIs it safe to go outside?";
        let questions = parse_questions(text);
        assert_eq!(
            questions,
            vec!["What should I wear today?", "Is it safe to go outside?"]
        );
    }

    #[test]
    fn caps_at_three_questions() {
        let text = "First question here?\nSecond question here?\nThird question here?\nFourth question here?";
        assert_eq!(parse_questions(text).len(), 3);
    }

    #[test]
    fn too_few_survivors_yield_defaults() {
        let questions = parse_questions("Only one usable question?");
        assert_eq!(questions, default_questions());
        assert_eq!(parse_questions("").len(), 2);
    }
}
