//! Deep-Study Phase (C11) — optional.
//!
//! A sequenced analytical pass over `MassiveData` producing an
//! `ExpertKnowledge` object with seven subsections, each a separately
//! prompted AI call bounded by `total_minutes / 7`. A subsection that times
//! out is marked incomplete but never fails the run.
//!
//! AI generation is consumed as an opaque text-generation call: this module
//! never interprets the model's output beyond storing it as the
//! subsection's text.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::types::{ExpertKnowledge, MassiveData};

const SECTIONS: &[(&str, &str)] = &[
    ("structural", "Analyze the structural characteristics of this market based on the aggregated research and viral content below."),
    ("market", "Summarize the market size, growth trajectory, and demand signals visible in the data below."),
    ("competitive", "Identify competitive dynamics and notable players referenced in the data below."),
    ("behavioral", "Describe audience behavior patterns evidenced by the viral content and engagement metrics below."),
    ("trends", "Summarize the trends explicitly present in the research data below."),
    ("predictive", "Project likely near-term developments suggested by the data below."),
    ("strategic", "Recommend strategic actions an operator in this segment should consider, grounded only in the data below."),
];

/// Opaque AI text-generation call. `GenerateText(prompt, max_tokens) →
/// string | error`, implemented here as an OpenAI-compatible chat
/// completion request against `Settings::llm_base_url`.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, String>;
}

pub struct OpenAiCompatibleGenerator {
    pub http: reqwest::Client,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, String> {
        let Some(api_key) = &self.api_key else {
            return Err("no LLM API key configured".to_string());
        };

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&body)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| format!("transport error: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("http_{}", resp.status()));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| format!("invalid json: {e}"))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| "empty completion".to_string())
    }
}

fn prompt_for(section_prompt: &str, data: &MassiveData) -> String {
    let insights = data.research.top_insights.join("\n- ");
    let viral_titles: Vec<String> = data
        .viral_content
        .data
        .iter()
        .take(10)
        .map(|v| format!("{} ({:.1}/10, {} views est.)", v.title, v.engagement_score, v.estimates.views))
        .collect();

    format!(
        "{section_prompt}\n\nQuery: {}\n\nTop insights:\n- {}\n\nTop viral items:\n- {}",
        data.query,
        insights,
        viral_titles.join("\n- ")
    )
}

/// Run all seven subsections, each bounded by `total_minutes / 7`. Timeouts
/// are recorded in `incomplete_sections` rather than aborting the pass.
pub async fn run_deep_study(
    generator: &dyn TextGenerator,
    data: &MassiveData,
    total_minutes: u64,
) -> ExpertKnowledge {
    let per_phase_budget = Duration::from_secs((total_minutes.max(1) * 60) / SECTIONS.len() as u64);
    let mut out = ExpertKnowledge::default();

    for (name, section_prompt) in SECTIONS {
        let prompt = prompt_for(section_prompt, data);
        let result = tokio::time::timeout(per_phase_budget, generator.generate(&prompt, 800)).await;

        match result {
            Ok(Ok(text)) => assign_section(&mut out, name, text),
            Ok(Err(e)) => {
                tracing::warn!(section = name, error = %e, "deep-study subsection failed");
                out.incomplete_sections.push(name.to_string());
            }
            Err(_) => {
                tracing::warn!(section = name, "deep-study subsection timed out");
                out.incomplete_sections.push(name.to_string());
            }
        }
    }

    out
}

fn assign_section(out: &mut ExpertKnowledge, name: &str, text: String) {
    match name {
        "structural" => out.structural = Some(text),
        "market" => out.market = Some(text),
        "competitive" => out.competitive = Some(text),
        "behavioral" => out.behavioral = Some(text),
        "trends" => out.trends = Some(text),
        "predictive" => out.predictive = Some(text),
        "strategic" => out.strategic = Some(text),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Context;

    struct StubGenerator {
        fail_section_contains: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, String> {
            if let Some(needle) = self.fail_section_contains {
                if prompt.contains(needle) {
                    return Err("stub failure".to_string());
                }
            }
            Ok(format!("analysis for: {}", prompt.lines().next().unwrap_or("")))
        }
    }

    fn sample_data() -> MassiveData {
        MassiveData::emergency("s1".into(), "telemedicina".into(), Context::default(), "test")
    }

    #[tokio::test]
    async fn all_sections_complete_when_generator_succeeds() {
        let gen = StubGenerator { fail_section_contains: None };
        let data = sample_data();
        let knowledge = run_deep_study(&gen, &data, 7).await;
        assert!(knowledge.incomplete_sections.is_empty());
        assert!(knowledge.structural.is_some());
        assert!(knowledge.strategic.is_some());
    }

    #[tokio::test]
    async fn failed_section_marked_incomplete_without_aborting_others() {
        let gen = StubGenerator {
            fail_section_contains: Some("Project likely"),
        };
        let data = sample_data();
        let knowledge = run_deep_study(&gen, &data, 7).await;
        assert!(knowledge.incomplete_sections.contains(&"predictive".to_string()));
        assert!(knowledge.structural.is_some());
    }
}
