//! Deterministic provider stub for unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::{
    AnalysisResult, Competency, CompetencyCategory, LearningPathItem, QuizQuestion,
};
use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};

/// Replays queued responses in order and records every request.
pub(crate) struct StubProvider {
    /// `None` entries never answer.
    responses: Mutex<VecDeque<Option<anyhow::Result<String>>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(content: impl Into<String>) -> Self {
        let stub = Self::new();
        stub.push_ok(content);
        stub
    }

    pub fn push_ok(&self, content: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Some(Ok(content.into())));
    }

    /// Queue a request that stays in flight until the caller drops it.
    pub fn push_pending(&self) {
        self.responses.lock().unwrap().push_back(None);
    }

    pub fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Some(Err(anyhow::anyhow!(message.to_string()))));
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        let content = match next {
            Some(Some(reply)) => reply?,
            Some(None) => std::future::pending::<String>().await,
            None => anyhow::bail!("no stub response queued"),
        };
        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage::default(),
            latency_ms: 0,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }
}

/// Ten well-formed questions; the correct answer of question `i` is `i % 4`.
pub(crate) fn sample_questions() -> Vec<QuizQuestion> {
    (0..10)
        .map(|i| QuizQuestion {
            id: i as u32 + 1,
            question: format!("Question {}", i + 1),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: i % 4,
            competency_type: match i {
                0..=2 => CompetencyCategory::Knowledge,
                3..=5 => CompetencyCategory::Inquiry,
                _ => CompetencyCategory::Application,
            },
        })
        .collect()
}

pub(crate) fn sample_analysis(scores: [f64; 3]) -> AnalysisResult {
    AnalysisResult {
        summary: "Solid design, weak data handling.".into(),
        competencies: CompetencyCategory::ALL
            .iter()
            .zip(scores)
            .map(|(c, score)| Competency {
                name: c.label().to_string(),
                score,
                description: format!("{} feedback", c.tag()),
            })
            .collect(),
        strengths: vec!["Chose 37°C for E. coli".into()],
        weaknesses: vec!["Missed the lag phase".into()],
        learning_path: vec![
            LearningPathItem {
                timeframe: "Week 1".into(),
                title: "Bacterial physiology".into(),
                description: "Review optimal growth conditions.".into(),
                action_items: vec!["Read chapter 3".into()],
            },
            LearningPathItem {
                timeframe: "Week 2".into(),
                title: "Growth curves".into(),
                description: "Practice plotting OD data.".into(),
                action_items: vec!["Plot the sample dataset".into()],
            },
        ],
    }
}
