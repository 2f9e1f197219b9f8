//! Adaptive entry quiz: question generation, answer tracking, and level
//! classification.
//!
//! A [`QuizSession`] walks through
//! `loading → ready → (answering ⇄ feedback)* → complete`, with `failed` on a
//! generation error and `retry` going back to `loading`. The feedback pause
//! between questions is a timer around the synchronous [`QuizSession::advance`].

use std::time::Duration;

use crate::error::AssessmentError;
use crate::model::{QuizLevel, QuizQuestion, QuizResult};
use crate::schema::quiz_schema;
use crate::traits::{generate_structured, ContentPart, GenerationConfig, LlmProvider};

/// Number of questions in one quiz.
pub const QUIZ_LENGTH: usize = 10;

/// Number of options per question.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Default pause while feedback is shown.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(1200);

const QUIZ_SYSTEM_INSTRUCTION: &str =
    "You are a biology teacher writing a fair, varied multiple-choice entry test.";

const QUIZ_PROMPT: &str = "Create a multiple-choice quiz of exactly 10 questions to assess a \
lower-secondary student's natural-science competencies before a project on \"The growth of bacteria\".

Composition:
- 3 questions tagged \"knowledge\": bacterial structure, nutrition and the growth conditions \
(temperature, pH, nutrients).
- 3 questions tagged \"inquiry\": reading growth curves, identifying experimental variables, \
interpreting OD measurements.
- 4 questions tagged \"application\": food safety, yogurt and fermentation, hygiene, antibiotics.

Each question must have exactly 4 options and exactly one correct answer, given as its index \
(0-3) in `correctAnswer`. Vary the position of the correct answer. Number the questions 1 to 10 \
in `id`.";

/// Map a final score to its level. See [`QuizLevel::classify`].
pub fn classify(score: u32) -> QuizLevel {
    QuizLevel::classify(score)
}

/// Build the quiz result for a final score.
pub fn finalize(final_score: u32) -> QuizResult {
    QuizResult::from_score(final_score)
}

/// Ask the AI boundary for a fresh quiz.
///
/// Fails with [`AssessmentError::Generation`] on transport/parse errors, or
/// when the payload cannot be presented (wrong question count, option count,
/// or answer index out of range). The 3/3/4 topic split is left to the prompt.
pub async fn generate_quiz(
    provider: &dyn LlmProvider,
    config: &GenerationConfig,
) -> Result<Vec<QuizQuestion>, AssessmentError> {
    let request = config.request(
        Some(QUIZ_SYSTEM_INSTRUCTION),
        vec![ContentPart::Text(QUIZ_PROMPT.to_string())],
        quiz_schema(),
    );
    let questions: Vec<QuizQuestion> = generate_structured(provider, &request).await?;
    check_questions(&questions).inspect_err(|e| {
        tracing::error!(error = %e, "generated quiz is not presentable");
    })?;
    Ok(questions)
}

fn check_questions(questions: &[QuizQuestion]) -> Result<(), AssessmentError> {
    if questions.len() != QUIZ_LENGTH {
        return Err(AssessmentError::generation(format!(
            "expected {QUIZ_LENGTH} questions, got {}",
            questions.len()
        )));
    }
    for (i, q) in questions.iter().enumerate() {
        if q.options.len() != OPTIONS_PER_QUESTION {
            return Err(AssessmentError::generation(format!(
                "question {} has {} options",
                i + 1,
                q.options.len()
            )));
        }
        if q.correct_answer >= OPTIONS_PER_QUESTION {
            return Err(AssessmentError::generation(format!(
                "question {} has correct answer index {}",
                i + 1,
                q.correct_answer
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Quiz session state machine
// ---------------------------------------------------------------------------

/// Where a quiz session currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizState {
    Loading,
    /// Questions loaded, first question not answered yet.
    Ready,
    Answering,
    /// Feedback for the current question is on screen.
    Feedback { selected: usize },
    Complete(QuizResult),
    Failed(String),
}

impl QuizState {
    fn describe(&self) -> &'static str {
        match self {
            QuizState::Loading => "loading",
            QuizState::Ready => "ready",
            QuizState::Answering => "answering",
            QuizState::Feedback { .. } => "showing feedback",
            QuizState::Complete(_) => "complete",
            QuizState::Failed(_) => "failed",
        }
    }
}

/// What the student sees right after picking an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_index: usize,
    pub running_score: u32,
}

/// Outcome of leaving the feedback state.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizProgress {
    /// Moved on to the question at this index.
    Next(usize),
    Complete(QuizResult),
}

/// One pass through the entry quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    state: QuizState,
    questions: Vec<QuizQuestion>,
    current: usize,
    score: u32,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self {
            state: QuizState::Loading,
            questions: Vec::new(),
            current: 0,
            score: 0,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Index of the question being shown.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.state {
            QuizState::Ready | QuizState::Answering | QuizState::Feedback { .. } => {
                self.questions.get(self.current)
            }
            _ => None,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Fraction of questions already behind the student, for a progress bar.
    pub fn progress(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.current as f64 / self.questions.len() as f64
    }

    /// Fetch questions from the provider and move to `ready` or `failed`.
    pub async fn load(
        &mut self,
        provider: &dyn LlmProvider,
        config: &GenerationConfig,
    ) -> Result<(), AssessmentError> {
        self.ensure(matches!(self.state, QuizState::Loading), "load questions")?;
        match generate_quiz(provider, config).await {
            Ok(questions) => {
                self.start(questions)?;
                Ok(())
            }
            Err(e) => {
                self.state = QuizState::Failed(e.user_message());
                Err(e)
            }
        }
    }

    /// Install already-generated questions (`loading → ready`).
    pub fn start(&mut self, questions: Vec<QuizQuestion>) -> Result<(), AssessmentError> {
        self.ensure(matches!(self.state, QuizState::Loading), "start the quiz")?;
        check_questions(&questions)?;
        self.questions = questions;
        self.current = 0;
        self.score = 0;
        self.state = QuizState::Ready;
        tracing::debug!("quiz ready");
        Ok(())
    }

    /// `failed → loading`, clearing any partial progress.
    pub fn retry(&mut self) -> Result<(), AssessmentError> {
        self.ensure(matches!(self.state, QuizState::Failed(_)), "retry")?;
        *self = Self::new();
        Ok(())
    }

    /// Select an option for the question at `question_index`.
    ///
    /// Only the current question can be answered, and only once: while its
    /// feedback is showing, further selections are rejected.
    pub fn submit_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<AnswerFeedback, AssessmentError> {
        self.ensure(
            matches!(self.state, QuizState::Ready | QuizState::Answering),
            "answer",
        )?;
        if question_index != self.current {
            return Err(AssessmentError::InvalidTransition {
                action: "answer a question out of order",
                state: self.state.describe(),
            });
        }
        if option_index >= OPTIONS_PER_QUESTION {
            return Err(AssessmentError::validation(format!(
                "option {option_index} does not exist"
            )));
        }

        let correct_index = self.questions[self.current].correct_answer;
        let is_correct = option_index == correct_index;
        if is_correct {
            self.score += 1;
        }
        self.state = QuizState::Feedback {
            selected: option_index,
        };
        tracing::debug!(question = self.current, is_correct, score = self.score, "answer recorded");

        Ok(AnswerFeedback {
            is_correct,
            correct_index,
            running_score: self.score,
        })
    }

    /// Leave the feedback state: next question, or finish on the last one.
    pub fn advance(&mut self) -> Result<QuizProgress, AssessmentError> {
        self.ensure(matches!(self.state, QuizState::Feedback { .. }), "advance")?;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.state = QuizState::Answering;
            Ok(QuizProgress::Next(self.current))
        } else {
            let result = finalize(self.score);
            tracing::debug!(score = result.score, level = %result.level, "quiz complete");
            self.state = QuizState::Complete(result.clone());
            Ok(QuizProgress::Complete(result))
        }
    }

    /// Keep the feedback on screen for `delay`, then [`advance`](Self::advance).
    pub async fn advance_after(&mut self, delay: Duration) -> Result<QuizProgress, AssessmentError> {
        self.ensure(matches!(self.state, QuizState::Feedback { .. }), "advance")?;
        tokio::time::sleep(delay).await;
        self.advance()
    }

    /// The final result, once complete.
    pub fn result(&self) -> Option<&QuizResult> {
        match &self.state {
            QuizState::Complete(result) => Some(result),
            _ => None,
        }
    }

    fn ensure(&self, ok: bool, action: &'static str) -> Result<(), AssessmentError> {
        if ok {
            Ok(())
        } else {
            Err(AssessmentError::InvalidTransition {
                action,
                state: self.state.describe(),
            })
        }
    }
}
