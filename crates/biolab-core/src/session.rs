//! Session orchestrator.
//!
//! Owns all in-memory state for one user session and sequences the two
//! tracks:
//!
//! - role: `unset → student | teacher` (teacher behind a passphrase)
//! - student: `quiz → input → analyzing → success | error`, with
//!   `error → input` keeping the form and `success → quiz` starting over
//!
//! Teachers move between the submission list and a single submission.
//! The submission log has exactly one writer: a successful [`Session::submit`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{analyze_class, DashboardSummary};
use crate::assessment::{analyze, AnalysisInput};
use crate::error::AssessmentError;
use crate::model::{
    ClassAnalysisResult, QuizResult, StudentSubmission, SubmissionForm, SubmissionId,
};
use crate::parser::check_required;
use crate::quiz::{AnswerFeedback, QuizProgress, QuizSession, DEFAULT_FEEDBACK_DELAY};
use crate::traits::{Attachment, GenerationConfig, LlmProvider};

/// Default shared teacher passphrase.
pub const DEFAULT_TEACHER_PASSPHRASE: &str = "teacher";

/// Settings for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub generation: GenerationConfig,
    /// Shared secret for the teacher role. Compared as plain text.
    pub teacher_passphrase: String,
    /// How long quiz feedback stays on screen.
    pub feedback_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            teacher_passphrase: DEFAULT_TEACHER_PASSPHRASE.to_string(),
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
        }
    }
}

/// Who is using the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unset,
    Student,
    Teacher,
}

/// Student track.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentStage {
    Quiz,
    Input,
    Analyzing,
    Success(SubmissionId),
    /// Analysis failed; holds the message shown inline.
    Error(String),
}

impl StudentStage {
    fn describe(&self) -> &'static str {
        match self {
            StudentStage::Quiz => "taking the quiz",
            StudentStage::Input => "editing the form",
            StudentStage::Analyzing => "analyzing",
            StudentStage::Success(_) => "viewing results",
            StudentStage::Error(_) => "showing an error",
        }
    }
}

impl fmt::Display for StudentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Teacher track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeacherView {
    List,
    Detail(SubmissionId),
}

/// Hooks for the presentation layer.
pub trait SessionObserver: Send + Sync {
    fn on_stage_change(&self, from: &StudentStage, to: &StudentStage);
    fn on_submission_recorded(&self, submission: &StudentSubmission);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_stage_change(&self, _: &StudentStage, _: &StudentStage) {}
    fn on_submission_recorded(&self, _: &StudentSubmission) {}
}

/// Process-lifetime list of assessed submissions, newest first.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLog {
    entries: Vec<StudentSubmission>,
}

impl SubmissionLog {
    fn prepend(&mut self, submission: StudentSubmission) {
        self.entries.insert(0, submission);
    }

    pub fn as_slice(&self) -> &[StudentSubmission] {
        &self.entries
    }

    pub fn get(&self, id: SubmissionId) -> Option<&StudentSubmission> {
        self.entries.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One user's session.
/// Returns the student to the input step if an in-flight analysis is dropped.
struct AnalyzingGuard<'a> {
    stage: &'a mut StudentStage,
    observer: &'a dyn SessionObserver,
    armed: bool,
}

impl Drop for AnalyzingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("analysis cancelled");
            let from = std::mem::replace(self.stage, StudentStage::Input);
            self.observer.on_stage_change(&from, self.stage);
        }
    }
}

pub struct Session {
    provider: Arc<dyn LlmProvider>,
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    role: Role,
    login_error: Option<String>,
    stage: StudentStage,
    quiz: QuizSession,
    quiz_result: Option<QuizResult>,
    form: SubmissionForm,
    image: Option<Attachment>,
    teacher_view: TeacherView,
    submissions: SubmissionLog,
}

impl Session {
    pub fn new(provider: Arc<dyn LlmProvider>, config: SessionConfig) -> Self {
        Self {
            provider,
            config,
            observer: Arc::new(NoopObserver),
            role: Role::Unset,
            login_error: None,
            stage: StudentStage::Quiz,
            quiz: QuizSession::new(),
            quiz_result: None,
            form: SubmissionForm::default(),
            image: None,
            teacher_view: TeacherView::List,
            submissions: SubmissionLog::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Role track
    // -----------------------------------------------------------------------

    pub fn role(&self) -> Role {
        self.role
    }

    /// Inline error from the last failed teacher login.
    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn choose_student(&mut self) -> Result<(), AssessmentError> {
        self.require_role(Role::Unset, "choose a role")?;
        self.role = Role::Student;
        self.login_error = None;
        self.reset_student_flow();
        tracing::debug!("role: student");
        Ok(())
    }

    /// Unlock the teacher role. A wrong passphrase leaves the role unset.
    pub fn login_teacher(&mut self, passphrase: &str) -> Result<(), AssessmentError> {
        self.require_role(Role::Unset, "choose a role")?;
        if passphrase != self.config.teacher_passphrase {
            let err = AssessmentError::Auth;
            self.login_error = Some(err.user_message());
            tracing::debug!("teacher login rejected");
            return Err(err);
        }
        self.role = Role::Teacher;
        self.login_error = None;
        self.teacher_view = TeacherView::List;
        tracing::debug!("role: teacher");
        Ok(())
    }

    /// Back to role selection. Recorded submissions are kept.
    pub fn sign_out(&mut self) {
        self.role = Role::Unset;
        self.login_error = None;
        self.teacher_view = TeacherView::List;
        self.reset_student_flow();
    }

    // -----------------------------------------------------------------------
    // Student track
    // -----------------------------------------------------------------------

    pub fn stage(&self) -> &StudentStage {
        &self.stage
    }

    pub fn quiz(&self) -> &QuizSession {
        &self.quiz
    }

    /// Result of the quiz taken in this pass, once finished.
    pub fn quiz_result(&self) -> Option<&QuizResult> {
        self.quiz_result.as_ref()
    }

    /// Generate the quiz questions.
    pub async fn load_quiz(&mut self) -> Result<(), AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Quiz), "load the quiz")?;
        let provider = Arc::clone(&self.provider);
        self.quiz
            .load(provider.as_ref(), &self.config.generation)
            .await
    }

    /// Manual retry after a failed quiz generation.
    pub async fn retry_quiz(&mut self) -> Result<(), AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Quiz), "retry the quiz")?;
        self.quiz.retry()?;
        self.load_quiz().await
    }

    pub fn answer_question(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<AnswerFeedback, AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Quiz), "answer")?;
        self.quiz.submit_answer(question_index, option_index)
    }

    /// Wait out the feedback delay and move on. Finishing the last question
    /// records the quiz result and opens the input step.
    pub async fn continue_quiz(&mut self) -> Result<QuizProgress, AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Quiz), "continue the quiz")?;
        let progress = self.quiz.advance_after(self.config.feedback_delay).await?;
        if let QuizProgress::Complete(result) = &progress {
            self.quiz_result = Some(result.clone());
            self.transition(StudentStage::Input);
        }
        Ok(progress)
    }

    pub fn form(&self) -> &SubmissionForm {
        &self.form
    }

    /// Edit the form. Only allowed on the input step.
    pub fn form_mut(&mut self) -> Result<&mut SubmissionForm, AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Input), "edit the form")?;
        Ok(&mut self.form)
    }

    /// Replace the whole form. Only allowed on the input step.
    pub fn set_form(&mut self, form: SubmissionForm) -> Result<(), AssessmentError> {
        *self.form_mut()? = form;
        Ok(())
    }

    pub fn set_image(&mut self, image: Option<Attachment>) -> Result<(), AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Input), "attach an image")?;
        self.image = image;
        Ok(())
    }

    pub fn image(&self) -> Option<&Attachment> {
        self.image.as_ref()
    }

    /// Send the form for assessment.
    ///
    /// Validation failures keep the session on the input step without any
    /// network call. Generation failures move to the error stage with the
    /// form retained. On success the new submission is prepended to the log.
    /// Dropping the future mid-request returns to the input step; the late
    /// response is never recorded.
    pub async fn submit(&mut self) -> Result<&StudentSubmission, AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Input), "submit")?;
        check_required(&self.form)?;

        self.transition(StudentStage::Analyzing);
        let outcome = {
            let mut guard = AnalyzingGuard {
                stage: &mut self.stage,
                observer: self.observer.as_ref(),
                armed: true,
            };
            let input =
                AnalysisInput::from_form(&self.form, self.image.as_ref(), self.quiz_result.as_ref());
            let outcome = analyze(self.provider.as_ref(), &self.config.generation, &input).await;
            guard.armed = false;
            outcome
        };

        match outcome {
            Ok(analysis) => {
                let submission =
                    StudentSubmission::new(self.form.clone(), self.quiz_result.clone(), analysis);
                let id = submission.id;
                tracing::info!(submission = %id, student = %submission.student_name, "submission recorded");
                self.observer.on_submission_recorded(&submission);
                self.submissions.prepend(submission);
                self.transition(StudentStage::Success(id));
                Ok(&self.submissions.as_slice()[0])
            }
            Err(e) => {
                self.transition(StudentStage::Error(e.user_message()));
                Err(e)
            }
        }
    }

    /// `error → input`, keeping every form value.
    pub fn back_to_input(&mut self) -> Result<(), AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Error(_)), "go back to the form")?;
        self.transition(StudentStage::Input);
        Ok(())
    }

    /// The submission just produced, while on the success stage.
    pub fn current_result(&self) -> Option<&StudentSubmission> {
        match self.stage {
            StudentStage::Success(id) => self.submissions.get(id),
            _ => None,
        }
    }

    /// `success → quiz`: start over, discarding the quiz result and the form.
    pub fn restart(&mut self) -> Result<(), AssessmentError> {
        self.require_stage(|s| matches!(s, StudentStage::Success(_)), "start over")?;
        let from = self.stage.clone();
        self.reset_student_flow();
        self.observer.on_stage_change(&from, &self.stage);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Teacher track
    // -----------------------------------------------------------------------

    /// All submissions, newest first.
    pub fn submissions(&self) -> &[StudentSubmission] {
        self.submissions.as_slice()
    }

    pub fn teacher_view(&self) -> TeacherView {
        self.teacher_view
    }

    pub fn dashboard(&self) -> Result<DashboardSummary, AssessmentError> {
        self.require_role(Role::Teacher, "view the dashboard")?;
        Ok(DashboardSummary::from_submissions(self.submissions()))
    }

    pub fn open_submission(&mut self, id: SubmissionId) -> Result<&StudentSubmission, AssessmentError> {
        self.require_role(Role::Teacher, "open a submission")?;
        if self.submissions.get(id).is_none() {
            return Err(AssessmentError::validation(format!("no submission with id {id}")));
        }
        self.teacher_view = TeacherView::Detail(id);
        self.selected_submission()
            .ok_or_else(|| AssessmentError::validation(format!("no submission with id {id}")))
    }

    pub fn close_submission(&mut self) {
        self.teacher_view = TeacherView::List;
    }

    pub fn selected_submission(&self) -> Option<&StudentSubmission> {
        match self.teacher_view {
            TeacherView::Detail(id) => self.submissions.get(id),
            TeacherView::List => None,
        }
    }

    /// AI summary of every recorded submission.
    pub async fn analyze_class(&self) -> Result<ClassAnalysisResult, AssessmentError> {
        self.require_role(Role::Teacher, "analyze the class")?;
        analyze_class(
            self.provider.as_ref(),
            &self.config.generation,
            self.submissions(),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reset_student_flow(&mut self) {
        self.stage = StudentStage::Quiz;
        self.quiz = QuizSession::new();
        self.quiz_result = None;
        self.form = SubmissionForm::default();
        self.image = None;
    }

    fn transition(&mut self, to: StudentStage) {
        tracing::debug!(from = %self.stage, to = %to, "student stage");
        let from = std::mem::replace(&mut self.stage, to);
        self.observer.on_stage_change(&from, &self.stage);
    }

    fn require_role(&self, role: Role, action: &'static str) -> Result<(), AssessmentError> {
        if self.role == role {
            return Ok(());
        }
        Err(AssessmentError::InvalidTransition {
            action,
            state: match self.role {
                Role::Unset => "no role is selected",
                Role::Student => "signed in as a student",
                Role::Teacher => "signed in as a teacher",
            },
        })
    }

    fn require_stage(
        &self,
        allowed: impl Fn(&StudentStage) -> bool,
        action: &'static str,
    ) -> Result<(), AssessmentError> {
        self.require_role(Role::Student, action)?;
        if allowed(&self.stage) {
            Ok(())
        } else {
            Err(AssessmentError::InvalidTransition {
                action,
                state: self.stage.describe(),
            })
        }
    }
}
