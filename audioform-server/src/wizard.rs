//! Form wizard state machine
//!
//! One [`FormSession`] per visit. Steps only move forward:
//!
//! ```text
//! welcome --start--> intro --continue (names required)--> employment --answer--> submitted
//! ```
//!
//! Every operation returns the [`PlaybackCommand`]s the page must execute.
//! Time is passed in by the caller so transitions are deterministic.

use audioform_common::time::elapsed_whole_secs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audio::{Clip, ClipPlayback, PlaybackCommand};
use crate::engagement::{AudioEngagement, EngagementMetrics};

/// Banner shown when the gateway reports any failure
pub const SUBMISSION_ERROR_MESSAGE: &str =
    "An error occurred while submitting the form. Please try again.";

/// Wizard step; ordering follows the only allowed direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Welcome,
    Intro,
    Employment,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::Intro => "intro",
            Step::Employment => "employment",
        }
    }

    /// Clip that belongs to this step, if any
    pub fn clip(self) -> Option<Clip> {
        match self {
            Step::Welcome => None,
            Step::Intro => Some(Clip::Intro),
            Step::Employment => Some(Clip::Employment),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rejected wizard actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("This action is not available on the {actual} step")]
    WrongStep { expected: Step, actual: Step },

    #[error("Please enter your first and last name")]
    MissingName,

    #[error("Audio is still starting, please wait")]
    PlaybackPending,

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("The {clip} clip does not belong to the {step} step")]
    WrongClip { clip: Clip, step: Step },
}

/// Personal fields edited on the intro step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalFields {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub dob: String,
}

impl PersonalFields {
    pub fn has_names(&self) -> bool {
        !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty()
    }
}

/// Everything the gateway needs to build a record
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub session_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<String>,
    pub company: String,
    pub employment_status: Option<bool>,
    pub engagement: EngagementMetrics,
    pub form_start_time: DateTime<Utc>,
    pub form_completion_time: DateTime<Utc>,
}

/// Serializable snapshot returned to the page after every call
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub company: String,
    pub step: Step,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub action_enabled: bool,
    pub submitting: bool,
    pub error: Option<String>,
    pub engagement: EngagementMetrics,
    pub form_start_time: DateTime<Utc>,
    pub commands: Vec<PlaybackCommand>,
}

/// In-memory state of one visitor's pass through the form
#[derive(Debug, Clone)]
pub struct FormSession {
    id: Uuid,
    company: String,
    step: Step,
    fields: PersonalFields,
    employment_status: Option<bool>,
    form_start_time: DateTime<Utc>,
    form_completion_time: Option<DateTime<Utc>>,
    form_completion_time_seconds: Option<i64>,
    engagement: AudioEngagement,
    action_enabled: bool,
    submitting: bool,
    error: Option<String>,
    last_activity: DateTime<Utc>,
}

impl FormSession {
    pub fn new(company: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company: company.into(),
            step: Step::Welcome,
            fields: PersonalFields::default(),
            employment_status: None,
            form_start_time: now,
            form_completion_time: None,
            form_completion_time_seconds: None,
            engagement: AudioEngagement::new(),
            action_enabled: true,
            submitting: false,
            error: None,
            last_activity: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn fields(&self) -> &PersonalFields {
        &self.fields
    }

    pub fn engagement(&self) -> &AudioEngagement {
        &self.engagement
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn action_enabled(&self) -> bool {
        self.action_enabled
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn employment_status(&self) -> Option<bool> {
        self.employment_status
    }

    pub fn form_start_time(&self) -> DateTime<Utc> {
        self.form_start_time
    }

    pub fn form_completion_time(&self) -> Option<DateTime<Utc>> {
        self.form_completion_time
    }

    pub fn form_completion_time_seconds(&self) -> Option<i64> {
        self.form_completion_time_seconds
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    fn require_step(&self, expected: Step) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    /// welcome → intro; starts the intro clip and locks the primary action
    pub fn start(&mut self) -> Result<Vec<PlaybackCommand>, WizardError> {
        self.require_step(Step::Welcome)?;
        self.step = Step::Intro;
        self.action_enabled = false;
        debug!("Session {} entered intro step", self.id);
        Ok(vec![self.engagement.request_play(Clip::Intro)])
    }

    /// Only the current step's clip, and only while its start is pending
    fn expects_start(&self, clip: Clip) -> bool {
        self.step.clip() == Some(clip)
            && self.engagement.handle(clip).playback() == ClipPlayback::Starting
    }

    /// The page confirmed `clip` is playing
    ///
    /// Ignored unless the wizard requested `clip` for the current step.
    pub fn playback_started(&mut self, clip: Clip, now: DateTime<Utc>) {
        if !self.expects_start(clip) {
            debug!("Session {}: ignoring unrequested start of {} clip", self.id, clip);
            return;
        }
        self.engagement.on_audio_start(clip, now);
        if clip == Clip::Intro {
            self.action_enabled = true;
        }
    }

    /// The page could not start `clip` (autoplay blocked, missing file, ...)
    pub fn playback_failed(&mut self, clip: Clip, reason: &str) {
        if !self.expects_start(clip) {
            debug!("Session {}: ignoring failure of unrequested {} clip", self.id, clip);
            return;
        }
        warn!("Session {}: {} clip failed to start: {}", self.id, clip, reason);
        self.engagement.on_play_failed(clip);
        if clip == Clip::Intro {
            self.action_enabled = true;
        }
    }

    /// `clip` ended naturally; returns the seconds credited
    pub fn audio_ended(&mut self, clip: Clip, now: DateTime<Utc>) -> Option<i64> {
        self.engagement.on_audio_end(clip, now)
    }

    /// Restart the current step's clip from the beginning
    pub fn replay(&mut self, clip: Clip) -> Result<Vec<PlaybackCommand>, WizardError> {
        if self.step.clip() != Some(clip) {
            return Err(WizardError::WrongClip {
                clip,
                step: self.step,
            });
        }
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        let stop = self.engagement.stop_all();
        let play = self.engagement.request_play(clip);
        if clip == Clip::Intro {
            self.action_enabled = false;
        }
        Ok(vec![stop, play])
    }

    /// Edit personal fields; only accepted on the intro step
    pub fn update_fields(&mut self, fields: PersonalFields) -> Result<(), WizardError> {
        self.require_step(Step::Intro)?;
        self.fields = fields;
        Ok(())
    }

    /// intro → employment, guarded by the name check
    pub fn continue_to_employment(&mut self) -> Result<Vec<PlaybackCommand>, WizardError> {
        self.require_step(Step::Intro)?;
        if !self.action_enabled {
            return Err(WizardError::PlaybackPending);
        }
        if !self.fields.has_names() {
            let err = WizardError::MissingName;
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.error = None;
        let stop = self.engagement.stop_all();
        self.step = Step::Employment;
        let play = self.engagement.request_play(Clip::Employment);
        debug!("Session {} entered employment step", self.id);
        Ok(vec![stop, play])
    }

    /// Terminal answer: stamp completion and hand back the gateway request
    ///
    /// The session is marked as submitting until [`submission_failed`] or the
    /// caller discards it after a successful write.
    ///
    /// [`submission_failed`]: FormSession::submission_failed
    pub fn prepare_submission(
        &mut self,
        employment_status: bool,
        now: DateTime<Utc>,
    ) -> Result<(Vec<PlaybackCommand>, SubmissionRequest), WizardError> {
        self.require_step(Step::Employment)?;
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }

        let stop = self.engagement.stop_all();
        self.error = None;
        self.submitting = true;
        self.employment_status = Some(employment_status);
        self.form_completion_time = Some(now);
        self.form_completion_time_seconds = Some(elapsed_whole_secs(self.form_start_time, now));

        let dob = self.fields.dob.trim();
        let request = SubmissionRequest {
            session_id: self.id,
            first_name: self.fields.first_name.clone(),
            last_name: self.fields.last_name.clone(),
            dob: (!dob.is_empty()).then(|| dob.to_string()),
            company: self.company.clone(),
            employment_status: self.employment_status,
            engagement: self.engagement.metrics(),
            form_start_time: self.form_start_time,
            form_completion_time: now,
        };
        Ok((vec![stop], request))
    }

    /// The gateway failed; stay on employment so the visitor can answer again
    pub fn submission_failed(&mut self, message: &str) {
        self.submitting = false;
        self.employment_status = None;
        self.form_completion_time = None;
        self.form_completion_time_seconds = None;
        self.error = Some(message.to_string());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn view(&self, commands: Vec<PlaybackCommand>) -> SessionView {
        SessionView {
            session_id: self.id,
            company: self.company.clone(),
            step: self.step,
            first_name: self.fields.first_name.clone(),
            last_name: self.fields.last_name.clone(),
            dob: self.fields.dob.clone(),
            action_enabled: self.action_enabled,
            submitting: self.submitting,
            error: self.error.clone(),
            engagement: self.engagement.metrics(),
            form_start_time: self.form_start_time,
            commands,
        }
    }
}
