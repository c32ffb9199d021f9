//! Check-in session: the five-step wizard as an explicit state machine.
//!
//! ```text
//! capture → quality → questions → analyzing → results
//! ```
//! Transitions are caller-driven and validated against one table. One
//! analysis may be in flight per session; a duplicate `analyze` is rejected,
//! and `cancel` discards whatever the in-flight analysis produces.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::models::{CheckInResult, SymptomContext};
use crate::pipeline::imaging::{prepare_frame, AnalysisFrame, RasterBuffer};
use crate::pipeline::quality::{assess_quality, QualityReport};
use crate::pipeline::signals::{build_extractor, SignalExtractor};
use crate::pipeline::{assess_frame, AnalysisError};

// ═══════════════════════════════════════════════════════════
// Steps & transitions
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckInStep {
    #[default]
    Capture,
    Quality,
    Questions,
    Analyzing,
    Results,
}

impl CheckInStep {
    pub const ALL: [CheckInStep; 5] = [
        Self::Capture,
        Self::Quality,
        Self::Questions,
        Self::Analyzing,
        Self::Results,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Quality => "quality",
            Self::Questions => "questions",
            Self::Analyzing => "analyzing",
            Self::Results => "results",
        }
    }

    /// Step-bar label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Capture => "Photo",
            Self::Quality => "Quality",
            Self::Questions => "Context",
            Self::Analyzing => "Analysis",
            Self::Results => "Results",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Capture => 0,
            Self::Quality => 1,
            Self::Questions => 2,
            Self::Analyzing => 3,
            Self::Results => 4,
        }
    }

    /// Whether this step is behind `current` in the wizard.
    pub fn is_done(&self, current: CheckInStep) -> bool {
        self.index() < current.index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    SubmitPhoto,
    Retake,
    ContinueToQuestions,
    Back,
    Analyze,
    Complete,
    Cancel,
    Save,
    Discard,
}

impl SessionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitPhoto => "submit_photo",
            Self::Retake => "retake",
            Self::ContinueToQuestions => "continue_to_questions",
            Self::Back => "back",
            Self::Analyze => "analyze",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Save => "save",
            Self::Discard => "discard",
        }
    }
}

/// The transition table. `None` = rejected.
///
/// `analyzing` only leaves via completion or cancel; back/retake are not
/// accepted there.
pub fn next_step(from: CheckInStep, action: SessionAction) -> Option<CheckInStep> {
    use CheckInStep::*;
    use SessionAction::*;

    match (from, action) {
        (_, Cancel) => Some(Capture),
        (Capture, SubmitPhoto) => Some(Quality),
        (Quality, Retake) => Some(Capture),
        (Quality, ContinueToQuestions) => Some(Questions),
        (Questions, Back) => Some(Quality),
        (Questions, Analyze) => Some(Analyzing),
        (Analyzing, Complete) => Some(Results),
        (Results, Discard) => Some(Capture),
        (Results, Save) => Some(Capture),
        _ => None,
    }
}

/// One entry of the step bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEntry {
    pub step: CheckInStep,
    pub label: &'static str,
    pub done: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    pub current: CheckInStep,
    pub steps: Vec<StepEntry>,
}

impl StepProgress {
    pub fn at(current: CheckInStep) -> Self {
        Self {
            current,
            steps: CheckInStep::ALL
                .iter()
                .map(|&step| StepEntry {
                    step,
                    label: step.label(),
                    done: step.is_done(current),
                    active: step == current,
                })
                .collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Errors & persistence seam
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Cannot {action} while in {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    #[error("An analysis is already running for this check-in")]
    AnalysisInFlight,
    #[error("No photo has been submitted")]
    MissingPhoto,
    #[error("No analysis result to save")]
    MissingResult,
    #[error("Check-in was cancelled")]
    Cancelled,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("Internal lock error")]
    LockPoisoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Failed to serialize check-in: {0}")]
    Serialization(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator. Receives completed check-ins on save.
pub trait ResultSink: Send + Sync {
    fn store(&self, result: &CheckInResult) -> Result<(), SinkError>;
}

/// In-memory sink keeping serialized results, newest last.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<String>>, SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Unavailable("sink lock poisoned".into()))
    }

    pub fn len(&self) -> Result<usize, SinkError> {
        Ok(self.guard()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, SinkError> {
        Ok(self.len()? == 0)
    }

    /// Stored JSON records, oldest first.
    pub fn records(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.guard()?.clone())
    }
}

impl ResultSink for MemorySink {
    fn store(&self, result: &CheckInResult) -> Result<(), SinkError> {
        let json = result
            .to_json()
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        self.guard()?.push(json);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// CheckInSession
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
struct SessionInner {
    step: CheckInStep,
    /// Downscaled working copy; consumed by analysis.
    frame: Option<AnalysisFrame>,
    quality: Option<QualityReport>,
    result: Option<CheckInResult>,
}

impl SessionInner {
    fn apply(&mut self, action: SessionAction) -> Result<CheckInStep, SessionError> {
        let from = self.step;
        match next_step(from, action) {
            Some(to) => {
                info!(from = from.as_str(), to = to.as_str(), action = action.as_str(), "Check-in transition");
                self.step = to;
                Ok(to)
            }
            None => {
                warn!(from = from.as_str(), action = action.as_str(), "Rejected check-in transition");
                Err(SessionError::InvalidTransition {
                    from: from.as_str(),
                    action: action.as_str(),
                })
            }
        }
    }

    fn ensure(&self, action: SessionAction) -> Result<(), SessionError> {
        if next_step(self.step, action).is_none() {
            warn!(from = self.step.as_str(), action = action.as_str(), "Rejected check-in transition");
            return Err(SessionError::InvalidTransition {
                from: self.step.as_str(),
                action: action.as_str(),
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.frame = None;
        self.quality = None;
        self.result = None;
    }
}

/// Clears the in-flight flag when analysis ends, however it ends.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One user check-in, from photo to saved (or discarded) result.
///
/// `Send + Sync`; share behind `Arc` when the UI and the analysis worker
/// live on different threads.
pub struct CheckInSession {
    config: PipelineConfig,
    extractor: Arc<dyn SignalExtractor>,
    inner: Mutex<SessionInner>,
    analyzing: AtomicBool,
    cancelled: AtomicBool,
}

impl CheckInSession {
    /// Session using the deployment's configured extractor.
    pub fn new(config: PipelineConfig) -> Self {
        let extractor = build_extractor(&config);
        Self::with_extractor(config, extractor)
    }

    pub fn with_extractor(config: PipelineConfig, extractor: Arc<dyn SignalExtractor>) -> Self {
        Self {
            config,
            extractor,
            inner: Mutex::new(SessionInner::default()),
            analyzing: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionInner>, SessionError> {
        self.inner.lock().map_err(|_| SessionError::LockPoisoned)
    }

    pub fn step(&self) -> Result<CheckInStep, SessionError> {
        Ok(self.lock()?.step)
    }

    pub fn progress(&self) -> Result<StepProgress, SessionError> {
        Ok(StepProgress::at(self.step()?))
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::Acquire)
    }

    /// Whether the session still holds pixel data. False once analysis has
    /// consumed the photo.
    pub fn has_photo(&self) -> Result<bool, SessionError> {
        Ok(self.lock()?.frame.is_some())
    }

    /// Quality report of the current photo, if one was submitted.
    pub fn quality_report(&self) -> Result<Option<QualityReport>, SessionError> {
        Ok(self.lock()?.quality.clone())
    }

    /// Completed result, available in `results`.
    pub fn result(&self) -> Result<Option<CheckInResult>, SessionError> {
        Ok(self.lock()?.result.clone())
    }

    /// Analyse a captured photo and move to `quality`.
    ///
    /// The report is returned so the caller can offer a retake. An invalid
    /// raster leaves the session in `capture`.
    pub fn submit_photo(&self, raster: &RasterBuffer) -> Result<QualityReport, SessionError> {
        self.lock()?.ensure(SessionAction::SubmitPhoto)?;

        let frame = prepare_frame(raster, self.config.max_analysis_dimension)?;
        let report = assess_quality(&frame.stats, frame.native_width, frame.native_height);

        let mut inner = self.lock()?;
        inner.apply(SessionAction::SubmitPhoto)?;
        inner.frame = Some(frame);
        inner.quality = Some(report.clone());

        if !report.pass {
            info!(failing = ?report.failing_checks(), "Photo submitted with quality issues");
        }
        Ok(report)
    }

    /// Discard the photo and return to `capture`.
    pub fn retake(&self) -> Result<CheckInStep, SessionError> {
        let mut inner = self.lock()?;
        let step = inner.apply(SessionAction::Retake)?;
        inner.reset();
        Ok(step)
    }

    /// Accept the photo (even after a failed gate) and move to `questions`.
    pub fn continue_to_questions(&self) -> Result<CheckInStep, SessionError> {
        self.lock()?.apply(SessionAction::ContinueToQuestions)
    }

    /// Back from `questions` to `quality`; the photo is kept.
    pub fn back(&self) -> Result<CheckInStep, SessionError> {
        self.lock()?.apply(SessionAction::Back)
    }

    /// Run the analysis stages and move to `results`.
    ///
    /// The session lock is released while signals are extracted. A second
    /// call during that window gets `AnalysisInFlight`; a `cancel` during it
    /// makes this call return `Cancelled` and drops the result. If extraction
    /// itself fails the photo is gone, so the session returns to `capture`.
    pub fn analyze(&self, symptoms: SymptomContext) -> Result<CheckInResult, SessionError> {
        let _in_flight =
            InFlightGuard::acquire(&self.analyzing).ok_or(SessionError::AnalysisInFlight)?;

        let (frame, quality) = {
            let mut inner = self.lock()?;
            inner.ensure(SessionAction::Analyze)?;
            let quality = inner.quality.clone().ok_or(SessionError::MissingPhoto)?;
            let frame = inner.frame.take().ok_or(SessionError::MissingPhoto)?;
            self.cancelled.store(false, Ordering::Release);
            inner.apply(SessionAction::Analyze)?;
            (frame, quality)
        };

        let assessment = assess_frame(frame, quality, &symptoms, self.extractor.as_ref());

        let mut inner = self.lock()?;
        if self.cancelled.swap(false, Ordering::AcqRel) {
            info!("Discarding analysis of a cancelled check-in");
            return Err(SessionError::Cancelled);
        }

        let assessment = match assessment {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, "Analysis failed, check-in needs a new photo");
                inner.apply(SessionAction::Cancel)?;
                inner.reset();
                return Err(e.into());
            }
        };

        let result = CheckInResult::new(assessment);
        inner.apply(SessionAction::Complete)?;
        inner.result = Some(result.clone());
        Ok(result)
    }

    /// `analyze` on the tokio blocking pool.
    pub async fn analyze_async(
        self: Arc<Self>,
        symptoms: SymptomContext,
    ) -> Result<CheckInResult, SessionError> {
        tokio::task::spawn_blocking(move || self.analyze(symptoms))
            .await
            .map_err(|e| SessionError::Analysis(AnalysisError::TaskFailed(e.to_string())))?
    }

    /// Abandon the check-in from any step and return to `capture`.
    pub fn cancel(&self) -> Result<CheckInStep, SessionError> {
        let mut inner = self.lock()?;
        if inner.step == CheckInStep::Analyzing {
            self.cancelled.store(true, Ordering::Release);
        }
        let step = inner.apply(SessionAction::Cancel)?;
        inner.reset();
        Ok(step)
    }

    /// Hand the result to `sink` and start over. On sink failure the
    /// session stays in `results` so the save can be retried.
    pub fn save(&self, sink: &dyn ResultSink) -> Result<CheckInStep, SessionError> {
        let mut inner = self.lock()?;
        inner.ensure(SessionAction::Save)?;
        let result = inner.result.as_ref().ok_or(SessionError::MissingResult)?;
        sink.store(result)?;
        info!(id = %result.id, "Check-in saved");

        let step = inner.apply(SessionAction::Save)?;
        inner.reset();
        Ok(step)
    }

    /// Drop the result without saving and start over.
    pub fn discard(&self) -> Result<CheckInStep, SessionError> {
        let mut inner = self.lock()?;
        let step = inner.apply(SessionAction::Discard)?;
        inner.reset();
        Ok(step)
    }
}
