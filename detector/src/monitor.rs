use chrono::Utc;
use crowdedness_common::config::Config;
use crowdedness_common::frame::Frame;
use crowdedness_common::occupancy::{OccupancyLevel, OccupancyReport};
use tracing::{debug, info};

use crate::background::{BackgroundError, TafBackground};
use crate::classifier::{ClassifierError, PeopleClassifier};
use crate::decision::{DecisionError, OccupancyPolicy};

/// What one call to [`OccupancyMonitor::process_frame`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The background window is still filling; the classifier was not run.
    WarmingUp { frames_ingested: u32, window_frames: u32 },
    Verdict(OccupancyReport),
}

/// One detector instance: background model, classifier and policy.
///
/// Every cycle runs to completion inside `process_frame`, so background
/// updates and comparisons never interleave.
pub struct OccupancyMonitor<C: PeopleClassifier> {
    background: TafBackground,
    classifier: C,
    policy: OccupancyPolicy,
    diff_threshold: f64,
    seq: u64,
    last_level: Option<OccupancyLevel>,
}

impl<C: PeopleClassifier> OccupancyMonitor<C> {
    pub fn new(
        background: TafBackground,
        classifier: C,
        policy: OccupancyPolicy,
        diff_threshold: f64,
    ) -> Self {
        Self {
            background,
            classifier,
            policy,
            diff_threshold,
            seq: 0,
            last_level: None,
        }
    }

    pub fn from_config(config: &Config, classifier: C) -> Result<Self, MonitorError> {
        let background = TafBackground::new(
            config.camera.geometry(),
            config.background.window_frames,
        )?;
        Ok(Self::new(
            background,
            classifier,
            OccupancyPolicy::from(&config.policy),
            config.background.diff_threshold,
        ))
    }

    /// Run one detection cycle for a freshly captured frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<CycleOutcome, MonitorError> {
        self.background.update(frame)?;
        self.seq += 1;

        if !self.background.is_warm() {
            debug!(
                seq = self.seq,
                frames_ingested = self.background.frames_ingested(),
                window = self.background.window_frames(),
                "background warming up, skipping inference"
            );
            return Ok(CycleOutcome::WarmingUp {
                frames_ingested: self.background.frames_ingested(),
                window_frames: self.background.window_frames(),
            });
        }

        let output = self.classifier.classify(frame)?;
        let people_probability = output.people_probability();
        let change_ratio = self.background.change_ratio(frame, self.diff_threshold)?;
        let level = self.policy.decide(people_probability, change_ratio)?;

        debug!(
            seq = self.seq,
            classifier = self.classifier.name(),
            nothing_probability = output.nothing_probability(),
            people_probability,
            change_ratio,
            %level,
            "cycle complete"
        );

        match self.last_level {
            Some(previous) if previous == level => {}
            Some(previous) => info!(
                seq = self.seq,
                people_probability,
                change_ratio,
                "occupancy changed: {previous} → {level}"
            ),
            None => info!(seq = self.seq, %level, "first occupancy verdict"),
        }
        self.last_level = Some(level);

        Ok(CycleOutcome::Verdict(OccupancyReport {
            seq: self.seq,
            level,
            people_probability,
            change_ratio,
            decided_at: Utc::now(),
        }))
    }

    pub fn background(&self) -> &TafBackground {
        &self.background
    }

    pub fn last_level(&self) -> Option<OccupancyLevel> {
        self.last_level
    }

    /// Frames accepted by the monitor so far, warm-up included.
    pub fn cycles(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("background model: {0}")]
    Background(#[from] BackgroundError),
    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("decision: {0}")]
    Decision(#[from] DecisionError),
}

impl MonitorError {
    /// Frames that do not match the configured geometry will never match it;
    /// retrying the next frame cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Background(BackgroundError::LengthMismatch { .. })
                | Self::Classifier(ClassifierError::InputShape { .. })
        )
    }
}
