use std::sync::Arc;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    #[error("Please enter a name")]
    EmptyName,
    #[error("no still frame has been captured")]
    NoStill,
    #[error("enrollment is busy")]
    Busy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnrollmentStage {
    #[default]
    Idle,
    Capturing,
    Confirming,
    Submitting,
}

/// Validates a user-supplied label. Surrounding whitespace is dropped.
pub fn validate_name(name: &str) -> Result<String, EnrollmentError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EnrollmentError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// The enrollment side-flow: one held still frame plus the label typed
/// for it. Runs alongside the polling loop without touching it.
#[derive(Clone, Debug, Default)]
pub struct Enrollment {
    stage: EnrollmentStage,
    name: String,
    still: Option<Arc<Frame>>,
}

/// Read-only copy handed to front ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrollmentView {
    pub stage: EnrollmentStage,
    pub name: String,
    pub still: Option<Arc<Frame>>,
}

impl Enrollment {
    pub fn stage(&self) -> EnrollmentStage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn still(&self) -> Option<&Arc<Frame>> {
        self.still.as_ref()
    }

    /// A still can be (re)taken while nothing is pending.
    pub fn can_capture(&self) -> bool {
        matches!(
            self.stage,
            EnrollmentStage::Idle | EnrollmentStage::Confirming
        )
    }

    pub fn begin_capture(&mut self) -> Result<(), EnrollmentError> {
        if !self.can_capture() {
            return Err(EnrollmentError::Busy);
        }
        self.stage = EnrollmentStage::Capturing;
        Ok(())
    }

    /// Stores the captured still. Ignored unless a capture was requested.
    pub fn hold(&mut self, still: Arc<Frame>) -> bool {
        if self.stage != EnrollmentStage::Capturing {
            return false;
        }
        self.still = Some(still);
        self.stage = EnrollmentStage::Confirming;
        true
    }

    /// Capture failed: fall back to whatever was held before.
    pub fn capture_failed(&mut self) {
        if self.stage == EnrollmentStage::Capturing {
            self.stage = if self.still.is_some() {
                EnrollmentStage::Confirming
            } else {
                EnrollmentStage::Idle
            };
        }
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Moves to `Submitting` and returns what must be sent.
    pub fn begin_submit(&mut self) -> Result<(String, Arc<Frame>), EnrollmentError> {
        match self.stage {
            EnrollmentStage::Confirming => {}
            EnrollmentStage::Capturing | EnrollmentStage::Submitting => {
                return Err(EnrollmentError::Busy)
            }
            EnrollmentStage::Idle => return Err(EnrollmentError::NoStill),
        }
        let name = validate_name(&self.name)?;
        let still = self.still.clone().ok_or(EnrollmentError::NoStill)?;
        self.stage = EnrollmentStage::Submitting;
        Ok((name, still))
    }

    /// Clears the held still and label.
    pub fn succeeded(&mut self) {
        *self = Self::default();
    }

    /// Keeps the still so the user can retry.
    pub fn failed(&mut self) {
        if self.stage == EnrollmentStage::Submitting {
            self.stage = EnrollmentStage::Confirming;
        }
    }

    /// Drops everything unless a submission is already on the wire.
    pub fn cancel(&mut self) -> bool {
        if self.stage == EnrollmentStage::Submitting {
            return false;
        }
        *self = Self::default();
        true
    }

    pub fn view(&self) -> EnrollmentView {
        EnrollmentView {
            stage: self.stage,
            name: self.name.clone(),
            still: self.still.clone(),
        }
    }
}
