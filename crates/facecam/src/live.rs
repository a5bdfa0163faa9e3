//! Capture → recognise → draw loop.

use crate::display::{Viewer, ViewerError, ESCAPE_KEY};
use facecam_core::{FaceLabeler, OracleError, Recognition};
use facecam_hw::{CameraError, FrameSource};
use image::imageops;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("recognition error: {0}")]
    Recognition(#[from] OracleError),
    #[error("display error: {0}")]
    Display(#[from] ViewerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped,
}

/// Owns the camera, the labeler, and the window for one live run.
///
/// Recognition runs on every `cadence`-th frame; frames in between are drawn
/// with the last result, so boxes can trail motion by up to `cadence - 1` frames.
pub struct LiveSession<S, L, V> {
    source: S,
    labeler: L,
    viewer: V,
    cadence: u64,
    frame_count: u64,
    last_result: Vec<Recognition>,
    state: SessionState,
}

impl<S, L, V> LiveSession<S, L, V>
where
    S: FrameSource,
    L: FaceLabeler,
    V: Viewer,
{
    /// `cadence` of 0 is treated as 1 (recognise every frame).
    pub fn new(source: S, labeler: L, viewer: V, cadence: u32) -> Self {
        Self {
            source,
            labeler,
            viewer,
            cadence: u64::from(cadence.max(1)),
            frame_count: 0,
            last_result: Vec::new(),
            state: SessionState::Running,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Faces drawn on the most recent frame.
    pub fn last_result(&self) -> &[Recognition] {
        &self.last_result
    }

    /// Process one frame. A no-op once stopped.
    pub fn step(&mut self) -> Result<SessionState, SessionError> {
        if self.state == SessionState::Stopped {
            return Ok(self.state);
        }

        let mut frame = self.source.read_frame()?;
        imageops::flip_horizontal_in_place(&mut frame);
        self.frame_count += 1;

        if self.frame_count % self.cadence == 0 {
            self.last_result = self.labeler.detect(&frame)?;
            tracing::debug!(
                frame = self.frame_count,
                faces = self.last_result.len(),
                "recognition refreshed"
            );
        }

        self.viewer.show(&frame, &self.last_result)?;

        if self.viewer.poll_key()? == Some(ESCAPE_KEY) {
            tracing::info!(frames = self.frame_count, "escape pressed");
            self.stop();
        }

        Ok(self.state)
    }

    /// Release the camera and close the window. Only the first call has effect.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = SessionState::Stopped;
        self.source.release();
        self.viewer.close();
    }

    /// Run until Escape. Any error stops the session before it is returned.
    ///
    /// Returns the number of frames processed.
    pub fn run(mut self) -> Result<u64, SessionError> {
        tracing::info!(cadence = self.cadence, "live session started");

        while self.state == SessionState::Running {
            if let Err(e) = self.step() {
                tracing::error!(error = %e, frames = self.frame_count, "live session aborted");
                self.stop();
                return Err(e);
            }
        }

        tracing::info!(frames = self.frame_count, "live session stopped");
        Ok(self.frame_count)
    }
}
