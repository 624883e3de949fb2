//! Frame source contract
//!
//! The engine never captures frames itself. A host injects a [`FrameSource`]
//! that produces either averaged pixel samples ([`PixelSampler`]) or pose
//! landmark frames ([`PoseProvider`]). Acquisition of the underlying device
//! is scoped by [`AcquiredSource`], which releases it on drop.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::ComputeError;
use crate::exercise::types::LandmarkFrame;
use crate::types::RgbSample;

/// Result of polling a source for its next frame
#[derive(Debug, Clone, PartialEq)]
pub enum FramePoll<F> {
    /// A frame is ready for processing
    Ready(F),
    /// No new frame yet; try again on the next tick
    Pending,
    /// A frame arrived but could not be read; it is skipped
    Dropped(String),
    /// The stream is over
    Ended,
}

/// A device or stream that yields frames one at a time
pub trait FrameSource {
    type Frame;

    /// Acquire the underlying device (camera permission, pose model, ...).
    fn open(&mut self) -> Result<(), ComputeError>;

    /// Poll for the next frame. Never blocks.
    fn poll_frame(&mut self) -> FramePoll<Self::Frame>;

    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);
}

/// Source of averaged RGB samples from the camera's central region
pub trait PixelSampler: FrameSource<Frame = RgbSample> {}

impl<T: FrameSource<Frame = RgbSample>> PixelSampler for T {}

/// Source of pose landmark frames from an external pose detector
pub trait PoseProvider: FrameSource<Frame = LandmarkFrame> {}

impl<T: FrameSource<Frame = LandmarkFrame>> PoseProvider for T {}

/// An opened source that is closed again when dropped
#[derive(Debug)]
pub struct AcquiredSource<S: FrameSource> {
    source: Option<S>,
}

impl<S: FrameSource> AcquiredSource<S> {
    /// Open `source`. On failure the source is handed back with the error so
    /// the caller can retry acquisition later.
    pub fn acquire(mut source: S) -> Result<Self, (S, ComputeError)> {
        match source.open() {
            Ok(()) => Ok(Self {
                source: Some(source),
            }),
            Err(e) => {
                source.close();
                Err((source, e))
            }
        }
    }

    pub fn poll_frame(&mut self) -> FramePoll<S::Frame> {
        match self.source.as_mut() {
            Some(source) => source.poll_frame(),
            None => FramePoll::Ended,
        }
    }

    /// Close the device and return the source for later reacquisition.
    pub fn release(mut self) -> S {
        // `source` is only taken here and in drop
        let mut source = self.source.take().expect("acquired source present");
        source.close();
        debug!("frame source released");
        source
    }
}

impl<S: FrameSource> Drop for AcquiredSource<S> {
    fn drop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.close();
            debug!("frame source released on drop");
        }
    }
}

/// Replays a recorded sequence of frames, one per poll
#[derive(Debug, Clone)]
pub struct ReplaySource<F> {
    recorded: Vec<F>,
    pending: VecDeque<F>,
    open: bool,
}

impl<F: Clone> ReplaySource<F> {
    pub fn new(frames: Vec<F>) -> Self {
        Self {
            recorded: frames,
            pending: VecDeque::new(),
            open: false,
        }
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl<F: Clone> FrameSource for ReplaySource<F> {
    type Frame = F;

    fn open(&mut self) -> Result<(), ComputeError> {
        // Reacquiring restarts the recording from the beginning
        self.pending = self.recorded.iter().cloned().collect();
        self.open = true;
        Ok(())
    }

    fn poll_frame(&mut self) -> FramePoll<F> {
        if !self.open {
            return FramePoll::Ended;
        }
        match self.pending.pop_front() {
            Some(frame) => FramePoll::Ready(frame),
            None => FramePoll::Ended,
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DeniedCamera {
        closed: usize,
    }

    impl FrameSource for DeniedCamera {
        type Frame = RgbSample;

        fn open(&mut self) -> Result<(), ComputeError> {
            Err(ComputeError::SourceUnavailable(
                "camera permission denied".to_string(),
            ))
        }

        fn poll_frame(&mut self) -> FramePoll<RgbSample> {
            FramePoll::Ended
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    #[test]
    fn test_replay_yields_in_order() {
        let source = ReplaySource::new(vec![1, 2, 3]);
        let mut acquired = AcquiredSource::acquire(source).unwrap();
        assert_eq!(acquired.poll_frame(), FramePoll::Ready(1));
        assert_eq!(acquired.poll_frame(), FramePoll::Ready(2));
        assert_eq!(acquired.poll_frame(), FramePoll::Ready(3));
        assert_eq!(acquired.poll_frame(), FramePoll::Ended);
    }

    #[test]
    fn test_release_closes_and_reacquire_restarts() {
        let source = ReplaySource::new(vec!["a", "b"]);
        let mut acquired = AcquiredSource::acquire(source).unwrap();
        assert_eq!(acquired.poll_frame(), FramePoll::Ready("a"));

        let source = acquired.release();
        assert!(!source.is_open());

        let mut acquired = AcquiredSource::acquire(source).unwrap();
        assert_eq!(acquired.poll_frame(), FramePoll::Ready("a"));
    }

    #[test]
    fn test_failed_acquisition_returns_source() {
        let camera = DeniedCamera { closed: 0 };
        let (camera, err) = AcquiredSource::acquire(camera).unwrap_err();
        assert!(matches!(err, ComputeError::SourceUnavailable(_)));
        assert_eq!(camera.closed, 1);
    }

    #[test]
    fn test_unopened_replay_is_ended() {
        let mut source = ReplaySource::new(vec![1]);
        assert_eq!(source.poll_frame(), FramePoll::Ended);
    }
}
