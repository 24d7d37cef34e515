//! Pipeline counters.

/// Running counters for one initialized session.
///
/// Counters are cleared by `init` and `fini`, not by `reset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames run through `do_process`.
    pub frames_processed: u64,
    /// Frames on which the echo canceller ran.
    pub aec_frames: u64,
    /// Farend bytes zero-filled because the farend ring ran short.
    pub farend_underrun_bytes: u64,
    /// Farend bytes dropped because the ring was full.
    pub dropped_farend_bytes: u64,
    /// Nearend bytes dropped because the ring was full.
    pub dropped_nearend_bytes: u64,
    /// Frames where the echo canceller failed and the nearend passed through.
    pub echo_canceller_failures: u64,
    /// Frames where noise suppression failed and the bands passed through.
    pub noise_suppressor_failures: u64,
    /// Frames where gain control failed and the bands passed through.
    pub gain_controller_failures: u64,
    /// Mic level reported by the gain controller, if it is running.
    pub mic_level: Option<i32>,
}
