//! Streaming farend/nearend audio pipeline.
//!
//! Buffers loudspeaker ("farend") and microphone ("nearend") PCM, brings both
//! to a processing rate, splits them into bands and drives gain control,
//! noise suppression and echo cancellation engines frame by frame. The
//! processed stream comes back out at the nearend rate.
//!
//! The engines themselves live behind the traits in [`engine`].
//! [`engine::bypass::BypassEngines`] passes audio through untouched.
//!
//! # Quick Start
//!
//! ```
//! use sonora_stream::{Config, PipelineContext};
//! use sonora_stream::engine::bypass::BypassEngines;
//!
//! let mut ctx = PipelineContext::<f32>::builder(BypassEngines::new())
//!     .config(Config::default())
//!     .build();
//! ctx.init(2, 48000, 48000, 100)?;
//! ctx.set_farend_ready(true);
//! ctx.set_nearend_ready(true);
//!
//! // For each chunk of captured and rendered audio:
//! let chunk = vec![0u8; ctx.per_frame_bytes()];
//! ctx.push_farend(&chunk)?;
//! ctx.push_nearend(&chunk)?;
//!
//! let mut out = vec![0u8; ctx.per_frame_bytes()];
//! let written = ctx.try_process(&mut out)?;
//! assert_eq!(written, out.len());
//! # Ok::<(), sonora_stream::Error>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
mod error;
mod pipeline;
pub mod splitting_filter;
pub mod stats;
pub mod stream_format;
pub mod subband_buffer;

// Public re-exports.
pub use config::Config;
pub use engine::{EngineError, EngineFactory, Stage};
pub use error::{ConfigError, Error};
pub use pipeline::{InitStatus, MAX_FRAME_SIZE, PipelineBuilder, PipelineContext};
pub use sonora_common_audio::if_channel_buffer::Sample;
pub use stats::PipelineStats;
pub use stream_format::StreamFormat;
