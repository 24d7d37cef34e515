//! Pass-through engines.
//!
//! Every stage copies its input bands to its output unchanged. Useful for
//! exercising the pipeline's buffering, rate adaptation and band splitting
//! without real signal processing.

use std::marker::PhantomData;

use sonora_common_audio::channel_buffer::{Bands, BandsMut};
use sonora_common_audio::if_channel_buffer::Sample;

use super::{
    DEFAULT_MAX_PROCESSING_RATE_HZ, EchoCanceller, EngineError, EngineFactory, GainController,
    GainOutcome, NoiseSuppressor,
};
use crate::config::{self, GainControlMode, NoiseSuppressionLevel};

/// Engine factory whose engines leave the audio untouched.
#[derive(Debug, Clone, Copy)]
pub struct BypassEngines {
    max_processing_rate_hz: u32,
}

impl BypassEngines {
    pub fn new() -> Self {
        Self {
            max_processing_rate_hz: DEFAULT_MAX_PROCESSING_RATE_HZ,
        }
    }

    /// Cap the processing rate, e.g. at 16 kHz to mimic mobile echo control.
    pub fn with_max_processing_rate(max_processing_rate_hz: u32) -> Self {
        Self {
            max_processing_rate_hz,
        }
    }
}

impl Default for BypassEngines {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sample> EngineFactory<S> for BypassEngines {
    fn max_processing_rate_hz(&self) -> u32 {
        self.max_processing_rate_hz
    }

    fn echo_canceller(&mut self) -> Result<Box<dyn EchoCanceller<S>>, EngineError> {
        Ok(Box::new(Bypass::<S>::default()))
    }

    fn noise_suppressor(&mut self) -> Result<Box<dyn NoiseSuppressor<S>>, EngineError> {
        Ok(Box::new(Bypass::<S>::default()))
    }

    fn gain_controller(&mut self) -> Result<Box<dyn GainController>, EngineError> {
        Ok(Box::new(Bypass::<i16>::default()))
    }
}

#[derive(Debug, Default)]
struct Bypass<S> {
    _sample: PhantomData<S>,
}

impl<S: Sample> EchoCanceller<S> for Bypass<S> {
    fn init(&mut self, _sample_rate_hz: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_config(&mut self, _config: &config::EchoCanceller) -> Result<(), EngineError> {
        Ok(())
    }

    fn buffer_farend(&mut self, _farend: &[S]) -> Result<(), EngineError> {
        Ok(())
    }

    fn process(
        &mut self,
        nearend: Bands<'_, S>,
        mut out: BandsMut<'_, S>,
        _delay_ms: u16,
    ) -> Result<(), EngineError> {
        out.copy_from(nearend);
        Ok(())
    }
}

impl<S: Sample> NoiseSuppressor<S> for Bypass<S> {
    fn init(&mut self, _sample_rate_hz: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_policy(&mut self, _level: NoiseSuppressionLevel) -> Result<(), EngineError> {
        Ok(())
    }

    fn analyze(&mut self, _band0: &[S]) -> Result<(), EngineError> {
        Ok(())
    }

    fn process(&mut self, nearend: Bands<'_, S>, mut out: BandsMut<'_, S>) -> Result<(), EngineError> {
        out.copy_from(nearend);
        Ok(())
    }
}

impl GainController for Bypass<i16> {
    fn init(
        &mut self,
        _min_level: i32,
        _max_level: i32,
        _mode: GainControlMode,
        _sample_rate_hz: u32,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_config(&mut self, _config: &config::GainControl) -> Result<(), EngineError> {
        Ok(())
    }

    fn add_mic(&mut self, _nearend: Bands<'_, i16>) -> Result<(), EngineError> {
        Ok(())
    }

    fn process(
        &mut self,
        nearend: Bands<'_, i16>,
        mut out: BandsMut<'_, i16>,
        mic_level: i32,
        _stream_has_echo: bool,
    ) -> Result<GainOutcome, EngineError> {
        out.copy_from(nearend);
        Ok(GainOutcome {
            mic_level,
            saturation_warning: false,
        })
    }
}
