#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod audio_util;
pub mod channel_buffer;
pub mod if_channel_buffer;
pub mod rate_adapter;
