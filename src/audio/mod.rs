//! Audio handling module

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod format;
pub mod output;

pub use format::{
    AacProfile, AudioCodec, AudioFormat, ChannelConfig, CodecParams, SampleFormat, SampleRate,
};
pub use output::{AudioOutput, AudioOutputError, NullSink, OutputState, create_default_output};
