#![doc = include_str!("../README.md")]

pub use acheron_core as core;
pub use acheron_engine as engine;

mod audio;
mod config;
mod config_ops;
mod context;
mod registry;
mod service;
mod task;

pub use audio::{AudioDecoderDesc, AudioEncoderDesc, AudioHandle};
pub use config::{ConfigKind, ConfigValue};
pub use context::{MediaContext, StartupParams};
pub use service::MediaService;
pub use task::{BufferCallback, CallbackInfo, CodecCallback, MessageCallback, TaskStatus};

pub use acheron_core::error::{LookupError, MediaError, NotAllowed};

pub mod prelude {
    pub use crate::{
        AudioDecoderDesc, AudioEncoderDesc, AudioHandle, BufferCallback, CallbackInfo,
        CodecCallback, ConfigKind, ConfigValue, MediaContext, MediaService, MessageCallback,
        StartupParams, TaskStatus,
    };
    pub use acheron_core::prelude::*;
    pub use acheron_engine::{
        Engine, EngineConfig, EngineError, EngineFactory, EngineIo, EngineObserver,
        LoopbackEngine, loopback_factory,
    };
}
