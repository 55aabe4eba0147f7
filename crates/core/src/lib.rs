#![doc = include_str!("../README.md")]

pub mod buffer;
pub mod error;
pub mod metrics;
pub mod params;
pub mod queue;

pub mod prelude {
    pub use crate::{
        buffer::{MediaBuffer, OutputBufferInfo, UserData},
        error::{LookupError, MediaError, NotAllowed},
        metrics::{QueueMetrics, SessionCounters},
        params::{
            AppType, AudioDecParams, AudioEncParams, CameraSource, CodecId, CodecIdentity,
            CodecMessage, CodecParams, CodecState, DeblockParams, Denoise3dParams, Direction,
            EncodeMode, EntropyMode, EntropyParams, GopParams, IntraRefreshMode,
            IntraRefreshParams, JpegEncParams, LongtermRefParams, MirrorDirection,
            MjpegEncParams, ModeDecisionParams, MonochromeParams, PixelFormat, PredUnitParams,
            RateControlParams, RcMode, RoiParams, RoiParamsEx, RoiRegion, Rotation, SaoParams,
            SliceMode, SliceParams, SmartBgParams, TransformParams, VideoDecParams,
            VideoEncParams, VuiParams, VuiTimingParams,
        },
        queue::{DequeueOutcome, QueueOutcome, Wait, WaitQueue},
    };
}
