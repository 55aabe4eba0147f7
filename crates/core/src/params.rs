//! Codec identities, lifecycle states, and the parameter blocks exchanged
//! through the config surface.

/// Codec kinds addressable through the session API.
///
/// Audio ids exist so that app-type mismatches are expressible in lookups;
/// audio sessions themselves are handled by the audio subsystem, not the
/// task registry.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::{AppType, CodecId};
///
/// assert_eq!(CodecId::H265.app_type(), AppType::Video);
/// assert_eq!(CodecId::Jpeg.app_type(), AppType::Jpeg);
/// assert_eq!(CodecId::Aac.app_type(), AppType::Audio);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecId {
    H264,
    H265,
    Mjpeg,
    Jpeg,
    Aac,
    Flac,
    PcmMulaw,
    PcmAlaw,
    AdpcmG726,
    Adpcm,
}

impl CodecId {
    /// Application type used for instance tables and parameter applicability.
    pub fn app_type(self) -> AppType {
        match self {
            CodecId::H264 | CodecId::H265 => AppType::Video,
            CodecId::Mjpeg | CodecId::Jpeg => AppType::Jpeg,
            CodecId::Aac
            | CodecId::Flac
            | CodecId::PcmMulaw
            | CodecId::PcmAlaw
            | CodecId::AdpcmG726
            | CodecId::Adpcm => AppType::Audio,
        }
    }
}

/// Classification of a codec kind used to validate parameter applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AppType {
    Video,
    Jpeg,
    Audio,
}

/// Role of a codec session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Encoder,
    Decoder,
}

impl Direction {
    pub fn is_encoder(self) -> bool {
        matches!(self, Direction::Encoder)
    }
}

/// Identity of a codec session: kind plus role. Immutable once a task exists.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::{CodecId, CodecIdentity, Direction};
///
/// let id = CodecIdentity::new(CodecId::H265, Direction::Encoder);
/// assert!(id.direction.is_encoder());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodecIdentity {
    pub codec: CodecId,
    pub direction: Direction,
}

impl CodecIdentity {
    pub fn new(codec: CodecId, direction: Direction) -> Self {
        Self { codec, direction }
    }

    pub fn app_type(&self) -> AppType {
        self.codec.app_type()
    }
}

/// Lifecycle state of a codec task.
///
/// `Uninitialized` doubles as the reported state for contexts that have no
/// live task at all; absence is not an error for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecState {
    Uninitialized,
    Initialized,
    Configured,
    Running,
    Paused,
    Stopped,
    Released,
}

/// Messages delivered from the engine to a registered listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecMessage {
    /// The engine consumed the input buffer carrying `frame_end` and emitted
    /// the final output for this run.
    StreamDrained { frames: u64 },
    /// The engine reported an internal failure; the session stays usable
    /// until stopped.
    EngineFault(String),
}

/// Raw pixel layouts accepted on the uncompressed side of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    Yuv420Planar,
    Yuv422Planar,
    Nv12,
    Nv21,
    Yuyv,
    Rgb24,
    Gray8,
}

impl PixelFormat {
    /// Bytes of one full frame at the given dimensions.
    pub fn frame_bytes(self, width: u32, height: u32) -> usize {
        let px = width as usize * height as usize;
        match self {
            PixelFormat::Yuv420Planar | PixelFormat::Nv12 | PixelFormat::Nv21 => px * 3 / 2,
            PixelFormat::Yuv422Planar | PixelFormat::Yuyv => px * 2,
            PixelFormat::Rgb24 => px * 3,
            PixelFormat::Gray8 => px,
        }
    }
}

/// Rotation applied to source frames before encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    Ccw0,
    Ccw90,
    Ccw180,
    Ccw270,
}

/// Mirroring applied to source frames before encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MirrorDirection {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

/// Rate-control mode; each variant is valid for exactly one codec kind.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::{CodecId, RcMode};
///
/// assert_eq!(RcMode::H265Cbr.codec(), CodecId::H265);
/// assert_eq!(RcMode::MjpegFixQp.codec(), CodecId::Mjpeg);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RcMode {
    H264Cbr,
    H264Vbr,
    H264Avbr,
    H264FixQp,
    H264QpMap,
    H265Cbr,
    H265Vbr,
    H265Avbr,
    H265FixQp,
    H265QpMap,
    MjpegFixQp,
    JpegFixQp,
}

impl RcMode {
    /// The codec kind this mode belongs to.
    pub fn codec(self) -> CodecId {
        match self {
            RcMode::H264Cbr
            | RcMode::H264Vbr
            | RcMode::H264Avbr
            | RcMode::H264FixQp
            | RcMode::H264QpMap => CodecId::H264,
            RcMode::H265Cbr
            | RcMode::H265Vbr
            | RcMode::H265Avbr
            | RcMode::H265FixQp
            | RcMode::H265QpMap => CodecId::H265,
            RcMode::MjpegFixQp => CodecId::Mjpeg,
            RcMode::JpegFixQp => CodecId::Jpeg,
        }
    }

    fn default_for(codec: CodecId) -> RcMode {
        match codec {
            CodecId::H265 => RcMode::H265Cbr,
            CodecId::Mjpeg => RcMode::MjpegFixQp,
            CodecId::Jpeg => RcMode::JpegFixQp,
            _ => RcMode::H264Cbr,
        }
    }
}

/// Rate-control parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateControlParams {
    pub mode: RcMode,
    /// Target bitrate in kbit/s.
    pub bit_rate: u32,
    pub frame_rate: u32,
    /// Distance between intra frames; 0 disables periodic intra refresh.
    pub intra_period: u32,
    pub initial_qp: u32,
    pub min_qp: u32,
    pub max_qp: u32,
}

impl RateControlParams {
    pub fn default_for(codec: CodecId) -> Self {
        Self {
            mode: RcMode::default_for(codec),
            bit_rate: 8000,
            frame_rate: 30,
            intra_period: 30,
            initial_qp: 30,
            min_qp: 8,
            max_qp: 51,
        }
    }
}

/// GOP structure selection applied at configure time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GopParams {
    /// 0 = non-IRAP, 1 = CRA, 2 = IDR.
    pub decoding_refresh_type: u32,
    pub gop_preset: u32,
}

impl Default for GopParams {
    fn default() -> Self {
        Self {
            decoding_refresh_type: 2,
            gop_preset: 2,
        }
    }
}

/// Slice split mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SliceMode {
    #[default]
    Single,
    ByCodingUnits,
    ByBytes,
}

/// Slice split parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceParams {
    pub mode: SliceMode,
    /// Units per slice for the chosen mode; ignored for `Single`.
    pub size: u32,
}

/// Deblocking filter parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeblockParams {
    pub disable: bool,
    /// Alpha/tc offset, in [-6, 6].
    pub alpha_offset: i32,
    /// Beta offset, in [-6, 6].
    pub beta_offset: i32,
}

/// H.265 sample-adaptive-offset parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaoParams {
    pub luma_enable: bool,
    pub chroma_enable: bool,
}

impl Default for SaoParams {
    fn default() -> Self {
        Self {
            luma_enable: true,
            chroma_enable: true,
        }
    }
}

/// H.264 entropy coding selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntropyMode {
    Cavlc,
    #[default]
    Cabac,
}

/// H.264 entropy parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropyParams {
    pub mode: EntropyMode,
}

/// VUI parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VuiParams {
    pub aspect_ratio_idc: u32,
    pub overscan_appropriate: bool,
    pub video_signal_type_present: bool,
}

/// VUI timing parameter block; defaults derive from the configured frame rate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VuiTimingParams {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate: bool,
}

impl VuiTimingParams {
    /// Default timing for a nonzero frame rate.
    pub fn for_frame_rate(frame_rate: u32) -> Self {
        Self {
            num_units_in_tick: 1000,
            time_scale: frame_rate * 1000,
            fixed_frame_rate: true,
        }
    }
}

/// Long-term reference picture parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LongtermRefParams {
    pub use_longterm: bool,
    pub longterm_period: u32,
    pub longterm_delta_qp: i32,
}

/// Intra refresh pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntraRefreshMode {
    #[default]
    None,
    Row,
    Column,
    Step,
}

/// Intra refresh parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntraRefreshParams {
    pub mode: IntraRefreshMode,
    /// Rows/columns/step size per refresh cycle; ignored for `None`.
    pub arg: u32,
}

/// H.265 temporal denoise (3DNR) parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Denoise3dParams {
    pub enable: bool,
    pub strength: u32,
    pub motion_threshold: u32,
}

/// Smart background encoding parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmartBgParams {
    pub enable: bool,
    pub detect_threshold: u32,
    pub bg_qp_delta: i32,
}

/// H.265 mode-decision tuning parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeDecisionParams {
    pub enable: bool,
    pub intra_cost_bias: i32,
    pub merge_cost_bias: i32,
}

/// Monochrome encoding parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonochromeParams {
    pub enable: bool,
}

/// Prediction-unit parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredUnitParams {
    pub constrained_intra_pred: bool,
    pub strong_intra_smoothing: bool,
}

/// Transform parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformParams {
    /// Chroma Cb QP offset, in [-12, 12].
    pub chroma_cb_qp_offset: i32,
    /// Chroma Cr QP offset, in [-12, 12].
    pub chroma_cr_qp_offset: i32,
}

/// A single region-of-interest rectangle with its QP override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoiRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub qp: u32,
}

/// Region-of-interest parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoiParams {
    pub enable: bool,
    pub regions: Vec<RoiRegion>,
}

/// Per-index region-of-interest parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoiParamsEx {
    pub roi_index: u32,
    pub enable: bool,
    pub region: RoiRegion,
}

/// Encoder operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeMode {
    #[default]
    Normal,
    LowLatency,
}

/// MJPEG encoder parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MjpegEncParams {
    /// JPEG quality factor, in [1, 99].
    pub quality_factor: u32,
    pub restart_interval: u32,
}

impl Default for MjpegEncParams {
    fn default() -> Self {
        Self {
            quality_factor: 80,
            restart_interval: 0,
        }
    }
}

/// JPEG still encoder parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JpegEncParams {
    /// JPEG quality factor, in [1, 99].
    pub quality_factor: u32,
    pub restart_interval: u32,
    pub thumbnail_enable: bool,
}

impl Default for JpegEncParams {
    fn default() -> Self {
        Self {
            quality_factor: 85,
            restart_interval: 0,
            thumbnail_enable: false,
        }
    }
}

/// Camera pipeline binding for encoders fed directly from a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraSource {
    pub pipeline: i32,
    pub channel: i32,
}

/// Video encoder configure-time parameters.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::{CodecId, VideoEncParams};
///
/// let params = VideoEncParams::default_for(CodecId::H265);
/// assert_eq!(params.width, 1920);
/// assert_eq!(params.rc.frame_rate, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoEncParams {
    pub width: u32,
    pub height: u32,
    pub pix_fmt: PixelFormat,
    /// Number of raw frame buffers exchanged with the caller.
    pub frame_buf_count: u32,
    pub external_frame_buf: bool,
    /// Number of bitstream buffers exchanged with the caller.
    pub bitstream_buf_count: u32,
    /// Bytes per bitstream buffer; 0 derives a bound from the resolution.
    pub bitstream_buf_size: u32,
    pub rc: RateControlParams,
    pub gop: GopParams,
    pub rotation: Rotation,
    pub mirror: MirrorDirection,
}

impl VideoEncParams {
    pub fn default_for(codec: CodecId) -> Self {
        Self {
            width: 1920,
            height: 1080,
            pix_fmt: PixelFormat::Yuv420Planar,
            frame_buf_count: 5,
            external_frame_buf: false,
            bitstream_buf_count: 5,
            bitstream_buf_size: 0,
            rc: RateControlParams::default_for(codec),
            gop: GopParams::default(),
            rotation: Rotation::Ccw0,
            mirror: MirrorDirection::None,
        }
    }
}

/// Video decoder configure-time parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoDecParams {
    pub pix_fmt: PixelFormat,
    /// Largest decodable picture width.
    pub width: u32,
    /// Largest decodable picture height.
    pub height: u32,
    pub bitstream_buf_count: u32,
    /// Bytes per bitstream buffer; 0 derives a bound from the resolution.
    pub bitstream_buf_size: u32,
    pub frame_buf_count: u32,
}

impl VideoDecParams {
    pub fn default_for(_codec: CodecId) -> Self {
        Self {
            pix_fmt: PixelFormat::Nv12,
            width: 1920,
            height: 1080,
            bitstream_buf_count: 5,
            bitstream_buf_size: 0,
            frame_buf_count: 5,
        }
    }
}

/// Audio encoder configure-time parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioEncParams {
    pub sample_rate: u32,
    pub channels: u32,
    /// Target bitrate in kbit/s.
    pub bit_rate: u32,
}

impl AudioEncParams {
    pub fn default_for(_codec: CodecId) -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            bit_rate: 128,
        }
    }
}

/// Audio decoder configure-time parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioDecParams {
    pub sample_rate: u32,
    pub channels: u32,
}

impl AudioDecParams {
    pub fn default_for(_codec: CodecId) -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// Tagged configure-time parameter union carried by a context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecParams {
    VideoEncoder(VideoEncParams),
    VideoDecoder(VideoDecParams),
    AudioEncoder(AudioEncParams),
    AudioDecoder(AudioDecParams),
}

impl CodecParams {
    /// The role implied by the parameter variant.
    pub fn direction(&self) -> Direction {
        match self {
            CodecParams::VideoEncoder(_) | CodecParams::AudioEncoder(_) => Direction::Encoder,
            CodecParams::VideoDecoder(_) | CodecParams::AudioDecoder(_) => Direction::Decoder,
        }
    }

    pub fn as_video_enc(&self) -> Option<&VideoEncParams> {
        match self {
            CodecParams::VideoEncoder(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_video_enc_mut(&mut self) -> Option<&mut VideoEncParams> {
        match self {
            CodecParams::VideoEncoder(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_video_dec(&self) -> Option<&VideoDecParams> {
        match self {
            CodecParams::VideoDecoder(p) => Some(p),
            _ => None,
        }
    }

    /// Configured encoder frame rate, when this is a video encoder block.
    pub fn frame_rate(&self) -> Option<u32> {
        self.as_video_enc().map(|p| p.rc.frame_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_modes_bind_to_their_codec() {
        assert_eq!(RcMode::H264Avbr.codec(), CodecId::H264);
        assert_eq!(RcMode::H265QpMap.codec(), CodecId::H265);
        assert_eq!(RcMode::JpegFixQp.codec(), CodecId::Jpeg);
        assert_eq!(
            RateControlParams::default_for(CodecId::H265).mode,
            RcMode::H265Cbr
        );
    }

    #[test]
    fn frame_bytes_follow_subsampling() {
        assert_eq!(PixelFormat::Yuv420Planar.frame_bytes(1920, 1080), 3_110_400);
        assert_eq!(PixelFormat::Yuyv.frame_bytes(640, 480), 614_400);
        assert_eq!(PixelFormat::Rgb24.frame_bytes(2, 2), 12);
        assert_eq!(PixelFormat::Gray8.frame_bytes(16, 16), 256);
    }

    #[test]
    fn params_variant_implies_direction() {
        let enc = CodecParams::VideoEncoder(VideoEncParams::default_for(CodecId::H264));
        let dec = CodecParams::VideoDecoder(VideoDecParams::default_for(CodecId::H264));
        assert_eq!(enc.direction(), Direction::Encoder);
        assert_eq!(dec.direction(), Direction::Decoder);
        assert_eq!(enc.frame_rate(), Some(30));
        assert_eq!(dec.frame_rate(), None);
    }
}
