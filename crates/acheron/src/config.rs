//! Config dispatch: one closed kind per parameter block, applicability
//! checked against codec kind, role, and app type.

use acheron_core::prelude::*;

use crate::context::MediaContext;

pub(crate) const MAX_ROI_REGIONS: usize = 8;
const DEFAULT_MAX_BITRATE_KBPS: u32 = 40_000;

/// Parameter kinds addressable through the generic config surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    RateControl,
    MaxBitRate,
    Slice,
    DeblockFilter,
    Sao,
    Entropy,
    Vui,
    VuiTiming,
    LongtermRef,
    IntraRefresh,
    Denoise3d,
    SmartBg,
    ModeDecision,
    Monochrome,
    PredUnit,
    Transform,
    Roi,
    RoiAvgQp,
    RoiEx,
    EncodeMode,
    ExplicitHeader,
    Mjpeg,
    Jpeg,
    CameraSource,
    InsertUserData,
    RequestIdr,
    RequestIdrHeader,
    EnableIdr,
    SkipPicture,
}

impl ConfigKind {
    pub fn name(self) -> &'static str {
        match self {
            ConfigKind::RateControl => "rate_control",
            ConfigKind::MaxBitRate => "max_bit_rate",
            ConfigKind::Slice => "slice",
            ConfigKind::DeblockFilter => "deblock_filter",
            ConfigKind::Sao => "sao",
            ConfigKind::Entropy => "entropy",
            ConfigKind::Vui => "vui",
            ConfigKind::VuiTiming => "vui_timing",
            ConfigKind::LongtermRef => "longterm_ref",
            ConfigKind::IntraRefresh => "intra_refresh",
            ConfigKind::Denoise3d => "denoise_3d",
            ConfigKind::SmartBg => "smart_bg",
            ConfigKind::ModeDecision => "mode_decision",
            ConfigKind::Monochrome => "monochrome",
            ConfigKind::PredUnit => "pred_unit",
            ConfigKind::Transform => "transform",
            ConfigKind::Roi => "roi",
            ConfigKind::RoiAvgQp => "roi_avg_qp",
            ConfigKind::RoiEx => "roi_ex",
            ConfigKind::EncodeMode => "encode_mode",
            ConfigKind::ExplicitHeader => "explicit_header",
            ConfigKind::Mjpeg => "mjpeg",
            ConfigKind::Jpeg => "jpeg",
            ConfigKind::CameraSource => "camera_source",
            ConfigKind::InsertUserData => "insert_user_data",
            ConfigKind::RequestIdr => "request_idr",
            ConfigKind::RequestIdrHeader => "request_idr_header",
            ConfigKind::EnableIdr => "enable_idr",
            ConfigKind::SkipPicture => "skip_picture",
        }
    }

    /// Whether this kind applies to the given codec identity at all.
    pub fn applies_to(self, identity: &CodecIdentity) -> bool {
        let encoder = identity.direction.is_encoder();
        match self {
            ConfigKind::Sao | ConfigKind::Denoise3d | ConfigKind::ModeDecision => {
                encoder && identity.codec == CodecId::H265
            }
            ConfigKind::Entropy => encoder && identity.codec == CodecId::H264,
            ConfigKind::Mjpeg => encoder && identity.codec == CodecId::Mjpeg,
            ConfigKind::Jpeg => encoder && identity.codec == CodecId::Jpeg,
            ConfigKind::RateControl | ConfigKind::Slice => {
                encoder && matches!(identity.app_type(), AppType::Video | AppType::Jpeg)
            }
            ConfigKind::EncodeMode => encoder,
            _ => encoder && identity.app_type() == AppType::Video,
        }
    }

    /// Kinds whose structural default can be read with no live task.
    pub fn defaultable(self) -> bool {
        !matches!(
            self,
            ConfigKind::CameraSource
                | ConfigKind::InsertUserData
                | ConfigKind::RequestIdr
                | ConfigKind::RequestIdrHeader
                | ConfigKind::EnableIdr
                | ConfigKind::SkipPicture
        )
    }
}

/// Tagged parameter payload, one variant per [`ConfigKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    RateControl(RateControlParams),
    MaxBitRate(u32),
    Slice(SliceParams),
    DeblockFilter(DeblockParams),
    Sao(SaoParams),
    Entropy(EntropyParams),
    Vui(VuiParams),
    VuiTiming(VuiTimingParams),
    LongtermRef(LongtermRefParams),
    IntraRefresh(IntraRefreshParams),
    Denoise3d(Denoise3dParams),
    SmartBg(SmartBgParams),
    ModeDecision(ModeDecisionParams),
    Monochrome(MonochromeParams),
    PredUnit(PredUnitParams),
    Transform(TransformParams),
    Roi(RoiParams),
    RoiAvgQp(u32),
    RoiEx(RoiParamsEx),
    EncodeMode(EncodeMode),
    ExplicitHeader(bool),
    Mjpeg(MjpegEncParams),
    Jpeg(JpegEncParams),
    CameraSource(CameraSource),
    InsertUserData(UserData),
    RequestIdr,
    RequestIdrHeader { force: bool },
    EnableIdr(bool),
    SkipPicture { source_index: i32 },
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::RateControl(_) => ConfigKind::RateControl,
            ConfigValue::MaxBitRate(_) => ConfigKind::MaxBitRate,
            ConfigValue::Slice(_) => ConfigKind::Slice,
            ConfigValue::DeblockFilter(_) => ConfigKind::DeblockFilter,
            ConfigValue::Sao(_) => ConfigKind::Sao,
            ConfigValue::Entropy(_) => ConfigKind::Entropy,
            ConfigValue::Vui(_) => ConfigKind::Vui,
            ConfigValue::VuiTiming(_) => ConfigKind::VuiTiming,
            ConfigValue::LongtermRef(_) => ConfigKind::LongtermRef,
            ConfigValue::IntraRefresh(_) => ConfigKind::IntraRefresh,
            ConfigValue::Denoise3d(_) => ConfigKind::Denoise3d,
            ConfigValue::SmartBg(_) => ConfigKind::SmartBg,
            ConfigValue::ModeDecision(_) => ConfigKind::ModeDecision,
            ConfigValue::Monochrome(_) => ConfigKind::Monochrome,
            ConfigValue::PredUnit(_) => ConfigKind::PredUnit,
            ConfigValue::Transform(_) => ConfigKind::Transform,
            ConfigValue::Roi(_) => ConfigKind::Roi,
            ConfigValue::RoiAvgQp(_) => ConfigKind::RoiAvgQp,
            ConfigValue::RoiEx(_) => ConfigKind::RoiEx,
            ConfigValue::EncodeMode(_) => ConfigKind::EncodeMode,
            ConfigValue::ExplicitHeader(_) => ConfigKind::ExplicitHeader,
            ConfigValue::Mjpeg(_) => ConfigKind::Mjpeg,
            ConfigValue::Jpeg(_) => ConfigKind::Jpeg,
            ConfigValue::CameraSource(_) => ConfigKind::CameraSource,
            ConfigValue::InsertUserData(_) => ConfigKind::InsertUserData,
            ConfigValue::RequestIdr => ConfigKind::RequestIdr,
            ConfigValue::RequestIdrHeader { .. } => ConfigKind::RequestIdrHeader,
            ConfigValue::EnableIdr(_) => ConfigKind::EnableIdr,
            ConfigValue::SkipPicture { .. } => ConfigKind::SkipPicture,
        }
    }
}

pub(crate) fn unsupported(kind: ConfigKind, identity: CodecIdentity) -> MediaError {
    MediaError::OperationNotAllowed(NotAllowed::UnsupportedConfig {
        kind: kind.name(),
        identity,
    })
}

/// Parameter snapshot applied to a live task.
#[derive(Debug, Clone)]
pub(crate) struct AppliedConfig {
    pub rate_control: RateControlParams,
    pub max_bit_rate: u32,
    pub slice: SliceParams,
    pub deblock: DeblockParams,
    pub sao: SaoParams,
    pub entropy: EntropyParams,
    pub vui: VuiParams,
    pub vui_timing: VuiTimingParams,
    pub longterm_ref: LongtermRefParams,
    pub intra_refresh: IntraRefreshParams,
    pub denoise_3d: Denoise3dParams,
    pub smart_bg: SmartBgParams,
    pub mode_decision: ModeDecisionParams,
    pub monochrome: MonochromeParams,
    pub pred_unit: PredUnitParams,
    pub transform: TransformParams,
    pub roi: RoiParams,
    pub roi_avg_qp: u32,
    pub roi_ex: Vec<RoiParamsEx>,
    pub encode_mode: EncodeMode,
    pub explicit_header: bool,
    pub mjpeg: MjpegEncParams,
    pub jpeg: JpegEncParams,
    pub camera: Option<CameraSource>,
    pub idr_enabled: bool,
    pub idr_requests: u32,
    pub idr_header_requests: u32,
    pub skip_requests: u32,
}

impl AppliedConfig {
    pub fn for_context(ctx: &MediaContext) -> Self {
        let rate_control = ctx
            .video_enc_params()
            .map(|p| p.rc.clone())
            .unwrap_or_else(|| RateControlParams::default_for(ctx.codec_id));
        let frame_rate = rate_control.frame_rate.max(1);
        Self {
            rate_control,
            max_bit_rate: DEFAULT_MAX_BITRATE_KBPS,
            slice: SliceParams::default(),
            deblock: DeblockParams::default(),
            sao: SaoParams::default(),
            entropy: EntropyParams::default(),
            vui: VuiParams::default(),
            vui_timing: VuiTimingParams::for_frame_rate(frame_rate),
            longterm_ref: LongtermRefParams::default(),
            intra_refresh: IntraRefreshParams::default(),
            denoise_3d: Denoise3dParams::default(),
            smart_bg: SmartBgParams::default(),
            mode_decision: ModeDecisionParams::default(),
            monochrome: MonochromeParams::default(),
            pred_unit: PredUnitParams::default(),
            transform: TransformParams::default(),
            roi: RoiParams::default(),
            roi_avg_qp: 32,
            roi_ex: (0..MAX_ROI_REGIONS)
                .map(|i| RoiParamsEx {
                    roi_index: i as u32,
                    ..RoiParamsEx::default()
                })
                .collect(),
            encode_mode: EncodeMode::default(),
            explicit_header: false,
            mjpeg: MjpegEncParams::default(),
            jpeg: JpegEncParams::default(),
            camera: None,
            idr_enabled: true,
            idr_requests: 0,
            idr_header_requests: 0,
            skip_requests: 0,
        }
    }
}

/// Structural default for a kind when no task is live. Only defaultable,
/// applicable kinds succeed; VUI defaults additionally need a nonzero
/// configured frame rate to derive timing.
pub(crate) fn default_value(
    kind: ConfigKind,
    ctx: &MediaContext,
    arg: Option<u32>,
) -> Result<ConfigValue, MediaError> {
    let identity = ctx.identity();
    if !kind.defaultable() || !kind.applies_to(&identity) {
        return Err(unsupported(kind, identity));
    }
    let value = match kind {
        ConfigKind::RateControl => {
            ConfigValue::RateControl(RateControlParams::default_for(ctx.codec_id))
        }
        ConfigKind::MaxBitRate => ConfigValue::MaxBitRate(DEFAULT_MAX_BITRATE_KBPS),
        ConfigKind::Slice => ConfigValue::Slice(SliceParams::default()),
        ConfigKind::DeblockFilter => ConfigValue::DeblockFilter(DeblockParams::default()),
        ConfigKind::Sao => ConfigValue::Sao(SaoParams::default()),
        ConfigKind::Entropy => ConfigValue::Entropy(EntropyParams::default()),
        ConfigKind::Vui | ConfigKind::VuiTiming => {
            let frame_rate = ctx.params.frame_rate().unwrap_or(0);
            if frame_rate == 0 {
                return Err(unsupported(kind, identity));
            }
            if kind == ConfigKind::Vui {
                ConfigValue::Vui(VuiParams::default())
            } else {
                ConfigValue::VuiTiming(VuiTimingParams::for_frame_rate(frame_rate))
            }
        }
        ConfigKind::LongtermRef => ConfigValue::LongtermRef(LongtermRefParams::default()),
        ConfigKind::IntraRefresh => ConfigValue::IntraRefresh(IntraRefreshParams::default()),
        ConfigKind::Denoise3d => ConfigValue::Denoise3d(Denoise3dParams::default()),
        ConfigKind::SmartBg => ConfigValue::SmartBg(SmartBgParams::default()),
        ConfigKind::ModeDecision => ConfigValue::ModeDecision(ModeDecisionParams::default()),
        ConfigKind::Monochrome => ConfigValue::Monochrome(MonochromeParams::default()),
        ConfigKind::PredUnit => ConfigValue::PredUnit(PredUnitParams::default()),
        ConfigKind::Transform => ConfigValue::Transform(TransformParams::default()),
        ConfigKind::Roi => ConfigValue::Roi(RoiParams::default()),
        ConfigKind::RoiAvgQp => ConfigValue::RoiAvgQp(32),
        ConfigKind::RoiEx => ConfigValue::RoiEx(RoiParamsEx {
            roi_index: arg.unwrap_or(0),
            ..RoiParamsEx::default()
        }),
        ConfigKind::EncodeMode => ConfigValue::EncodeMode(EncodeMode::default()),
        ConfigKind::ExplicitHeader => ConfigValue::ExplicitHeader(false),
        ConfigKind::Mjpeg => ConfigValue::Mjpeg(MjpegEncParams::default()),
        ConfigKind::Jpeg => ConfigValue::Jpeg(JpegEncParams::default()),
        ConfigKind::CameraSource
        | ConfigKind::InsertUserData
        | ConfigKind::RequestIdr
        | ConfigKind::RequestIdrHeader
        | ConfigKind::EnableIdr
        | ConfigKind::SkipPicture => unreachable!("filtered by defaultable()"),
    };
    Ok(value)
}

/// Read a kind from a live task's applied snapshot.
pub(crate) fn get_applied(
    cfg: &AppliedConfig,
    kind: ConfigKind,
    identity: &CodecIdentity,
    arg: Option<u32>,
) -> Result<ConfigValue, MediaError> {
    if !kind.applies_to(identity) {
        return Err(unsupported(kind, *identity));
    }
    let value = match kind {
        ConfigKind::RateControl => ConfigValue::RateControl(cfg.rate_control.clone()),
        ConfigKind::MaxBitRate => ConfigValue::MaxBitRate(cfg.max_bit_rate),
        ConfigKind::Slice => ConfigValue::Slice(cfg.slice.clone()),
        ConfigKind::DeblockFilter => ConfigValue::DeblockFilter(cfg.deblock.clone()),
        ConfigKind::Sao => ConfigValue::Sao(cfg.sao.clone()),
        ConfigKind::Entropy => ConfigValue::Entropy(cfg.entropy.clone()),
        ConfigKind::Vui => ConfigValue::Vui(cfg.vui.clone()),
        ConfigKind::VuiTiming => ConfigValue::VuiTiming(cfg.vui_timing.clone()),
        ConfigKind::LongtermRef => ConfigValue::LongtermRef(cfg.longterm_ref.clone()),
        ConfigKind::IntraRefresh => ConfigValue::IntraRefresh(cfg.intra_refresh.clone()),
        ConfigKind::Denoise3d => ConfigValue::Denoise3d(cfg.denoise_3d.clone()),
        ConfigKind::SmartBg => ConfigValue::SmartBg(cfg.smart_bg.clone()),
        ConfigKind::ModeDecision => ConfigValue::ModeDecision(cfg.mode_decision.clone()),
        ConfigKind::Monochrome => ConfigValue::Monochrome(cfg.monochrome.clone()),
        ConfigKind::PredUnit => ConfigValue::PredUnit(cfg.pred_unit.clone()),
        ConfigKind::Transform => ConfigValue::Transform(cfg.transform.clone()),
        ConfigKind::Roi => ConfigValue::Roi(cfg.roi.clone()),
        ConfigKind::RoiAvgQp => ConfigValue::RoiAvgQp(cfg.roi_avg_qp),
        ConfigKind::RoiEx => {
            let index = arg.unwrap_or(0) as usize;
            let entry = cfg
                .roi_ex
                .get(index)
                .ok_or(MediaError::InvalidParams("roi index out of range"))?;
            ConfigValue::RoiEx(*entry)
        }
        ConfigKind::EncodeMode => ConfigValue::EncodeMode(cfg.encode_mode),
        ConfigKind::ExplicitHeader => ConfigValue::ExplicitHeader(cfg.explicit_header),
        ConfigKind::Mjpeg => ConfigValue::Mjpeg(cfg.mjpeg.clone()),
        ConfigKind::Jpeg => ConfigValue::Jpeg(cfg.jpeg.clone()),
        ConfigKind::CameraSource
        | ConfigKind::InsertUserData
        | ConfigKind::RequestIdr
        | ConfigKind::RequestIdrHeader
        | ConfigKind::EnableIdr
        | ConfigKind::SkipPicture => return Err(unsupported(kind, *identity)),
    };
    Ok(value)
}

/// Validate and apply a value to a live task's snapshot.
///
/// Validation failures leave the snapshot unchanged. `InsertUserData` is
/// intercepted by the task before reaching this table (it feeds a queue, not
/// the snapshot).
pub(crate) fn apply(
    cfg: &mut AppliedConfig,
    identity: &CodecIdentity,
    value: ConfigValue,
) -> Result<(), MediaError> {
    let kind = value.kind();
    if !kind.applies_to(identity) {
        return Err(unsupported(kind, *identity));
    }
    match value {
        ConfigValue::RateControl(p) => {
            validate_rate_control(&p, identity.codec)?;
            cfg.rate_control = p;
        }
        ConfigValue::MaxBitRate(v) => {
            if v == 0 {
                return Err(MediaError::InvalidParams("max bitrate must be nonzero"));
            }
            cfg.max_bit_rate = v;
        }
        ConfigValue::Slice(p) => {
            if p.mode != SliceMode::Single && p.size == 0 {
                return Err(MediaError::InvalidParams("slice size must be nonzero"));
            }
            cfg.slice = p;
        }
        ConfigValue::DeblockFilter(p) => {
            if !(-6..=6).contains(&p.alpha_offset) || !(-6..=6).contains(&p.beta_offset) {
                return Err(MediaError::InvalidParams(
                    "deblock offsets must be in [-6, 6]",
                ));
            }
            cfg.deblock = p;
        }
        ConfigValue::Sao(p) => cfg.sao = p,
        ConfigValue::Entropy(p) => cfg.entropy = p,
        ConfigValue::Vui(p) => cfg.vui = p,
        ConfigValue::VuiTiming(p) => {
            if p.num_units_in_tick == 0 || p.time_scale == 0 {
                return Err(MediaError::InvalidParams(
                    "vui timing fields must be nonzero",
                ));
            }
            cfg.vui_timing = p;
        }
        ConfigValue::LongtermRef(p) => cfg.longterm_ref = p,
        ConfigValue::IntraRefresh(p) => {
            if p.mode != IntraRefreshMode::None && p.arg == 0 {
                return Err(MediaError::InvalidParams(
                    "intra refresh argument must be nonzero",
                ));
            }
            cfg.intra_refresh = p;
        }
        ConfigValue::Denoise3d(p) => cfg.denoise_3d = p,
        ConfigValue::SmartBg(p) => cfg.smart_bg = p,
        ConfigValue::ModeDecision(p) => cfg.mode_decision = p,
        ConfigValue::Monochrome(p) => cfg.monochrome = p,
        ConfigValue::PredUnit(p) => cfg.pred_unit = p,
        ConfigValue::Transform(p) => {
            if !(-12..=12).contains(&p.chroma_cb_qp_offset)
                || !(-12..=12).contains(&p.chroma_cr_qp_offset)
            {
                return Err(MediaError::InvalidParams(
                    "chroma qp offsets must be in [-12, 12]",
                ));
            }
            cfg.transform = p;
        }
        ConfigValue::Roi(p) => {
            if p.regions.len() > MAX_ROI_REGIONS {
                return Err(MediaError::InvalidParams("too many roi regions"));
            }
            if p.regions.iter().any(|r| r.qp > 51) {
                return Err(MediaError::InvalidParams("roi qp must be at most 51"));
            }
            cfg.roi = p;
        }
        ConfigValue::RoiAvgQp(v) => {
            if v > 51 {
                return Err(MediaError::InvalidParams("roi average qp must be at most 51"));
            }
            cfg.roi_avg_qp = v;
        }
        ConfigValue::RoiEx(p) => {
            let index = p.roi_index as usize;
            if index >= cfg.roi_ex.len() {
                return Err(MediaError::InvalidParams("roi index out of range"));
            }
            if p.region.qp > 51 {
                return Err(MediaError::InvalidParams("roi qp must be at most 51"));
            }
            cfg.roi_ex[index] = p;
        }
        ConfigValue::EncodeMode(v) => cfg.encode_mode = v,
        ConfigValue::ExplicitHeader(v) => cfg.explicit_header = v,
        ConfigValue::Mjpeg(p) => {
            validate_quality_factor(p.quality_factor)?;
            cfg.mjpeg = p;
        }
        ConfigValue::Jpeg(p) => {
            validate_quality_factor(p.quality_factor)?;
            cfg.jpeg = p;
        }
        ConfigValue::CameraSource(src) => {
            if src.pipeline < 0 || src.channel < 0 {
                return Err(MediaError::InvalidParams(
                    "camera pipeline and channel must be non-negative",
                ));
            }
            cfg.camera = Some(src);
        }
        ConfigValue::InsertUserData(_) => return Err(MediaError::Unknown),
        ConfigValue::RequestIdr => cfg.idr_requests += 1,
        ConfigValue::RequestIdrHeader { .. } => cfg.idr_header_requests += 1,
        ConfigValue::EnableIdr(v) => cfg.idr_enabled = v,
        ConfigValue::SkipPicture { source_index } => {
            if source_index < 0 {
                return Err(MediaError::InvalidParams(
                    "skip source index must be non-negative",
                ));
            }
            cfg.skip_requests += 1;
        }
    }
    Ok(())
}

pub(crate) fn validate_rate_control(
    params: &RateControlParams,
    codec: CodecId,
) -> Result<(), MediaError> {
    if params.mode.codec() != codec {
        return Err(MediaError::InvalidParams(
            "rate-control mode does not match the codec kind",
        ));
    }
    if params.bit_rate == 0 || params.bit_rate > 700_000 {
        return Err(MediaError::InvalidParams("bitrate out of range"));
    }
    if params.frame_rate == 0 || params.frame_rate > 240 {
        return Err(MediaError::InvalidParams("frame rate out of range"));
    }
    if params.intra_period > 2048 {
        return Err(MediaError::InvalidParams("intra period out of range"));
    }
    if params.min_qp > params.max_qp || params.max_qp > 51 || params.initial_qp > 51 {
        return Err(MediaError::InvalidParams("qp bounds out of range"));
    }
    Ok(())
}

fn validate_quality_factor(quality: u32) -> Result<(), MediaError> {
    if !(1..=99).contains(&quality) {
        return Err(MediaError::InvalidParams(
            "quality factor must be in [1, 99]",
        ));
    }
    Ok(())
}

/// Validate the full configure-time parameter set for a context.
pub(crate) fn validate_configure(ctx: &MediaContext) -> Result<(), MediaError> {
    match &ctx.params {
        CodecParams::VideoEncoder(p) => {
            if ctx.direction != Direction::Encoder
                || !matches!(ctx.codec_id.app_type(), AppType::Video | AppType::Jpeg)
            {
                return Err(MediaError::InvalidParams(
                    "parameter block does not match the context identity",
                ));
            }
            validate_dimensions(p.width, p.height)?;
            validate_buf_count(p.frame_buf_count)?;
            validate_buf_count(p.bitstream_buf_count)?;
            validate_rate_control(&p.rc, ctx.codec_id)?;
            if p.gop.decoding_refresh_type > 2 || p.gop.gop_preset > 9 {
                return Err(MediaError::InvalidParams("gop parameters out of range"));
            }
            Ok(())
        }
        CodecParams::VideoDecoder(p) => {
            if ctx.direction != Direction::Decoder
                || !matches!(ctx.codec_id.app_type(), AppType::Video | AppType::Jpeg)
            {
                return Err(MediaError::InvalidParams(
                    "parameter block does not match the context identity",
                ));
            }
            validate_dimensions(p.width, p.height)?;
            validate_buf_count(p.frame_buf_count)?;
            validate_buf_count(p.bitstream_buf_count)?;
            Ok(())
        }
        CodecParams::AudioEncoder(_) | CodecParams::AudioDecoder(_) => Err(
            MediaError::InvalidParams("audio parameters are not accepted by the video task path"),
        ),
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), MediaError> {
    if !(32..=8192).contains(&width) || !(32..=8192).contains(&height) {
        return Err(MediaError::InvalidParams("resolution out of range"));
    }
    if width % 2 != 0 || height % 2 != 0 {
        return Err(MediaError::InvalidParams("resolution must be even"));
    }
    Ok(())
}

fn validate_buf_count(count: u32) -> Result<(), MediaError> {
    if !(1..=32).contains(&count) {
        return Err(MediaError::InvalidParams("buffer count out of range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::default_context;

    fn identity(codec: CodecId, direction: Direction) -> CodecIdentity {
        CodecIdentity::new(codec, direction)
    }

    #[test]
    fn applicability_follows_codec_and_role() {
        let h265_enc = identity(CodecId::H265, Direction::Encoder);
        let h264_enc = identity(CodecId::H264, Direction::Encoder);
        let h265_dec = identity(CodecId::H265, Direction::Decoder);
        let jpeg_enc = identity(CodecId::Jpeg, Direction::Encoder);

        assert!(ConfigKind::Sao.applies_to(&h265_enc));
        assert!(!ConfigKind::Sao.applies_to(&h264_enc));
        assert!(!ConfigKind::Sao.applies_to(&h265_dec));

        assert!(ConfigKind::Entropy.applies_to(&h264_enc));
        assert!(!ConfigKind::Entropy.applies_to(&h265_enc));

        assert!(ConfigKind::RateControl.applies_to(&jpeg_enc));
        assert!(!ConfigKind::Roi.applies_to(&jpeg_enc));

        assert!(ConfigKind::Jpeg.applies_to(&jpeg_enc));
        assert!(!ConfigKind::Jpeg.applies_to(&h265_enc));
    }

    #[test]
    fn unsupported_kind_keeps_a_distinct_code() {
        let err = unsupported(
            ConfigKind::Sao,
            identity(CodecId::H264, Direction::Encoder),
        );
        assert_eq!(err.code(), "unsupported_config");
        assert_ne!(err.code(), MediaError::InvalidParams("x").code());
        assert_ne!(err.code(), MediaError::InvalidInstance(0).code());
    }

    #[test]
    fn set_of_get_is_a_no_op() {
        let ctx = default_context(CodecId::H265, Direction::Encoder);
        let id = ctx.identity();
        let mut cfg = AppliedConfig::for_context(&ctx);
        let before = cfg.clone();

        for kind in [
            ConfigKind::RateControl,
            ConfigKind::Sao,
            ConfigKind::Slice,
            ConfigKind::Transform,
            ConfigKind::Roi,
        ] {
            let value = get_applied(&cfg, kind, &id, None).expect("get");
            apply(&mut cfg, &id, value).expect("set");
        }
        assert_eq!(cfg.rate_control, before.rate_control);
        assert_eq!(cfg.sao, before.sao);
        assert_eq!(cfg.slice, before.slice);
        assert_eq!(cfg.transform, before.transform);
        assert_eq!(cfg.roi, before.roi);
    }

    #[test]
    fn get_after_set_returns_the_written_value() {
        let ctx = default_context(CodecId::H265, Direction::Encoder);
        let id = ctx.identity();
        let mut cfg = AppliedConfig::for_context(&ctx);
        let written = SaoParams {
            luma_enable: false,
            chroma_enable: true,
        };
        apply(&mut cfg, &id, ConfigValue::Sao(written.clone())).expect("set");
        assert_eq!(
            get_applied(&cfg, ConfigKind::Sao, &id, None).expect("get"),
            ConfigValue::Sao(written)
        );
    }

    #[test]
    fn rate_control_mode_must_match_codec() {
        let ctx = default_context(CodecId::H265, Direction::Encoder);
        let id = ctx.identity();
        let mut cfg = AppliedConfig::for_context(&ctx);
        let before = cfg.rate_control.clone();
        let mut wrong = RateControlParams::default_for(CodecId::H264);
        wrong.mode = RcMode::H264Cbr;
        let err = apply(&mut cfg, &id, ConfigValue::RateControl(wrong)).unwrap_err();
        assert_eq!(err.code(), "invalid_params");
        assert_eq!(cfg.rate_control, before, "failed set must not mutate");
    }

    #[test]
    fn defaults_without_task_respect_applicability() {
        let enc = default_context(CodecId::H265, Direction::Encoder);
        assert!(matches!(
            default_value(ConfigKind::Sao, &enc, None),
            Ok(ConfigValue::Sao(_))
        ));

        let dec = default_context(CodecId::H265, Direction::Decoder);
        let err = default_value(ConfigKind::Sao, &dec, None).unwrap_err();
        assert_eq!(err.code(), "unsupported_config");

        // Action kinds have no structural default.
        let err = default_value(ConfigKind::RequestIdr, &enc, None).unwrap_err();
        assert_eq!(err.code(), "unsupported_config");
    }

    #[test]
    fn vui_defaults_require_a_frame_rate() {
        let mut ctx = default_context(CodecId::H264, Direction::Encoder);
        assert!(default_value(ConfigKind::VuiTiming, &ctx, None).is_ok());
        ctx.video_enc_params_mut().expect("enc params").rc.frame_rate = 0;
        assert!(default_value(ConfigKind::VuiTiming, &ctx, None).is_err());
    }

    #[test]
    fn configure_rejects_bad_resolution() {
        let mut ctx = default_context(CodecId::H265, Direction::Encoder);
        assert!(validate_configure(&ctx).is_ok());
        ctx.video_enc_params_mut().expect("enc params").width = 31;
        assert_eq!(
            validate_configure(&ctx).unwrap_err().code(),
            "invalid_params"
        );
    }
}
