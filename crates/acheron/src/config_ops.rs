//! Typed per-kind config entry points layered over the generic dispatch.
//!
//! Getters succeed without a live task whenever the kind has a structural
//! default for the context's identity; setters always require a live,
//! compatible task.

use acheron_core::prelude::*;

use crate::config::{ConfigKind, ConfigValue};
use crate::context::MediaContext;
use crate::service::MediaService;

impl MediaService {
    pub fn rate_control_config(
        &self,
        ctx: &MediaContext,
    ) -> Result<RateControlParams, MediaError> {
        match self.get_config(ctx, ConfigKind::RateControl)? {
            ConfigValue::RateControl(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_rate_control_config(
        &self,
        ctx: &MediaContext,
        params: RateControlParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::RateControl(params))
    }

    pub fn max_bit_rate_config(&self, ctx: &MediaContext) -> Result<u32, MediaError> {
        match self.get_config(ctx, ConfigKind::MaxBitRate)? {
            ConfigValue::MaxBitRate(v) => Ok(v),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_max_bit_rate_config(
        &self,
        ctx: &MediaContext,
        kbps: u32,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::MaxBitRate(kbps))
    }

    pub fn slice_config(&self, ctx: &MediaContext) -> Result<SliceParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Slice)? {
            ConfigValue::Slice(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_slice_config(
        &self,
        ctx: &MediaContext,
        params: SliceParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Slice(params))
    }

    pub fn deblock_filter_config(&self, ctx: &MediaContext) -> Result<DeblockParams, MediaError> {
        match self.get_config(ctx, ConfigKind::DeblockFilter)? {
            ConfigValue::DeblockFilter(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_deblock_filter_config(
        &self,
        ctx: &MediaContext,
        params: DeblockParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::DeblockFilter(params))
    }

    pub fn sao_config(&self, ctx: &MediaContext) -> Result<SaoParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Sao)? {
            ConfigValue::Sao(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_sao_config(&self, ctx: &MediaContext, params: SaoParams) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Sao(params))
    }

    pub fn entropy_config(&self, ctx: &MediaContext) -> Result<EntropyParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Entropy)? {
            ConfigValue::Entropy(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_entropy_config(
        &self,
        ctx: &MediaContext,
        params: EntropyParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Entropy(params))
    }

    pub fn vui_config(&self, ctx: &MediaContext) -> Result<VuiParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Vui)? {
            ConfigValue::Vui(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_vui_config(&self, ctx: &MediaContext, params: VuiParams) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Vui(params))
    }

    pub fn vui_timing_config(&self, ctx: &MediaContext) -> Result<VuiTimingParams, MediaError> {
        match self.get_config(ctx, ConfigKind::VuiTiming)? {
            ConfigValue::VuiTiming(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_vui_timing_config(
        &self,
        ctx: &MediaContext,
        params: VuiTimingParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::VuiTiming(params))
    }

    pub fn longterm_ref_config(&self, ctx: &MediaContext) -> Result<LongtermRefParams, MediaError> {
        match self.get_config(ctx, ConfigKind::LongtermRef)? {
            ConfigValue::LongtermRef(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_longterm_ref_config(
        &self,
        ctx: &MediaContext,
        params: LongtermRefParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::LongtermRef(params))
    }

    pub fn intra_refresh_config(
        &self,
        ctx: &MediaContext,
    ) -> Result<IntraRefreshParams, MediaError> {
        match self.get_config(ctx, ConfigKind::IntraRefresh)? {
            ConfigValue::IntraRefresh(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_intra_refresh_config(
        &self,
        ctx: &MediaContext,
        params: IntraRefreshParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::IntraRefresh(params))
    }

    pub fn denoise_3d_config(&self, ctx: &MediaContext) -> Result<Denoise3dParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Denoise3d)? {
            ConfigValue::Denoise3d(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_denoise_3d_config(
        &self,
        ctx: &MediaContext,
        params: Denoise3dParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Denoise3d(params))
    }

    pub fn smart_bg_config(&self, ctx: &MediaContext) -> Result<SmartBgParams, MediaError> {
        match self.get_config(ctx, ConfigKind::SmartBg)? {
            ConfigValue::SmartBg(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_smart_bg_config(
        &self,
        ctx: &MediaContext,
        params: SmartBgParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::SmartBg(params))
    }

    pub fn mode_decision_config(
        &self,
        ctx: &MediaContext,
    ) -> Result<ModeDecisionParams, MediaError> {
        match self.get_config(ctx, ConfigKind::ModeDecision)? {
            ConfigValue::ModeDecision(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_mode_decision_config(
        &self,
        ctx: &MediaContext,
        params: ModeDecisionParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::ModeDecision(params))
    }

    pub fn monochrome_config(&self, ctx: &MediaContext) -> Result<MonochromeParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Monochrome)? {
            ConfigValue::Monochrome(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_monochrome_config(
        &self,
        ctx: &MediaContext,
        params: MonochromeParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Monochrome(params))
    }

    pub fn pred_unit_config(&self, ctx: &MediaContext) -> Result<PredUnitParams, MediaError> {
        match self.get_config(ctx, ConfigKind::PredUnit)? {
            ConfigValue::PredUnit(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_pred_unit_config(
        &self,
        ctx: &MediaContext,
        params: PredUnitParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::PredUnit(params))
    }

    pub fn transform_config(&self, ctx: &MediaContext) -> Result<TransformParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Transform)? {
            ConfigValue::Transform(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_transform_config(
        &self,
        ctx: &MediaContext,
        params: TransformParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Transform(params))
    }

    pub fn roi_config(&self, ctx: &MediaContext) -> Result<RoiParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Roi)? {
            ConfigValue::Roi(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_roi_config(&self, ctx: &MediaContext, params: RoiParams) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Roi(params))
    }

    pub fn roi_avg_qp_config(&self, ctx: &MediaContext) -> Result<u32, MediaError> {
        match self.get_config(ctx, ConfigKind::RoiAvgQp)? {
            ConfigValue::RoiAvgQp(v) => Ok(v),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_roi_avg_qp_config(&self, ctx: &MediaContext, qp: u32) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::RoiAvgQp(qp))
    }

    pub fn roi_ex_config(
        &self,
        ctx: &MediaContext,
        roi_index: u32,
    ) -> Result<RoiParamsEx, MediaError> {
        match self.get_config_indexed(ctx, ConfigKind::RoiEx, Some(roi_index))? {
            ConfigValue::RoiEx(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_roi_ex_config(
        &self,
        ctx: &MediaContext,
        params: RoiParamsEx,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::RoiEx(params))
    }

    pub fn encode_mode_config(&self, ctx: &MediaContext) -> Result<EncodeMode, MediaError> {
        match self.get_config(ctx, ConfigKind::EncodeMode)? {
            ConfigValue::EncodeMode(v) => Ok(v),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_encode_mode_config(
        &self,
        ctx: &MediaContext,
        mode: EncodeMode,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::EncodeMode(mode))
    }

    pub fn explicit_header_config(&self, ctx: &MediaContext) -> Result<bool, MediaError> {
        match self.get_config(ctx, ConfigKind::ExplicitHeader)? {
            ConfigValue::ExplicitHeader(v) => Ok(v),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_explicit_header_config(
        &self,
        ctx: &MediaContext,
        enabled: bool,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::ExplicitHeader(enabled))
    }

    pub fn mjpeg_config(&self, ctx: &MediaContext) -> Result<MjpegEncParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Mjpeg)? {
            ConfigValue::Mjpeg(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_mjpeg_config(
        &self,
        ctx: &MediaContext,
        params: MjpegEncParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Mjpeg(params))
    }

    pub fn jpeg_config(&self, ctx: &MediaContext) -> Result<JpegEncParams, MediaError> {
        match self.get_config(ctx, ConfigKind::Jpeg)? {
            ConfigValue::Jpeg(p) => Ok(p),
            _ => Err(MediaError::Unknown),
        }
    }

    pub fn set_jpeg_config(
        &self,
        ctx: &MediaContext,
        params: JpegEncParams,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::Jpeg(params))
    }

    /// Stage a user-data blob for insertion into the encoded stream.
    pub fn insert_user_data(&self, ctx: &MediaContext, data: Vec<u8>) -> Result<(), MediaError> {
        if data.is_empty() {
            return Err(MediaError::InvalidParams("user data must not be empty"));
        }
        self.set_config(ctx, ConfigValue::InsertUserData(UserData::new(data)))
    }

    /// Ask the encoder to emit an IDR frame at the next opportunity.
    pub fn request_idr_frame(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::RequestIdr)
    }

    /// Ask the encoder to re-emit the stream headers with the next IDR.
    pub fn request_idr_header(&self, ctx: &MediaContext, force: bool) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::RequestIdrHeader { force })
    }

    /// Enable or disable periodic IDR frames.
    pub fn enable_idr_frame(&self, ctx: &MediaContext, enable: bool) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::EnableIdr(enable))
    }

    /// Skip encoding of the given source picture.
    pub fn skip_picture(&self, ctx: &MediaContext, source_index: i32) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::SkipPicture { source_index })
    }

    /// Bind the encoder to a camera capture pipeline/channel.
    pub fn bind_camera_source(
        &self,
        ctx: &MediaContext,
        pipeline: i32,
        channel: i32,
    ) -> Result<(), MediaError> {
        self.set_config(ctx, ConfigValue::CameraSource(CameraSource { pipeline, channel }))
    }
}
