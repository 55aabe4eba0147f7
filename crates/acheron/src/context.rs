use acheron_core::prelude::*;

/// Caller-held context addressing one codec session.
///
/// The identity (`codec_id` + `direction`) is fixed at creation;
/// `instance_index` is assigned by `initialize` and addresses the live task
/// on every subsequent call.
///
/// # Example
/// ```rust
/// use acheron::prelude::*;
///
/// let ctx = MediaService::default_context(CodecId::H264, Direction::Decoder);
/// assert_eq!(ctx.identity().codec, CodecId::H264);
/// assert!(ctx.instance_index.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MediaContext {
    pub codec_id: CodecId,
    pub direction: Direction,
    /// Assigned by `initialize`; `None` addresses no live task.
    pub instance_index: Option<u32>,
    /// Configure-time parameter block matching the identity.
    pub params: CodecParams,
}

impl MediaContext {
    pub fn identity(&self) -> CodecIdentity {
        CodecIdentity::new(self.codec_id, self.direction)
    }

    pub fn video_enc_params(&self) -> Option<&VideoEncParams> {
        self.params.as_video_enc()
    }

    pub fn video_enc_params_mut(&mut self) -> Option<&mut VideoEncParams> {
        self.params.as_video_enc_mut()
    }

    pub fn video_dec_params(&self) -> Option<&VideoDecParams> {
        self.params.as_video_dec()
    }
}

/// Build a context pre-filled with the default parameter block for the codec
/// kind and role.
pub(crate) fn default_context(codec_id: CodecId, direction: Direction) -> MediaContext {
    let params = match (codec_id.app_type(), direction) {
        (AppType::Video | AppType::Jpeg, Direction::Encoder) => {
            CodecParams::VideoEncoder(VideoEncParams::default_for(codec_id))
        }
        (AppType::Video | AppType::Jpeg, Direction::Decoder) => {
            CodecParams::VideoDecoder(VideoDecParams::default_for(codec_id))
        }
        (AppType::Audio, Direction::Encoder) => {
            CodecParams::AudioEncoder(AudioEncParams::default_for(codec_id))
        }
        (AppType::Audio, Direction::Decoder) => {
            CodecParams::AudioDecoder(AudioDecParams::default_for(codec_id))
        }
    };
    MediaContext {
        codec_id,
        direction,
        instance_index: None,
        params,
    }
}

/// Startup parameters passed to `start`.
#[derive(Debug, Clone, Default)]
pub struct StartupParams {
    /// Stop producing output after this many frames; 0 means unbounded.
    pub receive_frame_count: u32,
}
