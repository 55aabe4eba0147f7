//! Audio codec registration entry points.
//!
//! Audio codecs do not go through the video task registry; they register
//! with a separate subsystem. Without the `audio` feature every entry point
//! reports `CodecNotFound`.

use acheron_core::prelude::MediaError;

use crate::service::MediaService;

/// Registration descriptor for an external audio encoder.
#[derive(Debug, Clone)]
pub struct AudioEncoderDesc {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u32,
    /// Target bitrate in kbit/s.
    pub bit_rate: u32,
}

/// Registration descriptor for an external audio decoder.
#[derive(Debug, Clone)]
pub struct AudioDecoderDesc {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u32,
}

/// Handle returned by a successful audio registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle(pub i32);

#[cfg(feature = "audio")]
mod table {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::{AudioDecoderDesc, AudioEncoderDesc, AudioHandle};

    // Descriptors are retained as the registration record; nothing reads
    // them back yet.
    #[allow(dead_code)]
    enum AudioEntry {
        Encoder(AudioEncoderDesc),
        Decoder(AudioDecoderDesc),
    }

    pub(crate) struct AudioRegistry {
        inner: Mutex<AudioInner>,
    }

    struct AudioInner {
        entries: HashMap<i32, AudioEntry>,
        next_handle: i32,
    }

    impl AudioRegistry {
        pub fn new() -> Self {
            Self {
                inner: Mutex::new(AudioInner {
                    entries: HashMap::new(),
                    next_handle: 1,
                }),
            }
        }

        pub fn register_encoder(&self, desc: AudioEncoderDesc) -> AudioHandle {
            let mut inner = self.inner.lock();
            let handle = inner.next_handle;
            inner.next_handle += 1;
            inner.entries.insert(handle, AudioEntry::Encoder(desc));
            AudioHandle(handle)
        }

        pub fn register_decoder(&self, desc: AudioDecoderDesc) -> AudioHandle {
            let mut inner = self.inner.lock();
            let handle = inner.next_handle;
            inner.next_handle += 1;
            inner.entries.insert(handle, AudioEntry::Decoder(desc));
            AudioHandle(handle)
        }

        pub fn unregister_encoder(&self, handle: AudioHandle) -> bool {
            let mut inner = self.inner.lock();
            matches!(
                inner.entries.get(&handle.0),
                Some(AudioEntry::Encoder(_))
            ) && inner.entries.remove(&handle.0).is_some()
        }

        pub fn unregister_decoder(&self, handle: AudioHandle) -> bool {
            let mut inner = self.inner.lock();
            matches!(
                inner.entries.get(&handle.0),
                Some(AudioEntry::Decoder(_))
            ) && inner.entries.remove(&handle.0).is_some()
        }
    }
}

#[cfg(feature = "audio")]
pub(crate) use table::AudioRegistry;

impl MediaService {
    /// Register an external audio encoder with the audio subsystem.
    pub fn register_audio_encoder(
        &self,
        desc: AudioEncoderDesc,
    ) -> Result<AudioHandle, MediaError> {
        #[cfg(feature = "audio")]
        {
            Ok(self.audio_registry().register_encoder(desc))
        }
        #[cfg(not(feature = "audio"))]
        {
            let _ = desc;
            Err(MediaError::CodecNotFound)
        }
    }

    /// Register an external audio decoder with the audio subsystem.
    pub fn register_audio_decoder(
        &self,
        desc: AudioDecoderDesc,
    ) -> Result<AudioHandle, MediaError> {
        #[cfg(feature = "audio")]
        {
            Ok(self.audio_registry().register_decoder(desc))
        }
        #[cfg(not(feature = "audio"))]
        {
            let _ = desc;
            Err(MediaError::CodecNotFound)
        }
    }

    /// Unregister a previously registered audio encoder.
    pub fn unregister_audio_encoder(&self, handle: AudioHandle) -> Result<(), MediaError> {
        #[cfg(feature = "audio")]
        {
            if self.audio_registry().unregister_encoder(handle) {
                Ok(())
            } else {
                Err(MediaError::CodecNotFound)
            }
        }
        #[cfg(not(feature = "audio"))]
        {
            let _ = handle;
            Err(MediaError::CodecNotFound)
        }
    }

    /// Unregister a previously registered audio decoder.
    pub fn unregister_audio_decoder(&self, handle: AudioHandle) -> Result<(), MediaError> {
        #[cfg(feature = "audio")]
        {
            if self.audio_registry().unregister_decoder(handle) {
                Ok(())
            } else {
                Err(MediaError::CodecNotFound)
            }
        }
        #[cfg(not(feature = "audio"))]
        {
            let _ = handle;
            Err(MediaError::CodecNotFound)
        }
    }
}
