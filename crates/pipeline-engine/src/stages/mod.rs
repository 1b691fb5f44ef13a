//! One module per stage in the catalogue (§4.5); `lib::run_pipeline`
//! sequences these according to `dag::enabled_stages`.

pub mod audio_extract;
pub mod audio_transcription;
pub mod classification;
pub mod frame_analysis;
pub mod frames;
pub mod metadata;
pub mod scene_detection;
pub mod summary;
