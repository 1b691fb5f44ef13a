//! metadata_extraction (§4.5 stage 1): mandatory, no dependencies.

use std::path::Path;

use pipeline_models::VideoMetadata;

use crate::context::PipelineContext;
use crate::error::PipelineResult;
use media_toolkit::MediaError;

pub async fn run(ctx: &PipelineContext, source_path: &Path) -> PipelineResult<VideoMetadata> {
    let metadata = media_toolkit::probe_video(source_path).await?;
    if !metadata.is_valid() {
        return Err(MediaError::InvalidVideo("zero-duration or zero-resolution video".to_string()).into());
    }

    ctx.storage.video_metadata.save(ctx.job.job_id, &metadata).await?;
    Ok(metadata)
}
