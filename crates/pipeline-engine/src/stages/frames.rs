//! frame_extraction (§4.5 stage 2): `MTK.ExtractFrames` under the job's
//! sampling options.

use std::path::{Path, PathBuf};

use pipeline_models::VideoMetadata;

use crate::context::PipelineContext;
use crate::error::PipelineResult;

pub async fn run(ctx: &PipelineContext, metadata: &VideoMetadata, source_path: &Path) -> PipelineResult<Vec<PathBuf>> {
    let options = &ctx.job.options;
    let out_dir = ctx.job_dir.join("frames");

    let paths = media_toolkit::extract_frames(
        source_path,
        options.frame_sampling_mode,
        options.frame_sample_rate,
        options.clamped_max_frames(),
        metadata.duration,
        &out_dir,
        Some(ctx.mtk_cancel()),
    )
    .await?;

    Ok(paths)
}
