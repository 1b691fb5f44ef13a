//! audio_extraction (§4.5 stage 3): `MTK.ExtractAudio`.

use std::path::{Path, PathBuf};

use crate::context::PipelineContext;
use crate::error::PipelineResult;

pub async fn run(ctx: &PipelineContext, source_path: &Path) -> PipelineResult<PathBuf> {
    let out_path = ctx.job_dir.join("audio.wav");
    media_toolkit::extract_audio(source_path, &out_path, Some(ctx.mtk_cancel())).await?;
    Ok(out_path)
}
