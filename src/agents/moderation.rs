//! FinalModeration：预留的安全审查挂点，目前总是放行

use crate::core::{PipelineState, PipelineStatus};

pub fn run_final_moderation(state: &PipelineState) -> PipelineStatus {
    tracing::info!(
        "[FinalModeration] Passing {} personas through final moderation.",
        state.generated_personas().len()
    );
    PipelineStatus::Success
}
