//! Builds the Tool Loop's [`ToolCfg`] from the shared [`GomotionConfig`]
//! (§6 `[TOOL]`). The section carries only `SHM_KEY`; the output count is
//! the workspace-wide [`MAX_TOOL_OUTPUTS`] ceiling (§4.5: "a vector of
//! named tool outputs").

use gomotion_common::config::GomotionConfig;
use gomotion_common::consts::MAX_TOOL_OUTPUTS;
use gomotion_common::shm::segments::ToolCfg;

pub fn build_tool_cfg(_config: &GomotionConfig) -> ToolCfg {
    ToolCfg { serial_number: 0, num_outputs: MAX_TOOL_OUTPUTS as u32 }
}
