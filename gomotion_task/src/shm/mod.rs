mod channel;
mod reader;
mod writer;

pub use channel::TaskChannel;
pub use reader::{OwnCmdCfgReader, ToolStatSetReader, TrajStatSetReader};
pub use writer::{OwnCmdCfgWriter, OwnStatSetWriter, ToolCmdCfgWriter, TrajCmdCfgRefWriter};
