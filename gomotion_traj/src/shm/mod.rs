mod reader;
mod segments;
mod writer;

pub use reader::{OwnCmdCfgRefReader, ServoStatSetReader};
pub use segments::TrajChannel;
pub use writer::{OwnStatSetWriter, ServoCmdCfgWriter};
