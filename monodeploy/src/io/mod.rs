//! Side-effecting parts of a run: git, processes, the filesystem.

pub mod changes;
pub mod config;
pub mod deploy;
pub mod git;
pub mod output;
pub mod process;
pub mod report;
pub mod workspace;
