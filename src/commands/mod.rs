//! CLI subcommands

pub mod check;
pub mod init;
pub mod list;
