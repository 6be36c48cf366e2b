//! CLI subcommand implementations.

pub mod bulk;
pub mod day;
pub mod export;
pub mod import;
pub mod month;
pub mod policy;
pub mod proxy;
pub mod record;
pub mod status;
pub mod util;
pub mod watch;
