// ABOUTME: Command module aggregator for the slotswap CLI.
// ABOUTME: Re-exports the handler of every subcommand except init.

mod deploy;
mod logs;
mod operator;
mod progress;
mod status;
mod swap;
mod unlock;

pub use deploy::deploy;
pub use logs::logs;
pub use status::status;
pub use swap::swap;
pub use unlock::unlock;
