mod clock_manual;
mod token_cache_memory;
mod user_repo_memory;

pub use clock_manual::*;
pub use token_cache_memory::*;
pub use user_repo_memory::*;
