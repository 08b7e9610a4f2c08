//! Settings come from a TOML file, then `KEYWARD__SECTION__KEY` environment
//! overrides, and are validated before the server is built.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
