//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `serve`   | `Serve`          |
//! | `migrate` | `Migrate`        |
//! | `config`  | `Config`         |

pub mod config;
pub mod migrate;
pub mod serve;

pub use config::cmd_config;
pub use migrate::cmd_migrate;
pub use serve::{ServeOverrides, cmd_serve};
