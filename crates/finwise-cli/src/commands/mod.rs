//! Command implementations
//!
//! Each submodule covers one command area; `core` holds shared utilities
//! like `open_db`.

mod core;
mod serve;
mod status;
mod training;
mod users;

pub use core::{cmd_init, open_db};
pub use serve::cmd_serve;
pub use status::cmd_status;
pub use training::cmd_train;
pub use users::cmd_create_user;
