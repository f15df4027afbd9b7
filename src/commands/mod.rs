//! @acp:module "Commands"
//! @acp:summary "CLI command implementations"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Each command is in its own submodule.

pub mod apply;
pub mod init;

pub use apply::{execute_apply, ApplyOptions};
pub use init::{execute_init, InitOptions};
