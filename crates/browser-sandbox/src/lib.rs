//! Disposable Chromium sandboxes.
//!
//! Every task gets its own [`ChromeSandbox`]: a fresh storage directory under
//! the configured root and a dedicated Chromium process bound to it. Nothing is
//! pooled or reused. [`ChromeSandbox::release`] tears both down and is safe to
//! call more than once.

pub mod config;
pub mod driver;
pub mod error;
pub mod launch;
pub mod sandbox;

pub use config::SandboxConfig;
pub use driver::{ChromiumPageDriver, SelectorProbe};
pub use error::SandboxError;
pub use launch::{browser_config, isolation_args, resolve_executable};
pub use sandbox::{create_storage, ChromeSandbox, ReleaseReport};
