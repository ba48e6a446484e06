//! roundsman-lib: Core types and logic for roundsman
//!
//! roundsman provisions a remote Ubuntu host over SSH so it can run
//! chef-solo against a set of local cookbooks:
//! - `config`: the key/value store loaded from a Lua file, with deferred values
//! - `remote`: the command/upload primitives and the `ssh`/`scp` transport
//! - `exec`: streamed or buffered execution with a privilege prefix
//! - `workspace`: the remote scratch directory every artifact is staged into
//! - `version` and `install`: idempotent interpreter and agent installs
//! - `package` and `render`: cookbook archive and chef-solo manifests
//! - `provision`: the top-level sequence tying everything together

pub mod config;
pub mod consts;
pub mod event;
pub mod exec;
pub mod install;
pub mod package;
pub mod provision;
pub mod remote;
pub mod render;
pub mod util;
pub mod version;
pub mod workspace;
