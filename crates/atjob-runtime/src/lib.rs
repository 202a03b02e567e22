//! # AtJob Runtime
//!
//! The host side of the control plane. The reconciler core is a pure
//! read-decide-write cycle; everything it assumes about its environment
//! lives here:
//!
//! - [`Dispatcher`]: watches the store and invokes the reconciler —
//!   serialized per job key, with deferred re-invocation timers and
//!   retry with exponential backoff on errors.
//! - [`Executor`]: the "node" of the demo deployment — picks up created
//!   workloads, runs their command as a local process, and reports the
//!   terminal outcome through the status write channel.

pub mod config;
pub mod dispatcher;
pub mod executor;

pub use config::{DispatcherConfig, ExecutorConfig, RuntimeConfig};
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use executor::Executor;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
