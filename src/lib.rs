//! taskgen: single-flight async task controller.
//! Runs a task on demand, exposes only the newest invocation's outcome, and
//! discards anything superseded by a later `run` or by `cancel`.
//!
//! ```
//! use taskgen::{Launch, TaskBuilder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let controller = TaskBuilder::new(|token, query: String| {
//!     Launch::Run(async move {
//!         if token.is_canceled() {
//!             return Err("superseded".to_string());
//!         }
//!         Ok(query.len())
//!     })
//! })
//! .on_complete(|len| println!("length {len}"))
//! .on_error(|e| eprintln!("{e}"))
//! .build();
//!
//! controller.run("first".to_string());
//! controller.run("second query".to_string());
//!
//! let mut status = controller.subscribe();
//! while status.borrow_and_update().result.is_none() {
//!     status.changed().await.unwrap();
//! }
//! assert_eq!(controller.result(), Some(12));
//! # }
//! ```

pub mod callbacks;
pub mod cancellation;
pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod options;
pub mod runner;
pub mod status;

pub use callbacks::{CallbackRegistry, CallbackSet, ErrorHandler};
pub use cancellation::{InvocationCounter, InvocationToken};
pub use error::{BoxError, TaskError};
pub use launch::{IntoLaunch, Launch};
pub use lifecycle::MountedTask;
pub use metrics::MetricSummary;
pub use options::{NoErrorHandler, TaskBuilder, TaskConfig};
pub use runner::TaskController;
pub use status::{StatusStore, TaskPhase, TaskStatus};
