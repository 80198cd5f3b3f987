//! Async client for long-running analysis jobs
//!
//! [`AnalysisSession`] submits jobs to the backend, tracks the current one
//! through HTTP polling and an optional push channel, and publishes a
//! read-only [`SessionView`](analysis_core::SessionView) to observers.
//!
//! ```no_run
//! use analysis_client::{AnalysisSession, HttpBackend};
//! use analysis_utils::ClientConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let session = AnalysisSession::new(Arc::new(HttpBackend::new(&config)?), &config);
//!
//! let job_id = session.submit("AAPL", "buying", "7-agent").await?;
//! let mut views = session.subscribe();
//! while views.changed().await.is_ok() {
//!     let view = views.borrow_and_update().clone();
//!     println!("{job_id}: {}%", view.progress_percent);
//!     if !view.running {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod poller;
pub mod push;
pub mod retry;
pub mod session;

pub use backend::{AnalysisBackend, AnalysisType, HealthStatus};
pub use error::{ClientError, Result};
pub use http::HttpBackend;
pub use poller::PollTiming;
pub use push::PushMessage;
pub use retry::RetryPolicy;
pub use session::AnalysisSession;
