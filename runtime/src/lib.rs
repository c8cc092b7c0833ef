//! # Sponsorlink Runtime
//!
//! Imperative shell around the collaboration reducer.
//!
//! ## Core Components
//!
//! - **[`CollaborationService`]**: loads a record, runs the reducer, persists
//!   with a conditional update, then dispatches notifications
//! - **[`NotificationDispatcher`]**: fire-and-forget delivery with logging
//! - **[`DeadlineMonitor`]**: daily expiry scan with graceful shutdown
//! - **[`Config`]**, [`telemetry`], [`metrics`]: ambient setup shared by binaries
//!
//! ## Example
//!
//! ```ignore
//! use sponsorlink_runtime::CollaborationService;
//!
//! let service = CollaborationService::new(store, posts, sink, Arc::new(SystemClock));
//!
//! let outcome = service.accept(&id, &caller).await;
//! if !outcome.success {
//!     show_error(outcome.error_kind, outcome.error);
//! }
//! ```

/// Configuration loaded from the environment
pub mod config;

/// Notification delivery
pub mod dispatch;

/// Prometheus metrics for observability
pub mod metrics;

/// Scheduled deadline scans
pub mod monitor;

/// Collaboration operations
pub mod service;

/// Tracing subscriber setup
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use dispatch::{DispatchReport, NotificationDispatcher};
pub use monitor::{DeadlineMonitor, MonitorHandle, ScanReport};
pub use service::CollaborationService;
