//! Herakles Traffic Agent Library
//!
//! This library polls network devices over SNMP for interface traffic
//! counters, converts the cumulative readings into per-interval rate metrics
//! and streams them to the Mackerel ingestion API.
//!
//! # Features
//!
//! - **Counter Conversion**: 32/64-bit wraparound handling and per-second byte rates
//! - **Reliable Delivery**: ordered, chunked, retry-until-success send queue
//! - **Hot Reload**: reconciles running workers against a new configuration without
//!   losing rate baselines
//! - **Staggered Startup**: spreads device connections over a settle window
//! - **Graceful Shutdown**: drains the send queue within a deadline
//!
//! # Usage
//!
//! ```rust
//! use herakles_traffic_agent::{MetricDeltaConverter, RawSample};
//! use chrono::{Duration, Utc};
//!
//! let mut converter = MetricDeltaConverter::new();
//! let start = Utc::now();
//!
//! // The first snapshot only establishes the baseline
//! assert!(converter
//!     .convert(&[RawSample::new(1, "ifHCInOctets", "eth0", 60)], start)
//!     .is_empty());
//!
//! let metrics = converter.convert(
//!     &[RawSample::new(1, "ifHCInOctets", "eth0", 120)],
//!     start + Duration::seconds(60),
//! );
//! assert_eq!(metrics[0].name, "interface.eth0.rxBytes.delta");
//! assert_eq!(metrics[0].value, 1.0);
//! ```

pub mod collectors;
pub mod config;
pub mod converter;
pub mod counters;
pub mod health;
pub mod health_stats;
pub mod mackerel;
pub mod metric;
pub mod sdnotify;
pub mod sendqueue;
pub mod service;
pub mod signals;
pub mod supervisor;
pub mod ticker;
pub mod worker;

// Re-export main types for convenience
pub use collectors::{Collector, CollectorError, CollectorFactory, InterfaceInfo, RawSample};
pub use config::{AgentSettings, Config, ConfigError, ConfigSource, TargetConfig};
pub use converter::{CustomConverter, MetricDeltaConverter};
pub use metric::Metric;
pub use sendqueue::{Enqueuer, SendQueue, Sender};
pub use service::{Service, ServiceError};
pub use supervisor::Supervisor;
pub use worker::Worker;
