//! `depgate-core`: dependency approval state machine and polling engine.
//!
//! Newly observed dependencies are checked against a remote validation
//! service and tracked until they reach a terminal decision:
//!
//! ```text
//! extract::Extractors ──Observation──► ValidationEngine::submit
//!                                           │
//!                         ApprovalTracker ◄─┤─► RetryScheduler (one task per key)
//!                                           │
//!                                           ▼
//!                                     EventStream (DecisionChanged, …)
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use depgate_core::{EngineSettings, EnvCredentials, HttpValidationClient, Observation, ValidationEngine};
//!
//! let creds = Arc::new(EnvCredentials::default());
//! let client = HttpValidationClient::new(url, creds.clone(), connect, read)?;
//! let (engine, mut events) = ValidationEngine::new(EngineSettings::default(), Arc::new(client), creds);
//! engine.submit(Observation::new("left-pad", "npm", "1.0.0", "package.json")).await;
//! while let Some(ev) = events.recv().await {
//!     println!("{ev:?}");
//! }
//! ```

pub mod classifier;
pub mod client;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod inventory;
pub mod io;
pub mod paths;
pub mod scheduler;
pub mod tracker;
pub mod types;

pub use client::{
    DecisionResponse, DependencyRequest, DeveloperInfo, HttpValidationClient, InventoryReport,
    PackageInfo, ValidationClient,
};
pub use config::Config;
pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use engine::{EngineSettings, SubmitOutcome, ValidationEngine};
pub use error::{DepgateError, Result, TransportError};
pub use events::{EngineEvent, EventStream};
pub use scheduler::Regime;
pub use types::{Decision, DependencyKey, DependencyRecord, Observation};
