//! # Recirca Core
//!
//! Core library for the Recirca dispatch service, providing the request
//! lifecycle state machine, claim arbitration, live location relay, and the
//! request store abstraction.
//!
//! ## Overview
//!
//! `recirca-core` is the foundation of the Recirca service, offering:
//!
//! - **Request Lifecycle**: The `pending -> claimed -> completed/cancelled`
//!   state machine with single-winner claim arbitration
//! - **Location Relay**: Forwarding of a claimant's live position to the
//!   requester while a request is active
//! - **Geo Utility**: Great-circle distance and ETA heuristics
//! - **Store Abstraction**: Trait-based request store supporting multiple
//!   backends
//!
//! ## Feature Flags
//!
//! - `database`: Enables the PostgreSQL store backend (SQLx support)
//!
//! ## Architecture
//!
//! - [`dispatch`]: Lifecycle engine, event sink port, and location relay
//! - [`store`]: Request store port and backends
//! - [`geo`]: Pure coordinate math
#![allow(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod geo;
pub mod store;

pub use dispatch::{EventSink, LifecycleEngine, LocationRelay};
pub use error::{DispatchError, Result};
pub use store::{RequestStore, TransitionFields};
