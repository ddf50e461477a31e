//! Synchronous client for the TalentLMS REST API.
//!
//! # Overview
//! Every remote endpoint is one method on [`Client`], generated from the
//! operation table in [`operations`]. Each method takes a [`Params`] mapping
//! and returns the decoded JSON body, or exactly one [`Error`] variant.
//!
//! ```no_run
//! use talentlms::{Client, Params};
//!
//! let client = Client::new("example.talentlms.com", "KEY123", None)?;
//! let user = client.user_signup(
//!     &Params::new()
//!         .with("first_name", "John")
//!         .with("last_name", "Smith")
//!         .with("email", "jsmith@example.com")
//!         .with("login", "jsmith")
//!         .with("password", "Secret123"),
//! )?;
//! println!("created user {}", user["id"]);
//! # Ok::<(), talentlms::Error>(())
//! ```
//!
//! # Design
//! - `Client` is immutable after construction and holds no per-call state.
//! - Request building and response parsing are pure and public, so the
//!   [`Transport`] seam is the only place that does I/O.
//! - Service errors are recognised by the error envelope in the body, not by
//!   the HTTP status, and mapped to semantic variants through static tables.
//! - The crate logs through the `log` facade and never installs a logger.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod operations;
pub mod timeline;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result, ServiceError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use operations::{AuthScope, Operation};
pub use transport::UreqTransport;
pub use types::{Params, UserLookup};
