//! Footprint
//!
//! Digital-exposure analysis for a single identifier. A query (email,
//! username, phone number or person name) is fanned out to independent
//! sources, the findings are normalized and deduplicated, and the result is
//! scored into a risk profile with a recommendation.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod reporter;
pub mod search;
pub mod sources;
pub mod ui;

pub use catalog::{PlatformCatalog, PlatformEntry};
pub use config::{Credentials, DispatchConfig, SearchConfig};
pub use errors::{FootprintError, FootprintResult};
pub use http::{HttpClient, ReqwestClient};
pub use models::{Profile, Query, QueryType, RiskSummary, SourceResult};
pub use search::{FootprintSearch, RiskBand};
