//! Client side of the SiemWatch security event console.
//!
//! The crate talks to the event backend over its JSON REST API and turns the
//! responses into view models:
//!
//! - [`client::ApiClient`] performs requests and normalizes failures into
//!   [`error::ApiError`].
//! - [`dashboard::DashboardPoller`] refreshes the eight dashboard views and the
//!   aggregate counters on a fixed interval.
//! - [`browser::EventBrowser`] drives the paginated, filtered event list.
//!
//! Rendering is left to the caller through the traits in [`view`].

pub mod browser;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod pagination;
pub mod query;
pub mod sequence;
pub mod time;
pub mod view;

pub use browser::{BrowserSnapshot, BrowserState, EventBrowser, EventRow};
pub use client::{ApiClient, Freshness, Navigator};
pub use dashboard::{DashboardConfig, DashboardPoller};
pub use error::{ApiError, Result};
pub use model::{Event, EventPage, Severity};
pub use query::{ExportFormat, FilterField, QueryFilters};
pub use sequence::ResponseOrdering;
