//! Client side of the backend migration Job Service.
//!
//! [`JobService`] is the seam the wizard talks to. [`HttpJobService`]
//! drives the backend REST API; [`MemoryJobService`] runs the same
//! contract in-process, including a simulated row-processing loop, for
//! tests and offline use.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod service;

pub use config::JobServiceConfig;
pub use error::JobServiceError;
pub use http::HttpJobService;
pub use memory::MemoryJobService;
pub use service::JobService;
