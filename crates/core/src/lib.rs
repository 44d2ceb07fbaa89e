//! Pure logic for the spreadsheet import pipeline.
//!
//! No I/O and no async: entity import profiles, the advisory preview
//! parser, mapping suggestion, the mapping editor, job status rules, file
//! acceptance checks, template generation and the result summary.

pub mod error;
pub mod job;
pub mod mapping;
pub mod preview;
pub mod profile;
pub mod suggestion;
pub mod summary;
pub mod template;
pub mod types;
pub mod upload;
