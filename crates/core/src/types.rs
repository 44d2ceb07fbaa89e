/// Job identifiers are the backend's BIGSERIAL primary keys.
pub type JobId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// One parsed source row, keyed by column header.
pub type SourceRow = indexmap::IndexMap<String, String>;

/// One destination record, keyed by destination field name.
pub type DestinationRecord = indexmap::IndexMap<String, String>;
