/// Smartlock identifiers are numeric on the Nuki Web API.
pub type SmartlockId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
