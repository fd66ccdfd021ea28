/// Jobs are keyed by a random (v4) UUID, generated once at submission.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;
