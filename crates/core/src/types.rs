/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Position of a frame within the usable [`PoseFrame`](crate::reliability::PoseFrame)
/// sequence (not the frame number in the source video).
pub type SamplePos = usize;
