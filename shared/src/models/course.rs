//! Course access models

use serde::{Deserialize, Serialize};

/// How a student gained access to a course
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "enrollment_source", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentSource {
    Payment,
    Passcode,
    Manual,
}

/// Merge a progress update into the stored state.
///
/// Watched time only moves forward and a completed video stays completed.
pub fn merge_progress(
    stored_seconds: i32,
    stored_completed: bool,
    watched_seconds: i32,
    completed: bool,
) -> (i32, bool) {
    (
        stored_seconds.max(watched_seconds.max(0)),
        stored_completed || completed,
    )
}

/// Completion percentage of a course, rounded down
pub fn completion_percent(completed_videos: i64, total_videos: i64) -> i32 {
    if total_videos <= 0 {
        return 0;
    }
    ((completed_videos.clamp(0, total_videos) * 100) / total_videos) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_progress_is_monotonic() {
        assert_eq!(merge_progress(120, false, 60, false), (120, false));
        assert_eq!(merge_progress(120, false, 180, true), (180, true));
        assert_eq!(merge_progress(180, true, 10, false), (180, true));
        assert_eq!(merge_progress(0, false, -5, false), (0, false));
    }

    #[test]
    fn test_completion_percent() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(3, 3), 100);
        assert_eq!(completion_percent(5, 3), 100);
    }
}
