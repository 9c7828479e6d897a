use serde::{Deserialize, Serialize};

/// Identifies one racer within a race session.
pub type RacerId = u32;

/// Represents the fixed parameters of one race.
///
/// The rules consist of the race length in laps and the segmentation
/// granularity of the track, i.e. how many discrete waypoints make up one
/// lap. Both values are authored together with the track and never change
/// while a race is running.
///
/// # Fields
///
/// - `total_laps` – The number of laps a racer has to complete to finish.
/// - `waypoints_per_lap` – The number of waypoint indices per lap; local
///   waypoint indices live in `[0, waypoints_per_lap)`.
///
/// # Example
///
/// ```rust
/// use common::race::RaceRules;
///
/// let rules = RaceRules {
///     total_laps: 3,
///     waypoints_per_lap: 100,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceRules {
    pub total_laps: i32,
    pub waypoints_per_lap: i32,
}

impl RaceRules {
    /// Creates a `RaceRules` instance by deserializing it from a JSON string.
    ///
    /// This method attempts to parse the given JSON string into a [`RaceRules`]
    /// struct using [`serde_json`]. It returns a `Result` containing either the
    /// successfully parsed rules or a `serde_json::Error` if the input is
    /// invalid.
    ///
    /// # Arguments
    ///
    /// * `json` – A JSON-formatted string representing the rules of a race.
    ///
    /// # Returns
    ///
    /// * `Ok(RaceRules)` – If the JSON string was successfully parsed.
    /// * `Err(serde_json::Error)` – If parsing failed due to invalid format or type mismatch.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
