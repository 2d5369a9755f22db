//! Domain records returned by the grid API.
//!
//! # Design
//! These types are decoded from server responses and never built from user
//! input. They are defined independently of the stub backend; integration
//! tests catch schema drift between the two. Dates go through the adapters
//! in [`crate::dates`] so that the strict/tolerant policy lives in one place.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A historical official draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub id: i64,
    #[serde(with = "crate::dates::calendar_date")]
    pub date: NaiveDate,
    pub numbers: Vec<u32>,
    pub stars: Vec<u32>,
}

/// A stored grid. `created_at` is absent for grids that were not generated
/// by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub id: i64,
    #[serde(with = "crate::dates::calendar_date")]
    pub draw_date: NaiveDate,
    pub numbers: Vec<u32>,
    pub stars: Vec<u32>,
    #[serde(
        default,
        with = "crate::dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
}

/// A freshly generated grid, before the backend assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrid {
    #[serde(with = "crate::dates::calendar_date")]
    pub draw_date: NaiveDate,
    pub numbers: Vec<u32>,
    pub stars: Vec<u32>,
}

impl Grid {
    /// The grid without its identity and creation time.
    pub fn without_identity(&self) -> NewGrid {
        NewGrid {
            draw_date: self.draw_date,
            numbers: self.numbers.clone(),
            stars: self.stars.clone(),
        }
    }
}
