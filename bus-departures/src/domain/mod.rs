//! Domain types for the bus departure lookup.
//!
//! Stops can only come from a [`Gazetteer`], and directions and day-types are
//! closed enums, so code receiving these types can trust their validity.

mod direction;
mod stop;

pub use direction::{DayType, Direction, InvalidDirection};
pub use stop::{DuplicateStop, Gazetteer, LINE_STOPS, Stop};
