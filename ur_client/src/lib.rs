//! UR chintai vacancy API client
//!
//! Queries the public room-search endpoint of the UR rental site for a single
//! danchi and reports which room types currently have vacancies.

mod client;
mod error;
mod models;

pub use client::{UrClient, UrClientConfig};
pub use error::{Error, Result};
pub use models::{Availability, DanchiCode, RoomListing};
