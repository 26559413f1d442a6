//! UR API models

use crate::error::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// `20_1310` or `20_131_0`: branch, complex, room class
static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_(\d+?)_?(\d)$").unwrap());

/// Structured danchi identifier used by the UR search API
///
/// The site writes it as `<shisya>_<danchi><shikibetu>`, e.g. `20_1310` is
/// branch `20`, complex `131`, room class `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DanchiCode {
    pub shisya: String,
    pub danchi: String,
    pub shikibetu: String,
}

impl FromStr for DanchiCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CODE_REGEX
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidCode(s.to_string()))?;

        Ok(Self {
            shisya: caps[1].to_string(),
            danchi: caps[2].to_string(),
            shikibetu: caps[3].to_string(),
        })
    }
}

impl fmt::Display for DanchiCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}{}", self.shisya, self.danchi, self.shikibetu)
    }
}

/// A single vacant room as listed by the older list-shaped response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListing {
    #[serde(default)]
    pub name: String,
    /// Floor plan, e.g. `2LDK`
    #[serde(rename = "type", default)]
    pub room_type: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub rent_normal: String,
    #[serde(rename = "roomDetailLink", default)]
    pub detail_link: String,
}

/// Raw response: either a summary object or a list of rooms
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum VacancyResponse {
    Summary {
        count: u32,
        #[serde(default)]
        room: Vec<String>,
    },
    Rooms(Vec<RoomListing>),
}

/// Normalized vacancy result for one danchi
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    pub count: u32,
    /// Distinct floor plans with vacancies, sorted
    pub room_types: Vec<String>,
    /// Individual rooms, when the endpoint lists them
    pub rooms: Vec<RoomListing>,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.count > 0
    }

    pub(crate) fn from_response(response: Option<VacancyResponse>) -> Self {
        match response {
            None => Self::default(),
            Some(VacancyResponse::Summary { count, room }) => Self {
                count,
                room_types: distinct(room),
                rooms: Vec::new(),
            },
            Some(VacancyResponse::Rooms(rooms)) => Self {
                count: rooms.len() as u32,
                room_types: distinct(rooms.iter().map(|r| r.room_type.clone())),
                rooms,
            },
        }
    }
}

fn distinct<I: IntoIterator<Item = String>>(types: I) -> Vec<String> {
    types
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
