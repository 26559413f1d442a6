//! Room-type filter stored on a subscription.
//!
//! A subscription either watches every floor plan of a unit (empty filter)
//! or only the listed ones, e.g. `["2LDK", "3LDK"]`.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct RoomTypes(pub Vec<String>);

impl Deref for RoomTypes {
    type Target = Vec<String>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for RoomTypes {
    fn from(types: Vec<String>) -> Self {
        Self::normalized(types)
    }
}

impl RoomTypes {
    /// Build a filter from raw labels: trimmed, ASCII-uppercased, blanks
    /// dropped, duplicates removed keeping the first occurrence.
    pub fn normalized<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = normalize_room_type(label.as_ref());
            if !label.is_empty() && !out.contains(&label) {
                out.push(label);
            }
        }
        RoomTypes(out)
    }

    /// Parse the `&`-joined suffix of a subscribe command (`2LDK&3LDK`).
    pub fn parse(raw: &str) -> Self {
        Self::normalized(raw.split('&'))
    }

    /// Room types from `available` this filter cares about.
    ///
    /// An empty filter accepts everything; otherwise the result is the
    /// intersection, compared case-insensitively, in the order of `available`.
    pub fn matching<'a>(&self, available: &'a [String]) -> Vec<&'a str> {
        available
            .iter()
            .filter(|t| self.accepts(t))
            .map(String::as_str)
            .collect()
    }

    /// Whether a single room type passes this filter
    pub fn accepts(&self, room_type: &str) -> bool {
        self.is_empty() || self.0.contains(&normalize_room_type(room_type))
    }

    /// Whether a vacancy with the given room types should notify this subscriber.
    ///
    /// With no filter any vacancy counts, even if the provider reported no labels.
    pub fn wants(&self, available: &[String]) -> bool {
        self.is_empty() || !self.matching(available).is_empty()
    }
}

impl fmt::Display for RoomTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

fn normalize_room_type(label: &str) -> String {
    label.trim().to_ascii_uppercase()
}
