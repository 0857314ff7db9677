//! Structure index: the position of a topic within a course.
//!
//! A position is either a main slot (`"3"`) or a sub slot of a main
//! (`"3/2"`), both 1-based. The tuple form is what the application works
//! with; the string form is the wire/display encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StructureError;

/// Position of a topic in a course structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureIndex {
    /// Main position, 1-based.
    pub main: u32,

    /// Sub position, 1-based; None for a main topic.
    pub sub: Option<u32>,
}

impl StructureIndex {
    /// Index of a main topic.
    pub fn main(main: u32) -> Self {
        Self { main, sub: None }
    }

    /// Index of a sub topic.
    pub fn sub(main: u32, sub: u32) -> Self {
        Self {
            main,
            sub: Some(sub),
        }
    }

    /// Sort key: mains order before their subs, subs before later mains.
    fn sort_key(self) -> (u32, u32) {
        (self.main, self.sub.unwrap_or(0))
    }

    /// Is this a sub-topic position?
    pub fn is_sub(self) -> bool {
        self.sub.is_some()
    }

    /// Build from the persisted integer columns (sub_position 0 = main).
    pub fn from_columns(position: i32, sub_position: i32) -> Self {
        if sub_position == 0 {
            Self::main(position as u32)
        } else {
            Self::sub(position as u32, sub_position as u32)
        }
    }

    /// The persisted integer columns (sub_position 0 = main).
    pub fn to_columns(self) -> (i32, i32) {
        (self.main as i32, self.sub.unwrap_or(0) as i32)
    }
}

impl Ord for StructureIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for StructureIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StructureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub {
            Some(sub) => write!(f, "{}/{}", self.main, sub),
            None => write!(f, "{}", self.main),
        }
    }
}

impl FromStr for StructureIndex {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || StructureError::MalformedIndex(s.to_string());

        let mut parts = s.split('/');
        let main: u32 = parts
            .next()
            .filter(|part| !part.is_empty())
            .and_then(|part| part.parse().ok())
            .ok_or_else(malformed)?;

        let sub = match parts.next() {
            Some(part) => Some(part.parse::<u32>().map_err(|_| malformed())?),
            None => None,
        };

        // More than two segments is malformed, as are 0 positions
        // (numbering is 1-based).
        if parts.next().is_some() || main == 0 || sub == Some(0) {
            return Err(malformed());
        }

        Ok(Self { main, sub })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_main() {
        let index: StructureIndex = "3".parse().unwrap();
        assert_eq!(index, StructureIndex::main(3));
    }

    #[test]
    fn parse_sub() {
        let index: StructureIndex = "3/2".parse().unwrap();
        assert_eq!(index, StructureIndex::sub(3, 2));
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "a", "1/a", "1/2/3", "0", "1/0", "/1", "1/"] {
            assert!(bad.parse::<StructureIndex>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_round_trips() {
        for s in ["1", "7", "2/1", "10/12"] {
            let index: StructureIndex = s.parse().unwrap();
            assert_eq!(index.to_string(), s);
        }
    }

    #[test]
    fn ordering_is_depth_first() {
        let mut indexes: Vec<StructureIndex> = ["2/1", "1", "10", "1/2", "2", "1/1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        indexes.sort();

        let rendered: Vec<String> = indexes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["1", "1/1", "1/2", "2", "2/1", "10"]);
    }

    #[test]
    fn column_round_trip() {
        assert_eq!(
            StructureIndex::from_columns(4, 0),
            StructureIndex::main(4)
        );
        assert_eq!(
            StructureIndex::from_columns(4, 2),
            StructureIndex::sub(4, 2)
        );
        assert_eq!(StructureIndex::sub(4, 2).to_columns(), (4, 2));
        assert_eq!(StructureIndex::main(4).to_columns(), (4, 0));
    }
}
