use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Vertical resolution of a video stream, written as a label like `720p`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resolution(u32);

impl Resolution {
    pub fn from_height(height: u32) -> Self {
        Self(height)
    }

    pub fn height(self) -> u32 {
        self.0
    }
}

impl FromStr for Resolution {
    type Err = Box<dyn std::error::Error + Sync + Send>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(num_prefix) = s.trim().to_lowercase().strip_suffix('p') {
            Ok(Self(num_prefix.parse()?))
        } else {
            Err(Box::from("Resolution does not end with 'p'"))
        }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}p", self.0)
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
