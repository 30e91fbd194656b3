//! The three probe streams and their fixed settings.

use std::fmt;
use std::str::FromStr;

use crate::detector::DetectorConfig;

/// One of the three independent reading streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamId {
    Smoker,
    FoodA,
    FoodB,
}

impl StreamId {
    /// All streams, in source column order.
    pub const ALL: [StreamId; 3] = [StreamId::Smoker, StreamId::FoodA, StreamId::FoodB];

    /// Name of the durable queue carrying this stream.
    pub fn queue_name(self) -> &'static str {
        match self {
            StreamId::Smoker => "01-smoker",
            StreamId::FoodA => "02-food-A",
            StreamId::FoodB => "03-food-B",
        }
    }

    /// Short label used on the command line and in logs.
    pub fn label(self) -> &'static str {
        match self {
            StreamId::Smoker => "smoker",
            StreamId::FoodA => "food-a",
            StreamId::FoodB => "food-b",
        }
    }

    /// Detection settings for this stream.
    pub fn detector_config(self) -> DetectorConfig {
        match self {
            StreamId::Smoker => DetectorConfig::smoker_drop(
                "SMOKER ALERT",
                "SMOKER ALERT: Smoker temp has decreased by 15 degrees or more in the last 2.5 minutes.",
            ),
            StreamId::FoodA => DetectorConfig::food_stall(
                "FOOD A STALL",
                "FOOD A STALL: Food A temp has changed by 1 degree or less in the last 10 minutes.",
            ),
            StreamId::FoodB => DetectorConfig::food_stall(
                "FOOD B STALL",
                "FOOD B STALL: Food B temp has changed by 1 degree or less in the last 10 minutes.",
            ),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StreamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smoker" | "01-smoker" => Ok(StreamId::Smoker),
            "food-a" | "fooda" | "02-food-a" => Ok(StreamId::FoodA),
            "food-b" | "foodb" | "03-food-b" => Ok(StreamId::FoodB),
            other => Err(format!(
                "unknown stream '{}' (expected smoker, food-a or food-b)",
                other
            )),
        }
    }
}
