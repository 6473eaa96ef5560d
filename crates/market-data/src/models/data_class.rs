use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of market data a request belongs to.
///
/// The class drives cache TTL selection and resolver routing; it is also the
/// second half of every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClass {
    Quote,
    Historical,
    Fundamentals,
    AiAnalysis,
    News,
}

impl DataClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataClass::Quote => "quote",
            DataClass::Historical => "historical",
            DataClass::Fundamentals => "fundamentals",
            DataClass::AiAnalysis => "ai_analysis",
            DataClass::News => "news",
        }
    }
}

impl fmt::Display for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quote" => Ok(DataClass::Quote),
            "historical" => Ok(DataClass::Historical),
            "fundamentals" => Ok(DataClass::Fundamentals),
            "ai_analysis" => Ok(DataClass::AiAnalysis),
            "news" => Ok(DataClass::News),
            other => Err(format!("unknown data class: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for class in [
            DataClass::Quote,
            DataClass::Historical,
            DataClass::Fundamentals,
            DataClass::AiAnalysis,
            DataClass::News,
        ] {
            assert_eq!(class.as_str().parse::<DataClass>(), Ok(class));
        }
    }

    #[test]
    fn rejects_unknown_class() {
        assert!("ticks".parse::<DataClass>().is_err());
    }
}
