use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder value for a field no selector matched
pub const NOT_AVAILABLE: &str = "N/A";

/// One classified listing, as served to clients and written to disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub location: String,
    pub date: String,
    pub seller: String,
    pub url: String,
    pub image: String,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            title: NOT_AVAILABLE.to_string(),
            price: NOT_AVAILABLE.to_string(),
            location: NOT_AVAILABLE.to_string(),
            date: NOT_AVAILABLE.to_string(),
            seller: NOT_AVAILABLE.to_string(),
            url: NOT_AVAILABLE.to_string(),
            image: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Artifact types a scrape run writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Csv,
    Json,
    #[default]
    Both,
}

impl OutputFormat {
    pub fn wants_json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    pub fn wants_csv(self) -> bool {
        matches!(self, Self::Csv | Self::Both)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A written artifact surfaced to the client for download
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Everything a finished scrape run produced
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub listings: Vec<Listing>,
    pub files: Vec<FileInfo>,
}

impl ScrapeOutcome {
    pub fn total(&self) -> usize {
        self.listings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_serializes_with_seven_keys() {
        let listing = Listing {
            title: "Car cover".to_string(),
            price: "₹500".to_string(),
            location: "Mumbai".to_string(),
            date: "Today".to_string(),
            seller: "Ravi".to_string(),
            url: "https://www.olx.in/item/1".to_string(),
            image: "https://img.example/1.jpg".to_string(),
        };
        let value = serde_json::to_value(&listing).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 7);
        for key in ["title", "price", "location", "date", "seller", "url", "image"] {
            assert!(map.contains_key(key), "missing key {key}");
        }
    }

    #[test]
    fn default_listing_is_all_placeholders() {
        let listing = Listing::default();
        assert_eq!(listing.title, NOT_AVAILABLE);
        assert_eq!(listing.image, NOT_AVAILABLE);
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("Json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(" both ".parse::<OutputFormat>().unwrap(), OutputFormat::Both);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_selects_artifacts() {
        assert!(OutputFormat::Both.wants_json() && OutputFormat::Both.wants_csv());
        assert!(OutputFormat::Json.wants_json() && !OutputFormat::Json.wants_csv());
        assert!(!OutputFormat::Csv.wants_json() && OutputFormat::Csv.wants_csv());
    }

    #[test]
    fn file_info_uses_type_key_on_the_wire() {
        let info = FileInfo {
            path: "olx_car_cover_20240101_120000_abcd1234.json".to_string(),
            kind: "JSON".to_string(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "JSON");
        assert!(value.get("kind").is_none());
    }
}
