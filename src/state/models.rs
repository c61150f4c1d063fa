// Data models for wardrobe state management
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of wardrobe categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tops,
    Bottoms,
    Shoes,
    Accessories,
    Outerwear,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Tops,
        Category::Bottoms,
        Category::Shoes,
        Category::Accessories,
        Category::Outerwear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Shoes => "shoes",
            Category::Accessories => "accessories",
            Category::Outerwear => "outerwear",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown category '{}' (expected one of: tops, bottoms, shoes, accessories, outerwear)",
            self.0
        )
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub image_path: String,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Copy of an item as it was when an outfit was put together.
///
/// Outfits hold these by value; removing the live item later leaves them as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitItemSnapshot {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub image_path: String,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&ClothingItem> for OutfitItemSnapshot {
    fn from(item: &ClothingItem) -> Self {
        OutfitItemSnapshot {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category,
            color: item.color.clone(),
            image_path: item.image_path.clone(),
            date_added: item.date_added,
            tags: item.tags.clone(),
        }
    }
}

impl From<ClothingItem> for OutfitItemSnapshot {
    fn from(item: ClothingItem) -> Self {
        OutfitItemSnapshot {
            id: item.id,
            name: item.name,
            category: item.category,
            color: item.color,
            image_path: item.image_path,
            date_added: item.date_added,
            tags: item.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: String,
    pub name: String,
    pub items: Vec<OutfitItemSnapshot>,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_preview: Option<String>,
}

/// Column layout of one table, as reported by the schema check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// Fixed-width RFC 3339 form used for stored timestamps, so that text order
/// in SQLite matches time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
