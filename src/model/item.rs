//! Catalogue items and the API record decoder

use serde::{Deserialize, Deserializer};

/// A catalogue item as stored locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable identifier assigned by the upstream API
    pub id: i64,
    pub category_id: i64,
    /// Page request that last produced this item, if that page was persisted
    pub item_page_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub item_type: String,
    pub members_only: bool,
}

/// Item record as returned by the items endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(deserialize_with = "deserialize_members")]
    pub members: bool,
}

impl ApiItem {
    /// Converts the wire record into an item owned by `category_id`
    pub fn into_item(self, category_id: i64) -> Item {
        Item {
            id: self.id,
            category_id,
            item_page_id: None,
            name: self.name,
            description: self.description,
            item_type: self.item_type,
            members_only: self.members,
        }
    }
}

/// The members flag arrives as `"true"`, `"False"`, `1`, `0` or a real bool
fn deserialize_members<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MembersFlag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match MembersFlag::deserialize(deserializer)? {
        MembersFlag::Bool(b) => b,
        MembersFlag::Int(i) => i != 0,
        MembersFlag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}
