use serde::Serialize;

use crate::codec::records::{ensure_range, prefix_validation, Fields, Record};
use crate::error::{DecodeError, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BossPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A BloodyBoss encounter. Spawn and despawn hours are kept as written.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Boss {
    pub name: String,
    #[serde(rename = "nameHash")]
    pub name_hash: String,
    #[serde(rename = "AssetName")]
    pub asset_name: String,
    #[serde(rename = "PrefabGUID")]
    pub prefab_guid: i64,
    #[serde(rename = "Hour")]
    pub hour_start: String,
    #[serde(rename = "HourDespawn")]
    pub hour_despawn: String,
    pub level: i64,
    pub multiplier: f64,
    #[serde(rename = "bossSpawn")]
    pub boss_spawn_enabled: bool,
    #[serde(rename = "Lifetime")]
    pub lifetime_seconds: i64,
    #[serde(flatten)]
    pub position: BossPosition,
    pub items: Vec<BossLootItem>,
}

impl Record for Boss {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            name: f.string("name")?,
            name_hash: f.string("nameHash")?,
            asset_name: f.string("AssetName")?,
            prefab_guid: f.int("PrefabGUID")?,
            hour_start: f.string("Hour")?,
            hour_despawn: f.string("HourDespawn")?,
            level: f.int("level")?,
            multiplier: f.float("multiplier")?,
            boss_spawn_enabled: f.bool("bossSpawn")?,
            lifetime_seconds: f.int("Lifetime")?,
            position: BossPosition {
                x: f.float("x")?,
                y: f.float("y")?,
                z: f.float("z")?,
            },
            items: f.list("items")?,
        })
    }

    fn validate(&self) -> Result<()> {
        ensure_range("level", self.level, 0..=i64::MAX)?;
        ensure_range("Lifetime", self.lifetime_seconds, 0..=i64::MAX)?;
        for (i, item) in self.items.iter().enumerate() {
            item.validate()
                .map_err(|e| prefix_validation(&format!("items[{i}]."), e))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BossLootItem {
    pub name: String,
    #[serde(rename = "ItemID")]
    pub item_id: i64,
    #[serde(rename = "Stack")]
    pub stack: i64,
    #[serde(rename = "Chance")]
    pub chance_percent: i64,
    /// Hex color used for the item name in chat, e.g. `#daa520`.
    #[serde(rename = "Color")]
    pub color_hex: String,
}

impl Record for BossLootItem {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            name: f.string("name")?,
            item_id: f.int("ItemID")?,
            stack: f.int("Stack")?,
            chance_percent: f.int("Chance")?,
            color_hex: f.string("Color")?,
        })
    }

    fn validate(&self) -> Result<()> {
        ensure_range("Stack", self.stack, 0..=i64::MAX)?;
        ensure_range("Chance", self.chance_percent, 0..=100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::records::{decode_records, encode_records};

    const BOSSES: &str = r##"[
  {
    "name": "Lord of Ash",
    "nameHash": "1297352474",
    "AssetName": "CHAR_Vampire_Dracula_VBlood",
    "PrefabGUID": -327335305,
    "Hour": "21:00",
    "HourDespawn": "22:00",
    "level": 90,
    "multiplier": 2.5,
    "bossSpawn": true,
    "Lifetime": 1800,
    "x": -1500.25,
    "y": 0.0,
    "z": -1200.0,
    "items": [
      {
        "name": "Greater Stygian Shards",
        "ItemID": 576389135,
        "Stack": 50,
        "Chance": 100,
        "Color": "#daa520"
      }
    ]
  }
]"##;

    #[test]
    fn test_boss_round_trip() {
        let bosses: Vec<Boss> = decode_records(BOSSES.as_bytes()).unwrap();
        let boss = &bosses[0];
        assert_eq!(boss.prefab_guid, -327335305);
        assert_eq!(boss.position.x, -1500.25);
        assert_eq!(boss.items[0].color_hex, "#daa520");
        assert_eq!(
            String::from_utf8(encode_records(&bosses).unwrap()).unwrap(),
            BOSSES
        );
    }

    #[test]
    fn test_loot_chance_range() {
        let mut bosses: Vec<Boss> = decode_records(BOSSES.as_bytes()).unwrap();
        assert!(bosses[0].validate().is_ok());
        bosses[0].items[0].chance_percent = 150;
        let err = bosses[0].validate().unwrap_err().to_string();
        assert!(err.contains("items[0].Chance"), "{err}");
    }

    #[test]
    fn test_missing_loot_field() {
        let json = BOSSES.replace("\"Stack\": 50,", "");
        let err = decode_records::<Boss>(json.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingField {
                index: 0,
                field: "items[0].Stack".into()
            }
        );
    }
}
