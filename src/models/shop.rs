use serde::Serialize;

use crate::codec::records::{ensure_range, prefix_validation, Fields, Record};
use crate::error::{DecodeError, Result};

/// A BloodyShop product. Negative ids are prefab identifiers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub stack: i64,
    pub currency: i64,
    #[serde(rename = "isBuff")]
    pub is_buff: bool,
}

impl Record for Product {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            id: f.int("id")?,
            name: f.string("name")?,
            price: f.int("price")?,
            stock: f.int("stock")?,
            stack: f.int("stack")?,
            currency: f.int("currency")?,
            is_buff: f.bool("isBuff")?,
        })
    }

    fn validate(&self) -> Result<()> {
        ensure_range("id", self.id, -999_999_999..=999_999_999)?;
        ensure_range("price", self.price, 0..=999_999)?;
        ensure_range("stock", self.stock, 0..=999_999)?;
        ensure_range("stack", self.stack, 0..=999_999)?;
        ensure_range("currency", self.currency, 0..=999_999_999)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MerchantPosition {
    pub x: f64,
    pub z: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MerchantFlags {
    #[serde(rename = "IsEnabled")]
    pub enabled: bool,
    #[serde(rename = "Immortal")]
    pub immortal: bool,
    #[serde(rename = "CanMove")]
    pub can_move: bool,
    #[serde(rename = "Autorespawn")]
    pub autorespawn: bool,
}

/// Spawn settings, stored as one flat `config` object in the file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MerchantConfig {
    #[serde(flatten)]
    pub position: MerchantPosition,
    #[serde(flatten)]
    pub flags: MerchantFlags,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Merchant {
    pub name: String,
    #[serde(rename = "PrefabGUID")]
    pub prefab_guid: i64,
    pub items: Vec<MerchantItem>,
    pub config: MerchantConfig,
}

impl Record for Merchant {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
        let config = f.object("config")?;
        Ok(Self {
            name: f.string("name")?,
            prefab_guid: f.int("PrefabGUID")?,
            items: f.list("items")?,
            config: MerchantConfig {
                position: MerchantPosition {
                    x: config.float("x")?,
                    z: config.float("z")?,
                },
                flags: MerchantFlags {
                    enabled: config.bool("IsEnabled")?,
                    immortal: config.bool("Immortal")?,
                    can_move: config.bool("CanMove")?,
                    autorespawn: config.bool("Autorespawn")?,
                },
            },
        })
    }

    fn validate(&self) -> Result<()> {
        for (i, item) in self.items.iter().enumerate() {
            item.validate()
                .map_err(|e| prefix_validation(&format!("items[{i}]."), e))?;
        }
        Ok(())
    }
}

/// One trade offered by a merchant: `input_amount` of `input_item` buys
/// `output_amount` of `output_item`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MerchantItem {
    #[serde(rename = "OutputItem")]
    pub output_item: i64,
    #[serde(rename = "OutputAmount")]
    pub output_amount: i64,
    #[serde(rename = "InputItem")]
    pub input_item: i64,
    #[serde(rename = "InputAmount")]
    pub input_amount: i64,
    #[serde(rename = "StockAmount")]
    pub stock_amount: i64,
    #[serde(rename = "Autorefill")]
    pub autorefill: bool,
}

impl Record for MerchantItem {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            output_item: f.int("OutputItem")?,
            output_amount: f.int("OutputAmount")?,
            input_item: f.int("InputItem")?,
            input_amount: f.int("InputAmount")?,
            stock_amount: f.int("StockAmount")?,
            autorefill: f.bool("Autorefill")?,
        })
    }

    fn validate(&self) -> Result<()> {
        ensure_range("OutputAmount", self.output_amount, 0..=i64::MAX)?;
        ensure_range("InputAmount", self.input_amount, 0..=i64::MAX)?;
        ensure_range("StockAmount", self.stock_amount, 0..=i64::MAX)
    }
}
