use serde::Serialize;

use crate::codec::records::{Fields, Record};
use crate::error::DecodeError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalletToken {
    #[serde(rename = "CharacterName")]
    pub character_name: String,
    #[serde(rename = "Tokens")]
    pub tokens: i64,
}

impl Record for WalletToken {
    fn from_fields(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            character_name: f.string("CharacterName")?,
            tokens: f.int("Tokens")?,
        })
    }
}

/// One line of the wallet's append-only transaction log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalletLogEntry {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "By")]
    pub by: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Amount")]
    pub amount: i64,
}

impl Record for WalletLogEntry {
    fn from_fields(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            from: f.string("From")?,
            to: f.string("To")?,
            method: f.string("Method")?,
            by: f.string("By")?,
            kind: f.string("Type")?,
            amount: f.int("Amount")?,
        })
    }
}

/// Display buckets for token balances, richest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TokenBucket {
    #[serde(rename = "2000+")]
    From2000,
    #[serde(rename = "1000-1999")]
    From1000,
    #[serde(rename = "500-999")]
    From500,
    #[serde(rename = "100-499")]
    From100,
    #[serde(rename = "1-99")]
    From1,
    #[serde(rename = "0")]
    Empty,
}

impl TokenBucket {
    pub const ALL: [TokenBucket; 6] = [
        TokenBucket::From2000,
        TokenBucket::From1000,
        TokenBucket::From500,
        TokenBucket::From100,
        TokenBucket::From1,
        TokenBucket::Empty,
    ];

    /// Negative balances belong to no bucket.
    pub fn for_tokens(tokens: i64) -> Option<Self> {
        match tokens {
            2000..=i64::MAX => Some(TokenBucket::From2000),
            1000..=1999 => Some(TokenBucket::From1000),
            500..=999 => Some(TokenBucket::From500),
            100..=499 => Some(TokenBucket::From100),
            1..=99 => Some(TokenBucket::From1),
            0 => Some(TokenBucket::Empty),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketGroup {
    pub bucket: TokenBucket,
    pub players: Vec<WalletToken>,
    pub total_tokens: i64,
}

/// All six buckets in fixed order, members kept in load order. Negative
/// balances are left out.
pub fn group_by_bucket(tokens: &[WalletToken]) -> Vec<BucketGroup> {
    TokenBucket::ALL
        .iter()
        .map(|&bucket| {
            let players: Vec<WalletToken> = tokens
                .iter()
                .filter(|t| TokenBucket::for_tokens(t.tokens) == Some(bucket))
                .cloned()
                .collect();
            let total_tokens = players
                .iter()
                .map(|p| p.tokens)
                .fold(0i64, i64::saturating_add);
            BucketGroup {
                bucket,
                players,
                total_tokens,
            }
        })
        .collect()
}
