pub mod announcement;
pub mod boss;
pub mod raid;
pub mod shop;
pub mod stats;
pub mod wallet;

pub use announcement::Announcement;
pub use boss::{Boss, BossLootItem};
pub use raid::{OverrideMode, RaidGuardConfig, RaidScheduleConfig};
pub use shop::{Merchant, MerchantItem, Product};
pub use stats::{CurrencyPerDayStat, OnlineTimeStat};
pub use wallet::{TokenBucket, WalletLogEntry, WalletToken};
