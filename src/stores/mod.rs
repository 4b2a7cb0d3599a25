//! Persistence contract for the daily reward and coupon core.
//!
//! Services depend on [`RewardStore`] rather than on a database handle so
//! that the allocation and redemption rules can run against PostgreSQL in
//! production and against [`MemoryRewardStore`] in tests.
//!
//! Every mutating operation is a single guarded write:
//! - `record_play` writes the ledger entry and the play's coupon together.
//!   It only applies if the ledger still holds the value read earlier (or,
//!   for a first play, if no row exists yet), and it fails with
//!   [`StoreError::DuplicateCode`] on a code clash. Either way nothing is
//!   left behind, so a coupon is never visible without its recorded play;
//! - `mark_coupon_used` only flips a coupon that is still unused.
//!
//! Coupons are never deleted through this contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::AppError;
use crate::models::{Coupon, LedgerEntry, LedgerWrite, PlayRecord};

pub mod memory;
pub mod sea_orm_store;

pub use memory::MemoryRewardStore;
pub use sea_orm_store::SeaOrmRewardStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another coupon already uses this code.
    #[error("duplicate coupon code: {0}")]
    DuplicateCode(String),

    /// The backing store could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::DuplicateCode(code) => {
                AppError::InternalError(format!("Unhandled duplicate coupon code {code}"))
            }
        }
    }
}

#[async_trait]
pub trait RewardStore: Send + Sync {
    async fn find_ledger(&self, user_id: i64) -> Result<Option<LedgerEntry>, StoreError>;

    /// Conditionally upsert the user's ledger entry and insert the play's
    /// coupon, atomically.
    ///
    /// `record.previous` is the `last_played_at` observed before the play
    /// was decided (`None` when no entry existed). Returns
    /// [`LedgerWrite::Stale`] if the stored entry no longer matches it.
    async fn record_play(&self, record: PlayRecord) -> Result<LedgerWrite, StoreError>;

    /// Exact match; callers normalise the code first.
    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    async fn find_coupon(&self, coupon_id: i64) -> Result<Option<Coupon>, StoreError>;

    /// Returns `false` if the coupon was already used (or does not exist).
    async fn mark_coupon_used(
        &self,
        coupon_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list_user_coupons(&self, user_id: i64) -> Result<Vec<Coupon>, StoreError>;
}
