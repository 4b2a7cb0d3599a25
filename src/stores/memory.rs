use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{RewardStore, StoreError};
use crate::models::{Coupon, LedgerEntry, LedgerWrite, NewCoupon, PlayRecord};

#[derive(Default)]
struct State {
    ledger: HashMap<i64, LedgerEntry>,
    coupons: HashMap<i64, Coupon>,
    next_coupon_id: i64,
}

/// 内存实现，语义与数据库实现一致（条件写入、唯一码、账本与优惠券同成同败）
///
/// 所有校验都在同一把锁内完成后才修改状态，相当于数据库事务。
#[derive(Default)]
pub struct MemoryRewardStore {
    state: Mutex<State>,
}

impl MemoryRewardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn coupon_count(&self) -> usize {
        self.state.lock().await.coupons.len()
    }

    /// 直接写入一张优惠券（不经过抽奖），用于准备数据
    pub async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StoreError> {
        let mut state = self.state.lock().await;
        if state.code_taken(&coupon.code) {
            return Err(StoreError::DuplicateCode(coupon.code));
        }
        Ok(state.push_coupon(coupon))
    }
}

impl State {
    fn code_taken(&self, code: &str) -> bool {
        self.coupons.values().any(|c| c.code == code)
    }

    fn push_coupon(&mut self, coupon: NewCoupon) -> Coupon {
        self.next_coupon_id += 1;
        let created = Coupon {
            id: self.next_coupon_id,
            code: coupon.code,
            prize_name: coupon.prize_name,
            discount_type: coupon.discount_type,
            value: coupon.value,
            assigned_to: coupon.assigned_to,
            is_used: false,
            used_at: None,
            expires_at: coupon.expires_at,
            created_at: coupon.created_at,
        };
        self.coupons.insert(created.id, created.clone());
        created
    }
}

#[async_trait]
impl RewardStore for MemoryRewardStore {
    async fn find_ledger(&self, user_id: i64) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.state.lock().await.ledger.get(&user_id).cloned())
    }

    async fn record_play(&self, record: PlayRecord) -> Result<LedgerWrite, StoreError> {
        let mut state = self.state.lock().await;
        let current = state.ledger.get(&record.user_id).map(|e| e.last_played_at);
        if current != record.previous {
            return Ok(LedgerWrite::Stale);
        }
        if let Some(coupon) = &record.coupon
            && state.code_taken(&coupon.code)
        {
            return Err(StoreError::DuplicateCode(coupon.code.clone()));
        }

        state.ledger.insert(
            record.user_id,
            LedgerEntry {
                user_id: record.user_id,
                last_played_at: record.played_at,
                last_prize_name: record.prize_name,
            },
        );
        let coupon = record.coupon.map(|coupon| state.push_coupon(coupon));
        Ok(LedgerWrite::Applied(coupon))
    }

    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.coupons.values().find(|c| c.code == code).cloned())
    }

    async fn find_coupon(&self, coupon_id: i64) -> Result<Option<Coupon>, StoreError> {
        Ok(self.state.lock().await.coupons.get(&coupon_id).cloned())
    }

    async fn mark_coupon_used(
        &self,
        coupon_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.coupons.get_mut(&coupon_id) {
            Some(coupon) if !coupon.is_used => {
                coupon.is_used = true;
                coupon.used_at = Some(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_user_coupons(&self, user_id: i64) -> Result<Vec<Coupon>, StoreError> {
        let state = self.state.lock().await;
        let mut coupons: Vec<Coupon> = state
            .coupons
            .values()
            .filter(|c| c.assigned_to == user_id)
            .cloned()
            .collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(coupons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountType;
    use chrono::TimeZone;

    fn new_coupon(code: &str, user_id: i64) -> NewCoupon {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        NewCoupon {
            code: code.to_string(),
            prize_name: "LKR 100 OFF".to_string(),
            discount_type: DiscountType::Flat,
            value: 100.0,
            assigned_to: user_id,
            expires_at: now + chrono::Duration::days(7),
            created_at: now,
        }
    }

    fn play(user_id: i64, previous: Option<DateTime<Utc>>, played_at: DateTime<Utc>) -> PlayRecord {
        PlayRecord {
            user_id,
            previous,
            played_at,
            prize_name: "TRY AGAIN".to_string(),
            coupon: None,
        }
    }

    #[tokio::test]
    async fn test_record_play_is_conditional() {
        let store = MemoryRewardStore::new();
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();

        assert_eq!(
            store.record_play(play(1, None, t1)).await.unwrap(),
            LedgerWrite::Applied(None)
        );
        // 第二次首次写入视为过期
        assert_eq!(
            store.record_play(play(1, None, t1)).await.unwrap(),
            LedgerWrite::Stale
        );
        let mut win = play(1, Some(t1), t2);
        win.prize_name = "5% OFF".to_string();
        win.coupon = Some(new_coupon("5%_OFF-AAAA", 1));
        let LedgerWrite::Applied(Some(coupon)) = store.record_play(win.clone()).await.unwrap()
        else {
            panic!("expected the play to be recorded with a coupon");
        };
        assert_eq!(coupon.code, "5%_OFF-AAAA");
        assert_eq!(store.record_play(win).await.unwrap(), LedgerWrite::Stale);

        let entry = store.find_ledger(1).await.unwrap().unwrap();
        assert_eq!(entry.last_played_at, t2);
        assert_eq!(entry.last_prize_name, "5% OFF");
        assert_eq!(store.coupon_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_leaves_ledger_untouched() {
        let store = MemoryRewardStore::new();
        store.insert_coupon(new_coupon("DUP-AAAA", 2)).await.unwrap();

        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut record = play(1, None, t1);
        record.coupon = Some(new_coupon("DUP-AAAA", 1));
        let err = store.record_play(record).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateCode("DUP-AAAA".to_string()));

        assert!(store.find_ledger(1).await.unwrap().is_none());
        assert!(store.list_user_coupons(1).await.unwrap().is_empty());
        assert_eq!(store.coupon_count().await, 1);
    }

    #[tokio::test]
    async fn test_mark_used_only_once() {
        let store = MemoryRewardStore::new();
        let coupon = store.insert_coupon(new_coupon("ONCE-AAAA", 1)).await.unwrap();
        let now = Utc::now();
        assert!(store.mark_coupon_used(coupon.id, now).await.unwrap());
        assert!(!store.mark_coupon_used(coupon.id, now).await.unwrap());
        assert!(!store.mark_coupon_used(999, now).await.unwrap());
    }
}
