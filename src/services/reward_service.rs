use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use mockable::Clock;

use crate::config::RewardsConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Coupon, DailyPlayStatusResponse, LedgerWrite, NewCoupon, PlayRecord, PlayRewardResponse,
    Prize, PrizeTable,
};
use crate::stores::{RewardStore, StoreError};
use crate::utils::{RewardRng, coupon_code};

/// 每日抽奖
///
/// 一次抽奖:
/// 1. 读取账本，今天已抽过则直接拒绝
/// 2. 抽取奖品，中奖则生成优惠码
/// 3. 账本条件写入与优惠券插入由存储层原子完成；码冲突时整体回滚并换码重试
///
/// 优惠券只会随已记录的抽奖一起出现，用户在写入完成前看不到、也用不了它。
#[derive(Clone)]
pub struct RewardService {
    store: Arc<dyn RewardStore>,
    prizes: Arc<PrizeTable>,
    clock: Arc<dyn Clock + Send + Sync>,
    rng: Arc<dyn RewardRng>,
    coupon_valid_days: i64,
    max_code_attempts: usize,
}

impl RewardService {
    pub fn new(
        store: Arc<dyn RewardStore>,
        prizes: Arc<PrizeTable>,
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<dyn RewardRng>,
        config: &RewardsConfig,
    ) -> Self {
        Self {
            store,
            prizes,
            clock,
            rng,
            coupon_valid_days: config.coupon_valid_days,
            max_code_attempts: config.max_code_attempts.max(1),
        }
    }

    // 账本里存的是微秒精度，读回来才能和条件写入的旧值相等
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(6)
    }

    pub async fn get_daily_play_status(&self, user_id: i64) -> AppResult<DailyPlayStatusResponse> {
        let today = self.now();
        let entry = self.store.find_ledger(user_id).await?;

        Ok(match entry {
            Some(entry) if same_day(entry.last_played_at, today) => DailyPlayStatusResponse {
                can_play: false,
                last_result: Some(entry.last_prize_name),
            },
            _ => DailyPlayStatusResponse {
                can_play: true,
                last_result: None,
            },
        })
    }

    pub fn list_prizes(&self) -> Vec<Prize> {
        self.prizes.prizes().to_vec()
    }

    pub async fn play_daily_reward(&self, user_id: i64) -> AppResult<PlayRewardResponse> {
        let now = self.now();
        let entry = self.store.find_ledger(user_id).await?;

        if let Some(entry) = &entry
            && same_day(entry.last_played_at, now)
        {
            return Err(AppError::AlreadyPlayedToday);
        }
        let previous = entry.map(|e| e.last_played_at);

        let prize = self.prizes.draw(self.rng.as_ref()).clone();
        let coupon = self.commit_play(user_id, previous, now, &prize).await?;

        log::info!(
            "User {user_id} played daily reward: prize={} code={}",
            prize.name,
            coupon.as_ref().map(|c| c.code.as_str()).unwrap_or("-")
        );

        Ok(PlayRewardResponse {
            name: prize.name,
            kind: prize.kind,
            description: prize.description,
            discount: prize.discount,
            expires_at: coupon.as_ref().map(|c| c.expires_at),
            code: coupon.map(|c| c.code),
        })
    }

    /// 写入账本（中奖时连同优惠券），码冲突时换后缀重试
    async fn commit_play(
        &self,
        user_id: i64,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        prize: &Prize,
    ) -> AppResult<Option<Coupon>> {
        for attempt in 1..=self.max_code_attempts {
            let record = PlayRecord {
                user_id,
                previous,
                played_at: now,
                prize_name: prize.name.clone(),
                coupon: self.new_coupon(user_id, prize, now),
            };

            match self.store.record_play(record).await {
                Ok(LedgerWrite::Applied(coupon)) => return Ok(coupon),
                Ok(LedgerWrite::Stale) => {
                    log::warn!("Concurrent daily play detected for user {user_id}");
                    return Err(AppError::AlreadyPlayedToday);
                }
                Err(StoreError::DuplicateCode(code)) => {
                    log::warn!(
                        "Coupon code collision {code} (attempt {attempt}/{})",
                        self.max_code_attempts
                    );
                }
                Err(e) => {
                    log::error!("Failed to record daily play for user {user_id}: {e}");
                    return Err(e.into());
                }
            }
        }

        Err(AppError::CodeGenerationExhausted(self.max_code_attempts))
    }

    /// 未中奖返回 None；每次调用生成新的后缀
    fn new_coupon(&self, user_id: i64, prize: &Prize, now: DateTime<Utc>) -> Option<NewCoupon> {
        let discount = prize.discount.filter(|_| prize.is_win())?;
        Some(NewCoupon {
            code: coupon_code(&prize.name, &self.rng.code_suffix()),
            prize_name: prize.name.clone(),
            discount_type: discount.discount_type,
            value: discount.value,
            assigned_to: user_id,
            expires_at: now + Duration::days(self.coupon_valid_days),
            created_at: now,
        })
    }
}

/// 按 UTC 日期判断是否同一天
fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplyCouponRequest, DiscountType, LedgerEntry, PrizeKind};
    use crate::services::CouponService;
    use crate::stores::MemoryRewardStore;
    use crate::test_support::{FixedClock, ScriptedRng};
    use async_trait::async_trait;
    use rand::Rng;
    use std::collections::HashSet;
    use tokio::sync::{Barrier, Mutex};

    struct Harness {
        service: RewardService,
        store: Arc<MemoryRewardStore>,
        clock: Arc<FixedClock>,
        rng: Arc<ScriptedRng>,
    }

    fn harness_with(store: Arc<dyn RewardStore>, inner: Arc<MemoryRewardStore>) -> Harness {
        let clock = Arc::new(FixedClock::at(2026, 3, 1, 10, 0));
        let rng = Arc::new(ScriptedRng::new());
        let service = RewardService::new(
            store,
            Arc::new(PrizeTable::standard()),
            clock.clone(),
            rng.clone(),
            &RewardsConfig::default(),
        );
        Harness {
            service,
            store: inner,
            clock,
            rng,
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryRewardStore::new());
        harness_with(store.clone(), store)
    }

    /// 包装内存实现：可在读取账本后同步两个请求，可让账本写入失败，
    /// 也可在写入前尝试使用即将发放的优惠码
    #[derive(Default)]
    struct WrappedStore {
        inner: Arc<MemoryRewardStore>,
        barrier: Option<Barrier>,
        fail_ledger: bool,
        redeemer: Option<CouponService>,
        // (写入前用户可见的优惠券数量, 尝试核销的结果)
        seen_before_write: Mutex<Vec<(usize, AppResult<f64>)>>,
    }

    impl WrappedStore {
        fn over(inner: Arc<MemoryRewardStore>) -> Self {
            Self {
                inner,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl RewardStore for WrappedStore {
        async fn find_ledger(&self, user_id: i64) -> Result<Option<LedgerEntry>, StoreError> {
            let entry = self.inner.find_ledger(user_id).await;
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            entry
        }

        async fn record_play(&self, record: PlayRecord) -> Result<LedgerWrite, StoreError> {
            if let (Some(redeemer), Some(coupon)) = (&self.redeemer, &record.coupon) {
                let visible = self.inner.list_user_coupons(record.user_id).await?.len();
                let redeemed = redeemer
                    .apply_coupon(
                        record.user_id,
                        ApplyCouponRequest {
                            code: coupon.code.clone(),
                            cart_total: 1000.0,
                        },
                    )
                    .await
                    .map(|applied| applied.discount);
                self.seen_before_write.lock().await.push((visible, redeemed));
            }
            if self.fail_ledger {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.record_play(record).await
        }

        async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
            self.inner.find_coupon_by_code(code).await
        }

        async fn find_coupon(&self, coupon_id: i64) -> Result<Option<Coupon>, StoreError> {
            self.inner.find_coupon(coupon_id).await
        }

        async fn mark_coupon_used(
            &self,
            coupon_id: i64,
            used_at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            self.inner.mark_coupon_used(coupon_id, used_at).await
        }

        async fn list_user_coupons(&self, user_id: i64) -> Result<Vec<Coupon>, StoreError> {
            self.inner.list_user_coupons(user_id).await
        }
    }

    #[tokio::test]
    async fn test_first_play_win_issues_coupon() {
        let h = harness();
        h.rng.push_draws(&[2]);
        h.rng.push_suffixes(&["7qz2"]);

        let result = h.service.play_daily_reward(1).await.unwrap();
        assert_eq!(result.name, "5% OFF");
        assert_eq!(result.kind, PrizeKind::Win);
        assert_eq!(result.code.as_deref(), Some("5%_OFF-7QZ2"));
        assert_eq!(
            result.discount.map(|d| d.discount_type),
            Some(DiscountType::Percentage)
        );

        let coupon = h
            .store
            .find_coupon_by_code("5%_OFF-7QZ2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coupon.assigned_to, 1);
        assert!(!coupon.is_used);
        assert_eq!(coupon.value, 0.05);
        assert_eq!(coupon.expires_at - coupon.created_at, Duration::days(7));

        let status = h.service.get_daily_play_status(1).await.unwrap();
        assert!(!status.can_play);
        assert_eq!(status.last_result.as_deref(), Some("5% OFF"));
    }

    #[tokio::test]
    async fn test_lose_records_play_without_coupon() {
        let h = harness();
        h.rng.push_draws(&[3]);

        let result = h.service.play_daily_reward(1).await.unwrap();
        assert_eq!(result.name, "TRY AGAIN");
        assert_eq!(result.kind, PrizeKind::Lose);
        assert!(result.code.is_none());
        assert!(result.discount.is_none());
        assert_eq!(h.store.coupon_count().await, 0);

        let entry = h.store.find_ledger(1).await.unwrap().unwrap();
        assert_eq!(entry.last_prize_name, "TRY AGAIN");
    }

    #[tokio::test]
    async fn test_second_play_same_day_rejected() {
        let h = harness();
        h.rng.push_draws(&[0, 0]);
        h.service.play_daily_reward(1).await.unwrap();

        h.clock.advance_hours(13); // 23:00 同一天
        let err = h.service.play_daily_reward(1).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyPlayedToday));
        assert_eq!(h.store.coupon_count().await, 1);
    }

    #[tokio::test]
    async fn test_play_allowed_after_utc_midnight() {
        let h = harness();
        h.clock.set(FixedClock::at(2026, 3, 1, 23, 50).utc());
        h.rng.push_draws(&[3, 1]);
        h.service.play_daily_reward(1).await.unwrap();

        h.clock.set(FixedClock::at(2026, 3, 2, 0, 5).utc());
        let status = h.service.get_daily_play_status(1).await.unwrap();
        assert!(status.can_play);
        assert!(status.last_result.is_none());

        let result = h.service.play_daily_reward(1).await.unwrap();
        assert_eq!(result.name, "FREE DRINK");
        assert_eq!(
            h.store.find_ledger(1).await.unwrap().unwrap().last_prize_name,
            "FREE DRINK"
        );
    }

    #[tokio::test]
    async fn test_status_for_new_user() {
        let h = harness();
        let status = h.service.get_daily_play_status(42).await.unwrap();
        assert_eq!(
            status,
            DailyPlayStatusResponse {
                can_play: true,
                last_result: None
            }
        );
    }

    #[tokio::test]
    async fn test_code_collision_retries_with_new_suffix() {
        let h = harness();
        // 先占用 LKR_100_-AAAA
        h.rng.push_draws(&[0]);
        h.rng.push_suffixes(&["AAAA"]);
        h.service.play_daily_reward(2).await.unwrap();

        h.rng.push_draws(&[0]);
        h.rng.push_suffixes(&["AAAA", "BBBB"]);
        let result = h.service.play_daily_reward(1).await.unwrap();
        assert_eq!(result.code.as_deref(), Some("LKR_100_-BBBB"));
        assert_eq!(h.store.coupon_count().await, 2);
    }

    #[tokio::test]
    async fn test_code_generation_exhausted_leaves_ledger_untouched() {
        let h = harness();
        h.rng.push_draws(&[0]);
        h.service.play_daily_reward(2).await.unwrap(); // LKR_100_-0000

        // 后缀始终为 0000
        h.rng.push_draws(&[0]);
        let err = h.service.play_daily_reward(1).await.unwrap_err();
        assert!(matches!(err, AppError::CodeGenerationExhausted(5)));
        assert!(err.is_retryable());

        assert!(h.store.find_ledger(1).await.unwrap().is_none());
        assert!(h.service.get_daily_play_status(1).await.unwrap().can_play);
        assert_eq!(h.store.coupon_count().await, 1);
    }

    #[tokio::test]
    async fn test_ledger_failure_issues_no_coupon() {
        let inner = Arc::new(MemoryRewardStore::new());
        let h = harness_with(
            Arc::new(WrappedStore {
                fail_ledger: true,
                ..WrappedStore::over(inner.clone())
            }),
            inner,
        );
        h.rng.push_draws(&[0]);

        let err = h.service.play_daily_reward(1).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert_eq!(h.store.coupon_count().await, 0);
        assert!(h.store.find_ledger(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_coupon_unusable_until_play_is_recorded() {
        let inner = Arc::new(MemoryRewardStore::new());
        let clock = Arc::new(FixedClock::at(2026, 3, 1, 10, 0));
        let redeemer = CouponService::new(inner.clone(), clock, 450.0);
        let wrapped = Arc::new(WrappedStore {
            fail_ledger: true,
            redeemer: Some(redeemer),
            ..WrappedStore::over(inner.clone())
        });
        let h = harness_with(wrapped.clone(), inner);
        h.rng.push_draws(&[0]);
        h.rng.push_suffixes(&["ZZZZ"]);

        let err = h.service.play_daily_reward(1).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));

        {
            let seen = wrapped.seen_before_write.lock().await;
            assert_eq!(seen.len(), 1);
            let (visible, redeemed) = &seen[0];
            assert_eq!(*visible, 0);
            assert!(matches!(redeemed, Err(AppError::CouponNotFound)));
        }
        assert_eq!(h.store.coupon_count().await, 0);
        assert!(h.store.find_ledger(1).await.unwrap().is_none());

        // 失败的抽奖没有留下任何东西，恢复后重试只得到一张券
        let h2 = harness_with(h.store.clone(), h.store.clone());
        h2.rng.push_draws(&[0]);
        h2.rng.push_suffixes(&["YYYY"]);
        let result = h2.service.play_daily_reward(1).await.unwrap();
        assert_eq!(result.code.as_deref(), Some("LKR_100_-YYYY"));
        assert_eq!(h.store.list_user_coupons(1).await.unwrap().len(), 1);
        assert!(matches!(
            h2.service.play_daily_reward(1).await,
            Err(AppError::AlreadyPlayedToday)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_plays_record_exactly_one() {
        let inner = Arc::new(MemoryRewardStore::new());
        let h = harness_with(
            Arc::new(WrappedStore {
                barrier: Some(Barrier::new(2)),
                ..WrappedStore::over(inner.clone())
            }),
            inner,
        );
        h.rng.push_draws(&[0, 0]);
        h.rng.push_suffixes(&["AAAA", "BBBB"]);

        let a = tokio::spawn({
            let service = h.service.clone();
            async move { service.play_daily_reward(1).await }
        });
        let b = tokio::spawn({
            let service = h.service.clone();
            async move { service.play_daily_reward(1).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let won = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyPlayedToday)))
            .count();
        assert_eq!(won, 1);
        assert_eq!(rejected, 1);

        // 失败方没有写入任何优惠券
        let coupons = h.store.list_user_coupons(1).await.unwrap();
        assert_eq!(coupons.len(), 1);
        let winner_code = results
            .iter()
            .find_map(|r| r.as_ref().ok())
            .and_then(|r| r.code.clone());
        assert_eq!(Some(coupons[0].code.clone()), winner_code);
    }

    /// 总是抽中第一个奖品，后缀只有 64 种取值，逼出大量码冲突
    struct NarrowRng;

    impl RewardRng for NarrowRng {
        fn pick_index(&self, _len: usize) -> usize {
            0
        }

        fn code_suffix(&self) -> String {
            const ALPHABET: &[u8] = b"ABCDEFGH";
            let mut rng = rand::thread_rng();
            let mut suffix = String::from("ZZ");
            for _ in 0..2 {
                suffix.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
            }
            suffix
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_plays_issue_unique_codes() {
        const USERS: i64 = 32;
        let store = Arc::new(MemoryRewardStore::new());
        let service = RewardService::new(
            store.clone(),
            Arc::new(PrizeTable::standard()),
            Arc::new(FixedClock::at(2026, 3, 1, 10, 0)),
            Arc::new(NarrowRng),
            &RewardsConfig::default(),
        );

        let handles: Vec<_> = (1..=USERS)
            .map(|user_id| {
                let service = service.clone();
                tokio::spawn(async move { (user_id, service.play_daily_reward(user_id).await) })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            let (user_id, result) = handle.await.unwrap();
            let ledger = store.find_ledger(user_id).await.unwrap();
            match result {
                Ok(play) => {
                    wins += 1;
                    assert!(play.code.is_some());
                    assert!(ledger.is_some());
                }
                // 冲突次数用尽时什么都不写
                Err(AppError::CodeGenerationExhausted(_)) => assert!(ledger.is_none()),
                Err(e) => panic!("unexpected play failure for user {user_id}: {e}"),
            }
        }
        assert!(wins > 0);

        let mut codes = HashSet::new();
        for user_id in 1..=USERS {
            for coupon in store.list_user_coupons(user_id).await.unwrap() {
                assert!(codes.insert(coupon.code), "duplicate coupon code issued");
            }
        }
        assert_eq!(codes.len(), wins);
        assert_eq!(store.coupon_count().await, wins);
    }

    #[tokio::test]
    async fn test_list_prizes_returns_table_in_order() {
        let h = harness();
        let names: Vec<String> = h.service.list_prizes().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["LKR 100 OFF", "FREE DRINK", "5% OFF", "TRY AGAIN"]);
    }
}
