use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;

use crate::error::{AppError, AppResult};
use crate::models::{
    AppliedCouponResponse, ApplyCouponRequest, Coupon, CouponResponse, DiscountType,
};
use crate::stores::RewardStore;
use crate::utils::{normalize_coupon_code, round_money};

/// 按优惠方式计算抵扣金额，结果在 `[0, subtotal]` 内
pub fn compute_discount(
    discount_type: DiscountType,
    value: f64,
    subtotal: f64,
    free_item_price: f64,
) -> f64 {
    let raw = match discount_type {
        DiscountType::Flat => value,
        DiscountType::Percentage => value * subtotal,
        DiscountType::FreeItem => free_item_price,
    };
    round_money(raw.clamp(0.0, subtotal.max(0.0)))
}

#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn RewardStore>,
    clock: Arc<dyn Clock + Send + Sync>,
    free_item_price: f64,
}

impl CouponService {
    pub fn new(
        store: Arc<dyn RewardStore>,
        clock: Arc<dyn Clock + Send + Sync>,
        free_item_price: f64,
    ) -> Self {
        Self {
            store,
            clock,
            free_item_price,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(6)
    }

    pub fn discount_for(&self, coupon: &Coupon, subtotal: f64) -> f64 {
        compute_discount(
            coupon.discount_type,
            coupon.value,
            subtotal,
            self.free_item_price,
        )
    }

    /// 结账时核销优惠券
    ///
    /// 校验顺序: 存在 -> 归属 -> 过期 -> 已使用。
    /// 过期优先于已使用，过期券无论是否用过都报过期。
    /// 所有校验通过后以 `is_used = false` 为条件标记已使用，并发核销只有一个成功。
    pub async fn apply_coupon(
        &self,
        user_id: i64,
        request: ApplyCouponRequest,
    ) -> AppResult<AppliedCouponResponse> {
        if !request.cart_total.is_finite() || request.cart_total < 0.0 {
            return Err(AppError::ValidationError(
                "Cart total must be a non-negative amount".to_string(),
            ));
        }

        let code = normalize_coupon_code(&request.code);
        if code.is_empty() {
            return Err(AppError::ValidationError("Coupon code is required".to_string()));
        }

        let now = self.now();
        let coupon = self
            .store
            .find_coupon_by_code(&code)
            .await?
            .ok_or(AppError::CouponNotFound)?;

        if coupon.assigned_to != user_id {
            return Err(AppError::CouponNotOwned);
        }
        if coupon.is_expired_at(now) {
            return Err(AppError::CouponExpired);
        }
        if coupon.is_used {
            return Err(AppError::CouponAlreadyUsed);
        }

        let discount = self.discount_for(&coupon, request.cart_total);

        if !self.store.mark_coupon_used(coupon.id, now).await? {
            return Err(AppError::CouponAlreadyUsed);
        }

        log::info!(
            "User {user_id} redeemed coupon {} for discount {discount:.2}",
            coupon.code
        );

        Ok(AppliedCouponResponse {
            coupon_id: coupon.id,
            code: coupon.code,
            prize_name: coupon.prize_name,
            discount,
        })
    }

    pub async fn list_user_coupons(&self, user_id: i64) -> AppResult<Vec<CouponResponse>> {
        let now = self.now();
        let coupons = self.store.list_user_coupons(user_id).await?;
        Ok(coupons
            .into_iter()
            .map(|c| CouponResponse::from_coupon(c, now))
            .collect())
    }

    /// 下单时引用的优惠券必须属于当前用户且已通过 [`Self::apply_coupon`] 核销
    pub async fn redeemed_coupon(&self, user_id: i64, coupon_id: i64) -> AppResult<Coupon> {
        let coupon = self
            .store
            .find_coupon(coupon_id)
            .await?
            .ok_or(AppError::CouponNotFound)?;

        if coupon.assigned_to != user_id {
            return Err(AppError::CouponNotOwned);
        }
        if !coupon.is_used {
            return Err(AppError::ValidationError(
                "Coupon must be applied before checkout".to_string(),
            ));
        }

        Ok(coupon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCoupon;
    use crate::stores::MemoryRewardStore;
    use crate::test_support::FixedClock;
    use chrono::Duration;

    struct Harness {
        service: CouponService,
        store: Arc<MemoryRewardStore>,
        clock: Arc<FixedClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryRewardStore::new());
        let clock = Arc::new(FixedClock::at(2026, 3, 1, 12, 0));
        let service = CouponService::new(store.clone(), clock.clone(), 450.0);
        Harness {
            service,
            store,
            clock,
        }
    }

    async fn seed(
        h: &Harness,
        code: &str,
        user_id: i64,
        discount_type: DiscountType,
        value: f64,
    ) -> Coupon {
        let now = h.clock.utc();
        h.store
            .insert_coupon(NewCoupon {
                code: code.to_string(),
                prize_name: "TEST".to_string(),
                discount_type,
                value,
                assigned_to: user_id,
                expires_at: now + Duration::days(7),
                created_at: now,
            })
            .await
            .unwrap()
    }

    fn request(code: &str, cart_total: f64) -> ApplyCouponRequest {
        ApplyCouponRequest {
            code: code.to_string(),
            cart_total,
        }
    }

    #[test]
    fn test_compute_discount() {
        assert_eq!(compute_discount(DiscountType::Flat, 100.0, 1000.0, 450.0), 100.0);
        // 固定金额不超过小计
        assert_eq!(compute_discount(DiscountType::Flat, 100.0, 60.0, 450.0), 60.0);
        assert_eq!(
            compute_discount(DiscountType::Percentage, 0.05, 1000.0, 450.0),
            50.0
        );
        assert_eq!(
            compute_discount(DiscountType::FreeItem, 1.0, 1000.0, 450.0),
            450.0
        );
        assert_eq!(compute_discount(DiscountType::FreeItem, 1.0, 300.0, 450.0), 300.0);
        assert_eq!(compute_discount(DiscountType::Flat, 100.0, 0.0, 450.0), 0.0);
    }

    #[tokio::test]
    async fn test_apply_percentage_coupon() {
        let h = harness();
        let coupon = seed(&h, "5%_OFF-7QZ2", 1, DiscountType::Percentage, 0.05).await;

        let applied = h
            .service
            .apply_coupon(1, request(" 5%_off-7qz2 ", 1000.0))
            .await
            .unwrap();
        assert_eq!(applied.coupon_id, coupon.id);
        assert_eq!(applied.discount, 50.0);

        let stored = h.store.find_coupon(coupon.id).await.unwrap().unwrap();
        assert!(stored.is_used);
        assert_eq!(stored.used_at, Some(h.clock.utc()));
    }

    #[tokio::test]
    async fn test_apply_flat_coupon_capped_at_subtotal() {
        let h = harness();
        seed(&h, "LKR_100_-AB12", 1, DiscountType::Flat, 100.0).await;
        let applied = h
            .service
            .apply_coupon(1, request("LKR_100_-AB12", 60.0))
            .await
            .unwrap();
        assert_eq!(applied.discount, 60.0);
    }

    #[tokio::test]
    async fn test_coupon_cannot_be_applied_twice() {
        let h = harness();
        seed(&h, "FREE_DRI-0001", 1, DiscountType::FreeItem, 1.0).await;
        h.service
            .apply_coupon(1, request("FREE_DRI-0001", 800.0))
            .await
            .unwrap();
        let err = h
            .service
            .apply_coupon(1, request("FREE_DRI-0001", 800.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CouponAlreadyUsed));
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_coupons() {
        let h = harness();
        let coupon = seed(&h, "LKR_100_-ZZZZ", 2, DiscountType::Flat, 100.0).await;

        let err = h
            .service
            .apply_coupon(1, request("NOPE-0000", 500.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CouponNotFound));

        let err = h
            .service
            .apply_coupon(1, request("LKR_100_-ZZZZ", 500.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CouponNotOwned));

        // 失败不改变状态
        let stored = h.store.find_coupon(coupon.id).await.unwrap().unwrap();
        assert!(!stored.is_used);
    }

    #[tokio::test]
    async fn test_expired_coupon_reported_before_used() {
        let h = harness();
        let coupon = seed(&h, "5%_OFF-OLD1", 1, DiscountType::Percentage, 0.05).await;
        h.store
            .mark_coupon_used(coupon.id, h.clock.utc())
            .await
            .unwrap();

        h.clock.set(coupon.expires_at + Duration::seconds(1));
        let err = h
            .service
            .apply_coupon(1, request("5%_OFF-OLD1", 1000.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CouponExpired));
    }

    #[tokio::test]
    async fn test_coupon_valid_at_exact_expiry() {
        let h = harness();
        let coupon = seed(&h, "5%_OFF-EDGE", 1, DiscountType::Percentage, 0.05).await;
        h.clock.set(coupon.expires_at);
        assert!(
            h.service
                .apply_coupon(1, request("5%_OFF-EDGE", 200.0))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_invalid_cart_total_rejected() {
        let h = harness();
        let coupon = seed(&h, "LKR_100_-NEG1", 1, DiscountType::Flat, 100.0).await;
        for total in [-1.0, f64::NAN, f64::INFINITY] {
            let err = h
                .service
                .apply_coupon(1, request("LKR_100_-NEG1", total))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert!(!h.store.find_coupon(coupon.id).await.unwrap().unwrap().is_used);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redemption_single_winner() {
        let h = harness();
        seed(&h, "LKR_100_-RACE", 1, DiscountType::Flat, 100.0).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = h.service.clone();
                tokio::spawn(async move {
                    service
                        .apply_coupon(1, request("LKR_100_-RACE", 500.0))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, AppError::CouponAlreadyUsed)),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_list_user_coupons_reports_state() {
        let h = harness();
        let used = seed(&h, "A-0001", 1, DiscountType::Flat, 10.0).await;
        seed(&h, "A-0002", 1, DiscountType::Flat, 10.0).await;
        seed(&h, "B-0001", 2, DiscountType::Flat, 10.0).await;
        h.store.mark_coupon_used(used.id, h.clock.utc()).await.unwrap();

        let list = h.service.list_user_coupons(1).await.unwrap();
        assert_eq!(list.len(), 2);
        // 同一时间创建时按 id 倒序
        assert_eq!(list[0].code, "A-0002");
        assert_eq!(list[0].state, crate::models::CouponState::Available);
        assert_eq!(list[1].state, crate::models::CouponState::Used);

        h.clock.advance_hours(24 * 8);
        let list = h.service.list_user_coupons(1).await.unwrap();
        assert_eq!(list[0].state, crate::models::CouponState::Expired);
        assert_eq!(list[1].state, crate::models::CouponState::Used);
    }

    #[tokio::test]
    async fn test_redeemed_coupon_required_for_checkout() {
        let h = harness();
        let coupon = seed(&h, "LKR_100_-CHK1", 1, DiscountType::Flat, 100.0).await;

        let err = h.service.redeemed_coupon(1, coupon.id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        h.service
            .apply_coupon(1, request("LKR_100_-CHK1", 500.0))
            .await
            .unwrap();
        assert!(h.service.redeemed_coupon(1, coupon.id).await.is_ok());
        assert!(matches!(
            h.service.redeemed_coupon(2, coupon.id).await,
            Err(AppError::CouponNotOwned)
        ));
        assert!(matches!(
            h.service.redeemed_coupon(1, 999).await,
            Err(AppError::CouponNotFound)
        ));
    }
}
