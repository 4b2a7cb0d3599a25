use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DiscountType;

/// 优惠券（与存储实现无关的领域表示）
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub prize_name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub assigned_to: i64,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CouponState {
        if self.is_used {
            CouponState::Used
        } else if self.is_expired_at(now) {
            CouponState::Expired
        } else {
            CouponState::Available
        }
    }
}

/// 新建优惠券（奖品字段在发放时复制，不随奖品表后续修改变化）
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub code: String,
    pub prize_name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub assigned_to: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CouponState {
    Available,
    Used,
    Expired,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: i64,
    pub code: String,
    pub prize_name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub state: CouponState,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CouponResponse {
    pub fn from_coupon(coupon: Coupon, now: DateTime<Utc>) -> Self {
        let state = coupon.state_at(now);
        Self {
            id: coupon.id,
            code: coupon.code,
            prize_name: coupon.prize_name,
            discount_type: coupon.discount_type,
            value: coupon.value,
            state,
            expires_at: coupon.expires_at,
            created_at: coupon.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplyCouponRequest {
    #[schema(example = "5%_OFF-7QZ2")]
    pub code: String,
    /// 购物车小计（不含配送费）
    #[schema(example = 1000.0)]
    pub cart_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedCouponResponse {
    pub coupon_id: i64,
    pub code: String,
    pub prize_name: String,
    pub discount: f64,
}
