use crate::entities::order_entity;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 订单状态: pending -> preparing -> on-the-way -> delivered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "on-the-way")]
    OnTheWay,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// 下单时写入订单的商品快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: i64,
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[schema(example = "12 Galle Road, Colombo 03")]
    pub address: String,
    /// 已通过 apply-coupon 兑换的优惠券
    pub coupon_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub coupon_id: Option<i64>,
    pub address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<order_entity::Model> for OrderResponse {
    fn from(m: order_entity::Model) -> Self {
        let items = serde_json::from_value(m.items).unwrap_or_else(|e| {
            log::warn!("Order {} has malformed items: {e}", m.id);
            Vec::new()
        });
        Self {
            id: m.id,
            user_id: m.user_id,
            items,
            subtotal: m.subtotal,
            delivery_fee: m.delivery_fee,
            discount: m.discount,
            total_amount: m.total_amount,
            coupon_id: m.coupon_id,
            address: m.address,
            status: m.status,
            created_at: m.created_at,
        }
    }
}
