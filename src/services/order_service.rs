use std::collections::HashMap;

use crate::entities::{order_entity as orders, product_entity as products};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::CouponService;
use crate::services::auth_service::is_unique_violation;
use crate::utils::round_money;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

const MAX_ITEM_QUANTITY: i32 = 99;

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    coupon_service: CouponService,
    delivery_fee: f64,
}

/// 按目录价格生成商品快照并计算小计（不信任客户端价格）
fn price_items(
    catalog: &HashMap<i64, products::Model>,
    requested: &[OrderItemRequest],
) -> AppResult<(Vec<OrderItem>, f64)> {
    if requested.is_empty() {
        return Err(AppError::ValidationError("Order has no items".to_string()));
    }

    let mut items = Vec::with_capacity(requested.len());
    let mut subtotal = 0.0;
    for line in requested {
        if line.quantity < 1 || line.quantity > MAX_ITEM_QUANTITY {
            return Err(AppError::ValidationError(format!(
                "Quantity must be between 1 and {MAX_ITEM_QUANTITY}"
            )));
        }
        let product = catalog.get(&line.product_id).ok_or_else(|| {
            AppError::ValidationError(format!("Product {} does not exist", line.product_id))
        })?;

        subtotal += product.price * line.quantity as f64;
        items.push(OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity: line.quantity,
            image: product.image.clone(),
        });
    }

    Ok((items, round_money(subtotal)))
}

fn order_total(subtotal: f64, delivery_fee: f64, discount: f64) -> f64 {
    round_money((subtotal + delivery_fee - discount).max(0.0))
}

// 状态只能前进
fn status_rank(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::Preparing => 1,
        OrderStatus::OnTheWay => 2,
        OrderStatus::Delivered => 3,
    }
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, coupon_service: CouponService, delivery_fee: f64) -> Self {
        Self {
            pool,
            coupon_service,
            delivery_fee,
        }
    }

    pub async fn create_order(
        &self,
        user_id: i64,
        request: CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        let address = request.address.trim();
        if address.is_empty() {
            return Err(AppError::ValidationError(
                "Delivery address is required".to_string(),
            ));
        }

        let ids: Vec<i64> = request.items.iter().map(|i| i.product_id).collect();
        let catalog: HashMap<i64, products::Model> = products::Entity::find()
            .filter(products::Column::Id.is_in(ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let (items, subtotal) = price_items(&catalog, &request.items)?;

        let discount = match request.coupon_id {
            Some(coupon_id) => {
                let coupon = self
                    .coupon_service
                    .redeemed_coupon(user_id, coupon_id)
                    .await?;
                self.coupon_service.discount_for(&coupon, subtotal)
            }
            None => 0.0,
        };
        let total_amount = order_total(subtotal, self.delivery_fee, discount);

        let items_json = serde_json::to_value(&items)
            .map_err(|e| AppError::InternalError(format!("Failed to encode order items: {e}")))?;
        let now = Utc::now();

        let inserted = orders::ActiveModel {
            user_id: Set(user_id),
            items: Set(items_json),
            subtotal: Set(subtotal),
            delivery_fee: Set(self.delivery_fee),
            discount: Set(discount),
            total_amount: Set(total_amount),
            coupon_id: Set(request.coupon_id),
            address: Set(address.to_string()),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await;

        match inserted {
            Ok(order) => {
                log::info!(
                    "User {user_id} placed order {} total={total_amount:.2} discount={discount:.2}",
                    order.id
                );
                Ok(order.into())
            }
            Err(e) if is_unique_violation(&e) => Err(AppError::ValidationError(
                "Coupon already attached to an order".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn paginate(
        &self,
        base_query: Select<orders::Entity>,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let base_query = match query.status {
            Some(status) => base_query.filter(orders::Column::Status.eq(status)),
            None => base_query,
        };

        let total = base_query.clone().count(&self.pool).await? as i64;
        let models = base_query
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;
        let items: Vec<OrderResponse> = models.into_iter().map(OrderResponse::from).collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    pub async fn get_user_orders(
        &self,
        user_id: i64,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        self.paginate(
            orders::Entity::find().filter(orders::Column::UserId.eq(user_id)),
            query,
        )
        .await
    }

    /// 管理员: 全部订单
    pub async fn get_all_orders(
        &self,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        self.paginate(orders::Entity::find(), query).await
    }

    pub async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> AppResult<OrderResponse> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if status_rank(status) < status_rank(order.status) {
            return Err(AppError::ValidationError(format!(
                "Cannot move order from {:?} back to {:?}",
                order.status, status
            )));
        }

        let mut model = order.into_active_model();
        model.status = Set(status);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&self.pool).await?.into())
    }

    pub async fn delete_order(&self, order_id: i64) -> AppResult<()> {
        let result = orders::Entity::delete_by_id(order_id)
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Order not found".to_string()));
        }
        Ok(())
    }
}
