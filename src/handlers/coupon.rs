use crate::middlewares::current_user;
use crate::models::*;
use crate::services::CouponService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/coupons",
    tag = "coupons",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当前用户的优惠券（新到旧）", body = [CouponResponse]),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_coupons(
    service: web::Data<CouponService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_user_coupons(user.id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/orders/apply-coupon",
    tag = "coupons",
    request_body = ApplyCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "核销成功，返回抵扣金额", body = AppliedCouponResponse),
        (status = 400, description = "参数错误或优惠券已过期"),
        (status = 403, description = "优惠券不属于当前用户"),
        (status = 404, description = "优惠券不存在"),
        (status = 409, description = "优惠券已使用")
    )
)]
pub async fn apply_coupon(
    service: web::Data<CouponService>,
    req: HttpRequest,
    request: web::Json<ApplyCouponRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.apply_coupon(user.id, request.into_inner()).await {
        Ok(applied) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": applied,
            "message": "Coupon applied"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/coupons").route("", web::get().to(list_coupons)));
}
