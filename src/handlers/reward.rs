use crate::middlewares::current_user;
use crate::models::{DailyPlayStatusResponse, PlayRewardResponse, Prize};
use crate::services::RewardService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/rewards/status",
    tag = "rewards",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "今日是否可以抽奖", body = DailyPlayStatusResponse),
        (status = 401, description = "未授权"),
        (status = 503, description = "存储暂不可用，可重试")
    )
)]
pub async fn get_status(
    service: web::Data<RewardService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_daily_play_status(user.id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/rewards/prizes",
    tag = "rewards",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "奖品表", body = [Prize]),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_prizes(service: web::Data<RewardService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": service.list_prizes() })))
}

/// 每日抽奖，每个用户每个 UTC 自然日一次
#[utoipa::path(
    post,
    path = "/rewards/play",
    tag = "rewards",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽奖结果，中奖时附带优惠码", body = PlayRewardResponse),
        (status = 400, description = "今日已抽奖 (ALREADY_PLAYED_TODAY)"),
        (status = 401, description = "未授权"),
        (status = 503, description = "存储不可用或优惠码生成失败，可重试")
    )
)]
pub async fn play(service: web::Data<RewardService>, req: HttpRequest) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.play_daily_reward(user.id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn reward_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("/status", web::get().to(get_status))
            .route("/prizes", web::get().to(get_prizes))
            .route("/play", web::post().to(play)),
    );
}
