use actix_cors::Cors;
use actix_web::http::header;

/// 根据配置的来源列表构建 CORS；列表为空时放行任意来源（本地开发）
pub fn create_cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allowed_origin_fn(|_, _req_head| true)
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        // 刷新令牌可能走 Cookie
        .supports_credentials()
        .max_age(3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    #[actix_web::test]
    async fn test_configured_origin_is_echoed() {
        let origins = vec!["http://shop.local".to_string()];
        let app = test::init_service(
            App::new()
                .wrap(create_cors(&origins))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header((header::ORIGIN, "http://shop.local"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://shop.local"
        );
    }

    #[actix_web::test]
    async fn test_unknown_origin_gets_no_allow_header() {
        let origins = vec!["http://shop.local".to_string()];
        let app = test::init_service(
            App::new()
                .wrap(create_cors(&origins))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header((header::ORIGIN, "http://evil.local"))
            .to_request();
        // actix-cors 对不允许的来源可能直接返回错误
        if let Ok(resp) = test::try_call_service(&app, req).await {
            assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        }
    }
}
