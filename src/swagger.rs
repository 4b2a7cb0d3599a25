use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::user::get_profile,
        handlers::user::update_profile,
        handlers::user::remove_profile_image,
        handlers::user::change_password,
        handlers::user::delete_me,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::delete_user,
        handlers::product::list_products,
        handlers::product::get_product,
        handlers::product::create_product,
        handlers::product::update_product,
        handlers::product::delete_product,
        handlers::order::create_order,
        handlers::order::get_orders,
        handlers::order::get_all_orders,
        handlers::order::update_order_status,
        handlers::order::delete_order,
        handlers::coupon::apply_coupon,
        handlers::coupon::list_coupons,
        handlers::reward::get_status,
        handlers::reward::get_prizes,
        handlers::reward::play,
    ),
    components(
        schemas(
            UserRole,
            UserResponse,
            CreateUserRequest,
            LoginRequest,
            RefreshTokenRequest,
            UpdateUserRequest,
            ChangePasswordRequest,
            AuthResponse,
            ProductResponse,
            CreateProductRequest,
            UpdateProductRequest,
            OrderStatus,
            OrderItem,
            OrderItemRequest,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderResponse,
            PrizeKind,
            DiscountType,
            DiscountSpec,
            Prize,
            DailyPlayStatusResponse,
            PlayRewardResponse,
            CouponState,
            CouponResponse,
            ApplyCouponRequest,
            AppliedCouponResponse,
            ApiError,
            PaginatedOrderResponse,
            PaginatedUserResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "user", description = "User management API"),
        (name = "product", description = "Product catalog API"),
        (name = "order", description = "Order management API"),
        (name = "coupons", description = "Coupon listing and redemption API"),
        (name = "rewards", description = "Daily reward game API"),
    ),
    info(
        title = "Burger Backend API",
        version = "1.0.0",
        description = "Burger storefront REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
