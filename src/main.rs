use actix_web::{App, HttpServer, middleware::Logger, web};
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use chrono::Local;  // timestamp in log lines
use std::sync::Arc;

use burger_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    models::PrizeTable,
    services::*,
    stores::{RewardStore, SeaOrmRewardStore},
    swagger::swagger_config,
    utils::{JwtService, ThreadRewardRng},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 奖品表启动时校验，运行期只读
    let prize_table = Arc::new(
        PrizeTable::from_config(&config.rewards.prizes).expect("Invalid prize table configuration"),
    );
    log::info!("Loaded prize table with {} entries", prize_table.len());

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let store: Arc<dyn RewardStore> = Arc::new(SeaOrmRewardStore::new(pool.clone()));
    let clock = Arc::new(mockable::DefaultClock);

    // 创建服务
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let user_service = UserService::new(pool.clone());
    let product_service = ProductService::new(pool.clone());
    let reward_service = RewardService::new(
        store.clone(),
        prize_table,
        clock.clone(),
        Arc::new(ThreadRewardRng),
        &config.rewards,
    );
    let coupon_service = CouponService::new(store, clock, config.rewards.free_item_price);
    let order_service = OrderService::new(
        pool.clone(),
        coupon_service.clone(),
        config.checkout.delivery_fee,
    );

    // 管理员账号
    if let Some(admin) = &config.admin {
        if let Err(e) = user_service.ensure_admin(admin).await {
            log::error!("Failed to ensure admin account: {e}");
        }
    }

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let cors_origins = config.server.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors(&cors_origins))
            .wrap(Logger::default())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(product_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(reward_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::product_config)
                    .configure(handlers::order_config)
                    .configure(handlers::coupon_config)
                    .configure(handlers::reward_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
