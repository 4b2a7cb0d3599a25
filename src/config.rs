use crate::models::Prize;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的前端地址；为空时放行任意来源（本地开发）
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

/// 每日抽奖与优惠券相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// 优惠券有效天数
    #[serde(default = "default_coupon_valid_days")]
    pub coupon_valid_days: i64,
    /// 优惠码冲突时最多生成次数
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: usize,
    /// free_item 类优惠券抵扣的商品价格
    #[serde(default = "default_free_item_price")]
    pub free_item_price: f64,
    /// 奖品表; 为空时使用内置奖品表
    #[serde(default)]
    pub prizes: Vec<Prize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee: f64,
}

/// 启动时确保存在的管理员账号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_coupon_valid_days() -> i64 {
    7
}

fn default_max_code_attempts() -> usize {
    5
}

fn default_free_item_price() -> f64 {
    450.0
}

fn default_delivery_fee() -> f64 {
    350.0
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            coupon_valid_days: default_coupon_valid_days(),
            max_code_attempts: default_max_code_attempts(),
            free_item_price: default_free_item_price(),
            prizes: Vec::new(),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            delivery_fee: default_delivery_fee(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                let admin = match (get_env("ADMIN_EMAIL"), get_env("ADMIN_PASSWORD")) {
                    (Some(email), Some(password)) => Some(AdminConfig {
                        email,
                        password,
                        name: get_env("ADMIN_NAME").unwrap_or_else(default_admin_name),
                    }),
                    _ => None,
                };

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 3000u16),
                        cors_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    rewards: RewardsConfig::default(),
                    checkout: CheckoutConfig::default(),
                    admin,
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            config.server.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.refresh_token_expires_in = n;
        }

        // Rewards / checkout
        if let Ok(v) = env::var("REWARDS_COUPON_VALID_DAYS")
            && let Ok(n) = v.parse()
        {
            config.rewards.coupon_valid_days = n;
        }
        if let Ok(v) = env::var("REWARDS_MAX_CODE_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            config.rewards.max_code_attempts = n;
        }
        if let Ok(v) = env::var("REWARDS_FREE_ITEM_PRICE")
            && let Ok(n) = v.parse()
        {
            config.rewards.free_item_price = n;
        }
        if let Ok(v) = env::var("CHECKOUT_DELIVERY_FEE")
            && let Ok(n) = v.parse()
        {
            config.checkout.delivery_fee = n;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.rewards.coupon_valid_days <= 0 {
            return Err("rewards.coupon_valid_days must be positive".to_string());
        }
        if self.rewards.max_code_attempts == 0 {
            return Err("rewards.max_code_attempts must be at least 1".to_string());
        }
        if !self.rewards.free_item_price.is_finite() || self.rewards.free_item_price < 0.0 {
            return Err("rewards.free_item_price must be a non-negative number".to_string());
        }
        if !self.checkout.delivery_fee.is_finite() || self.checkout.delivery_fee < 0.0 {
            return Err("checkout.delivery_fee must be a non-negative number".to_string());
        }
        Ok(())
    }
}
