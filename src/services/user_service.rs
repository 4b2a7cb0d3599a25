use crate::config::AdminConfig;
use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::auth_service::{is_unique_violation, validate_name};
use crate::utils::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn find_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// 获取用户个人资料
    pub async fn get_user_profile(&self, user_id: i64) -> AppResult<UserResponse> {
        Ok(self.find_user(user_id).await?.into())
    }

    /// 更新用户Profile（角色不可由用户自己修改）
    pub async fn update_user_profile(
        &self,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        // 检查是否有需要更新的字段
        if request.name.is_none() && request.email.is_none() && request.profile_image.is_none() {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }

        if let Some(name) = &request.name {
            validate_name(name)?;
        }
        let email = match &request.email {
            Some(email) => {
                let email = normalize_email(email);
                validate_email(&email)?;
                Some(email)
            }
            None => None,
        };

        let mut model = self.find_user(user_id).await?.into_active_model();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(email) = email {
            model.email = Set(email);
        }
        if let Some(image) = request.profile_image {
            model.profile_image = Set(Some(image));
        }
        model.updated_at = Set(Utc::now());

        match model.update(&self.pool).await {
            Ok(updated) => Ok(updated.into()),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::ValidationError("Email already in use".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove_profile_image(&self, user_id: i64) -> AppResult<UserResponse> {
        let mut model = self.find_user(user_id).await?.into_active_model();
        model.profile_image = Set(None);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&self.pool).await?.into())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        let user = self.find_user(user_id).await?;

        if !verify_password(&request.current_password, &user.password_hash)? {
            return Err(AppError::AuthError("Incorrect current password".to_string()));
        }
        validate_password_change(&request.current_password, &request.new_password)?;

        let password_hash = hash_password(&request.new_password)?;
        let mut model = user.into_active_model();
        model.password_hash = Set(password_hash);
        model.updated_at = Set(Utc::now());
        model.update(&self.pool).await?;

        log::info!("User {user_id} changed password");
        Ok(())
    }

    /// 删除用户；抽奖账本、优惠券、订单由外键级联删除
    pub async fn delete_user(&self, user_id: i64) -> AppResult<()> {
        let result = users::Entity::delete_by_id(user_id)
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        log::info!("Deleted user {user_id}");
        Ok(())
    }

    /// 管理员: 用户列表（分页）
    pub async fn list_users(&self, query: &UserQuery) -> AppResult<PaginatedResponse<UserResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let total = users::Entity::find().count(&self.pool).await? as i64;
        let models = users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;
        let items: Vec<UserResponse> = models.into_iter().map(UserResponse::from).collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    /// 启动时确保管理员账号存在，已存在的账号会被提升为管理员
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<()> {
        let email = normalize_email(&admin.email);
        validate_email(&email)?;

        if let Some(existing) = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.pool)
            .await?
        {
            if existing.role != UserRole::Admin {
                let mut model = existing.into_active_model();
                model.role = Set(UserRole::Admin);
                model.updated_at = Set(Utc::now());
                model.update(&self.pool).await?;
                log::info!("Promoted {email} to admin");
            }
            return Ok(());
        }

        let now = Utc::now();
        users::ActiveModel {
            name: Set(admin.name.clone()),
            email: Set(email.clone()),
            password_hash: Set(hash_password(&admin.password)?),
            role: Set(UserRole::Admin),
            profile_image: Set(None),
            loyalty_points: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Seeded admin account {email}");
        Ok(())
    }
}
