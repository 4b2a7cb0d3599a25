use crate::entities::product_entity as products;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::auth_service::is_unique_violation;
use crate::utils::round_money;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

#[derive(Clone)]
pub struct ProductService {
    pool: DatabaseConnection,
}

fn validate_price(price: f64) -> AppResult<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::ValidationError(
            "Price must be a non-negative amount".to_string(),
        ));
    }
    Ok(round_money(price))
}

fn validate_product_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 120 {
        return Err(AppError::ValidationError(
            "Product name must be between 1 and 120 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

impl ProductService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn list_products(&self, query: &ProductQuery) -> AppResult<Vec<ProductResponse>> {
        let mut select = products::Entity::find();
        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            select = select.filter(products::Column::Category.eq(category));
        }
        let list = select
            .order_by_asc(products::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn get_product(&self, product_id: i64) -> AppResult<ProductResponse> {
        products::Entity::find_by_id(product_id)
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    pub async fn create_product(&self, request: CreateProductRequest) -> AppResult<ProductResponse> {
        let name = validate_product_name(&request.name)?;
        let price = validate_price(request.price)?;
        let now = Utc::now();

        let inserted = products::ActiveModel {
            name: Set(name),
            price: Set(price),
            description: Set(request.description),
            image: Set(request.image),
            category: Set(request.category),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await;

        match inserted {
            Ok(product) => {
                log::info!("Created product {} ({})", product.id, product.name);
                Ok(product.into())
            }
            Err(e) if is_unique_violation(&e) => Err(AppError::ValidationError(
                "Product name already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_product(
        &self,
        product_id: i64,
        request: UpdateProductRequest,
    ) -> AppResult<ProductResponse> {
        let mut model = products::Entity::find_by_id(product_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?
            .into_active_model();

        if let Some(name) = &request.name {
            model.name = Set(validate_product_name(name)?);
        }
        if let Some(price) = request.price {
            model.price = Set(validate_price(price)?);
        }
        if let Some(description) = request.description {
            model.description = Set(Some(description));
        }
        if let Some(image) = request.image {
            model.image = Set(Some(image));
        }
        if let Some(category) = request.category {
            model.category = Set(Some(category));
        }
        model.updated_at = Set(Utc::now());

        match model.update(&self.pool).await {
            Ok(product) => Ok(product.into()),
            Err(e) if is_unique_violation(&e) => Err(AppError::ValidationError(
                "Product name already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_product(&self, product_id: i64) -> AppResult<()> {
        let result = products::Entity::delete_by_id(product_id)
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Product not found".to_string()));
        }
        Ok(())
    }
}
