use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;

use crate::db::{self, models::Product};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
}

/// GET /api/products - list products, optionally narrowed by category/brand
pub async fn list(Query(query): Query<ListQuery>) -> Result<Json<Vec<Product>>, ApiError> {
    let pool = db::pool().await?;

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products \
         WHERE ($1::BIGINT IS NULL OR category_id = $1) \
           AND ($2::BIGINT IS NULL OR brand_id = $2) \
         ORDER BY id",
    )
    .bind(query.category_id)
    .bind(query.brand_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(products))
}

/// GET /api/products/:id - fetch a single product
pub async fn get(Path(product_id): Path<i64>) -> Result<Json<Product>, ApiError> {
    let pool = db::pool().await?;

    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    Ok(Json(product))
}
