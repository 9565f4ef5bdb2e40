use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::db::{self, models::Evaluation};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct EvaluationCreate {
    pub pickup_id: i64,
    pub diagnostics: Option<Value>,
    pub parts_replaced: Option<Value>,
    pub evaluation_cost: Option<f64>,
    pub final_offer: Option<f64>,
    pub notes: Option<String>,
}

/// POST /api/internal/evaluations - evaluator submits an inspection result,
/// which moves the pickup request to 'offered'
pub async fn create_evaluation(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<EvaluationCreate>,
) -> Result<(StatusCode, Json<Evaluation>), ApiError> {
    user.require_evaluator()?;
    let pool = db::pool().await?;

    let mut tx = pool.begin().await?;

    let pickup_exists =
        sqlx::query_scalar::<_, i64>("SELECT id FROM pickup_requests WHERE id = $1")
            .bind(payload.pickup_id)
            .fetch_optional(&mut *tx)
            .await?;
    if pickup_exists.is_none() {
        return Err(ApiError::not_found("Pickup request not found"));
    }

    let evaluation = sqlx::query_as::<_, Evaluation>(
        "INSERT INTO evaluations \
         (pickup_id, tester_id, diagnostics_json, parts_replaced_json, \
          evaluation_cost, final_offer, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(payload.pickup_id)
    .bind(user.id)
    .bind(&payload.diagnostics)
    .bind(&payload.parts_replaced)
    .bind(payload.evaluation_cost)
    .bind(payload.final_offer)
    .bind(&payload.notes)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE pickup_requests SET status = 'offered' WHERE id = $1")
        .bind(payload.pickup_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        pickup_id = payload.pickup_id,
        evaluation_id = evaluation.id,
        "recorded evaluation"
    );

    Ok((StatusCode::CREATED, Json(evaluation)))
}
