use std::{net::SocketAddr, sync::Arc};

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde_json::error::Category;
use tracing::info;

use crate::{
    error::RedeemError,
    executor::{RedemptionExecutor, SpendRequest, SpendResponse},
};

pub fn router(executor: Arc<RedemptionExecutor>) -> Router {
    Router::new()
        .route("/spend", post(handle_spend))
        .with_state(executor)
}

/// `POST /spend`. The body is parsed by hand so malformed JSON gets the same error shape.
pub async fn handle_spend(
    State(executor): State<Arc<RedemptionExecutor>>,
    body: Bytes,
) -> Result<Json<SpendResponse>, RedeemError> {
    info!(bytes = body.len(), "POST /spend");
    let request: SpendRequest = serde_json::from_slice(&body).map_err(|e| match e.classify() {
        Category::Data => RedeemError::InvalidRequest(format!("request body must be a JSON object: {e}")),
        _ => RedeemError::InvalidRequest(format!("request body is not valid JSON: {e}")),
    })?;
    let receipt = executor.redeem_request(request).await?;
    Ok(Json(receipt.into()))
}

pub async fn serve(executor: Arc<RedemptionExecutor>, addr: SocketAddr) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, manager = %executor.config().manager, "spend executor listening");
    axum::serve(listener, router(executor))
        .await
        .context("spend executor server error")?;
    Ok(())
}
