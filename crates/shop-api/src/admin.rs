//! Admin handlers: login, product management, sales ledger, monthly closings
//! and product image upload. Everything except login requires the admin role.

use crate::handlers::{shop_error_to_response, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shop_client::{Credentials, ImageUploader};
use shop_core::{
    AuthSession, FieldError, Month, Product, ProductDraft, ProductId, Recaudation, Sale, ShopError,
};
use tokio::sync::MutexGuard;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Lock the auth session and require an admin. A session restored from
/// storage has its role fetched on first use.
async fn admin_session(state: &AppState) -> Result<MutexGuard<'_, AuthSession>, ApiError> {
    let mut auth = state.auth.lock().await;
    if let Some(email) = auth.pending_role_lookup().map(str::to_string) {
        let role = state
            .api
            .fetch_role(&mut auth, &email)
            .await
            .map_err(shop_error_to_response)?;
        info!("Restored session role: {:?}", role);
    }
    auth.require_admin().map_err(shop_error_to_response)?;
    Ok(auth)
}

/// Log in and look up the user's role
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut auth = state.auth.lock().await;
    state
        .api
        .login(&mut auth, &Credentials::new(&request.email, &request.password))
        .await
        .map_err(shop_error_to_response)?;

    let role = state
        .api
        .fetch_role(&mut auth, &request.email)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(serde_json::json!({ "role": role })))
}

pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .auth
        .lock()
        .await
        .logout()
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let auth = admin_session(&state).await?;
    let product = state
        .api
        .create_product(&auth, &draft)
        .await
        .map_err(shop_error_to_response)?;
    info!("Created product {}", product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, ApiError> {
    let auth = admin_session(&state).await?;
    state
        .api
        .update_product(&auth, &ProductId::from(product_id), &draft)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let auth = admin_session(&state).await?;
    state
        .api
        .delete_product(&auth, &ProductId::from(product_id))
        .await
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_sales(State(state): State<AppState>) -> Result<Json<Vec<Sale>>, ApiError> {
    let auth = admin_session(&state).await?;
    state
        .api
        .list_sales(&auth)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn delete_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let auth = admin_session(&state).await?;
    state
        .api
        .delete_sale(&auth, &sale_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_recaudations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Recaudation>>, ApiError> {
    let auth = admin_session(&state).await?;
    state
        .api
        .list_recaudations(&auth)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Close a month: sum its sales and store the total
#[instrument(skip(state))]
pub async fn close_month(
    State(state): State<AppState>,
    Json(month): Json<Month>,
) -> Result<(StatusCode, Json<Recaudation>), ApiError> {
    if month.first_day().is_none() {
        return Err(shop_error_to_response(ShopError::Validation(vec![FieldError {
            field: "month",
            message: format!("{}-{} is not a calendar month", month.year, month.month),
        }])));
    }

    let auth = admin_session(&state).await?;
    let recaudation = state
        .api
        .close_month(&auth, month)
        .await
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(recaudation)))
}

pub async fn delete_recaudation(
    State(state): State<AppState>,
    Path(recaudation_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let auth = admin_session(&state).await?;
    state
        .api
        .delete_recaudation(&auth, &recaudation_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a product image (multipart field `file`) and return its URL
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    drop(admin_session(&state).await?);

    let uploader = ImageUploader::from_api(&state.api).map_err(shop_error_to_response)?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(crate::handlers::ErrorResponse::new(
                format!("Invalid multipart body: {}", e),
                400,
            )),
        )
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(crate::handlers::ErrorResponse::new(
                    format!("Failed to read upload: {}", e),
                    400,
                )),
            )
        })?;

        let url = uploader
            .upload(&file_name, &content_type, bytes.to_vec())
            .await
            .map_err(shop_error_to_response)?;
        return Ok(Json(serde_json::json!({ "secure_url": url })));
    }

    Err(shop_error_to_response(ShopError::Validation(vec![
        FieldError::required("file"),
    ])))
}
