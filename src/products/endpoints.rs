// HTTP endpoints for the /Products group

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::{request_scope, AppState};
use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::products::commands::{
    AddProductCommand, DeleteProductCommand, GetAllProductsRequest, GetProductByIdRequest,
    ToggleInStockProductCommand, UpdateProductCommand,
};
use crate::products::models::ProductResponse;
use crate::response::{ApiResponse, PagedResponse};

/// Handler for POST /Products/add-product
#[utoipa::path(
    post,
    path = "/Products/add-product",
    request_body = AddProductCommand,
    responses(
        (status = 200, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(command): Json<AddProductCommand>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    tracing::debug!("User {} adding product {}", user.user_id, command.name);
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for PUT /Products/update-product
#[utoipa::path(
    put,
    path = "/Products/update-product",
    request_body = UpdateProductCommand,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(command): Json<UpdateProductCommand>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for DELETE /Products/delete-product?id=
#[utoipa::path(
    delete,
    path = "/Products/delete-product",
    params(DeleteProductCommand),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(command): Query<DeleteProductCommand>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for PUT /Products/toggle-in-stock
#[utoipa::path(
    put,
    path = "/Products/toggle-in-stock",
    request_body = ToggleInStockProductCommand,
    responses(
        (status = 200, description = "Stock flag flipped", body = ProductResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn toggle_in_stock(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(command): Json<ToggleInStockProductCommand>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for GET /Products/get-all
/// Supports search, stock and novelty filters plus pagination
#[utoipa::path(
    get,
    path = "/Products/get-all",
    params(GetAllProductsRequest),
    responses(
        (status = 200, description = "One page of products", body = [ProductResponse]),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No products found")
    ),
    tag = "Products"
)]
pub async fn get_all_products(
    State(state): State<AppState>,
    Query(request): Query<GetAllProductsRequest>,
) -> Result<ApiResponse<PagedResponse<ProductResponse>>, ApiError> {
    tracing::debug!("Listing products: {:?}", request);
    request.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(request, ct).await
}

/// Handler for GET /Products/{id}
#[utoipa::path(
    get,
    path = "/Products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    let request = GetProductByIdRequest { id };
    request.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(request, ct).await
}
