// Request handlers for the product catalog
//
// Each handler opens its own unit of work, performs one piece of business
// logic and maps the result onto the response envelope.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::mediator::{until_cancelled, RequestHandler};
use crate::persistence::UnitOfWorkFactory;
use crate::products::commands::{
    AddProductCommand, DeleteProductCommand, GetAllProductsRequest, GetProductByIdRequest,
    ToggleInStockProductCommand, UpdateProductCommand,
};
use crate::products::models::{Product, ProductResponse};
use crate::response::{ApiResponse, PagedResponse};

pub const PRODUCT_NOT_FOUND: &str = "Product not found";
pub const NO_PRODUCTS_FOUND: &str = "No products found";

pub struct AddProductHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl AddProductHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler<AddProductCommand> for AddProductHandler {
    async fn handle(
        &self,
        request: AddProductCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<ProductResponse>, ApiError> {
        until_cancelled(&ct, async {
            let uow = self.uow.begin().await?;
            let product = Product {
                id: Uuid::new_v4(),
                name: request.name.trim().to_string(),
                description: request.description,
                price: request.price,
                image_url: request.image_url,
                in_stock: request.in_stock,
                is_new: request.is_new,
                created_at: Utc::now(),
            };

            let added = uow.products().add(product).await?;
            uow.save_changes().await?;

            info!("Product created: id={}", added.id);
            Ok(ApiResponse::success(
                Some(ProductResponse::from(added)),
                "Product Added Successfully",
            ))
        })
        .await
    }
}

pub struct UpdateProductHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl UpdateProductHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler<UpdateProductCommand> for UpdateProductHandler {
    async fn handle(
        &self,
        request: UpdateProductCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<ProductResponse>, ApiError> {
        until_cancelled(&ct, async {
            let uow = self.uow.begin().await?;
            let Some(mut product) = uow.products().get_by_id(request.id).await? else {
                debug!("Update skipped, product {} not found", request.id);
                return Ok(ApiResponse::not_found(PRODUCT_NOT_FOUND));
            };

            product.name = request.name.trim().to_string();
            product.description = request.description;
            product.price = request.price;
            product.image_url = request.image_url;
            product.in_stock = request.in_stock;
            product.is_new = request.is_new;

            let updated = uow.products().update(product).await?;
            uow.save_changes().await?;

            info!("Product updated: id={}", updated.id);
            Ok(ApiResponse::success(
                Some(ProductResponse::from(updated)),
                "Product Updated Successfully",
            ))
        })
        .await
    }
}

pub struct DeleteProductHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl DeleteProductHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler<DeleteProductCommand> for DeleteProductHandler {
    async fn handle(
        &self,
        request: DeleteProductCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<ProductResponse>, ApiError> {
        until_cancelled(&ct, async {
            let uow = self.uow.begin().await?;
            let Some(product) = uow.products().get_by_id(request.id).await? else {
                return Ok(ApiResponse::not_found(PRODUCT_NOT_FOUND));
            };

            uow.products().delete(&product).await?;
            uow.save_changes().await?;

            info!("Product deleted: id={}", product.id);
            Ok(ApiResponse::success(None, "Product Deleted Successfully"))
        })
        .await
    }
}

pub struct ToggleInStockProductHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl ToggleInStockProductHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler<ToggleInStockProductCommand> for ToggleInStockProductHandler {
    async fn handle(
        &self,
        request: ToggleInStockProductCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<ProductResponse>, ApiError> {
        until_cancelled(&ct, async {
            let uow = self.uow.begin().await?;
            let Some(mut product) = uow.products().get_by_id(request.id).await? else {
                return Ok(ApiResponse::not_found(PRODUCT_NOT_FOUND));
            };

            product.in_stock = !product.in_stock;
            let updated = uow.products().update(product).await?;
            uow.save_changes().await?;

            info!("Product {} in_stock set to {}", updated.id, updated.in_stock);
            Ok(ApiResponse::success(
                Some(ProductResponse::from(updated)),
                "Product Stock Status Updated Successfully",
            ))
        })
        .await
    }
}

pub struct GetProductByIdHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl GetProductByIdHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler<GetProductByIdRequest> for GetProductByIdHandler {
    async fn handle(
        &self,
        request: GetProductByIdRequest,
        ct: CancellationToken,
    ) -> Result<ApiResponse<ProductResponse>, ApiError> {
        until_cancelled(&ct, async {
            let uow = self.uow.begin().await?;
            match uow.products().get_by_id(request.id).await? {
                Some(product) => Ok(ApiResponse::success(
                    Some(ProductResponse::from(product)),
                    "Product Retrieved Successfully",
                )),
                None => Ok(ApiResponse::not_found(PRODUCT_NOT_FOUND)),
            }
        })
        .await
    }
}

pub struct GetAllProductsHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl GetAllProductsHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler<GetAllProductsRequest> for GetAllProductsHandler {
    async fn handle(
        &self,
        request: GetAllProductsRequest,
        ct: CancellationToken,
    ) -> Result<ApiResponse<PagedResponse<ProductResponse>>, ApiError> {
        until_cancelled(&ct, async {
            let page = request.page();
            let page_size = request.size();

            let uow = self.uow.begin().await?;
            let result = uow
                .products()
                .get_paged(&request.filter(), page, page_size)
                .await?;

            if result.items.is_empty() {
                debug!("No products on page {} (size {})", page, page_size);
                return Ok(ApiResponse::not_found(NO_PRODUCTS_FOUND));
            }

            let items = result.items.into_iter().map(ProductResponse::from).collect();
            Ok(ApiResponse::success(
                Some(PagedResponse::new(items, page, page_size, result.total_count)),
                "Products Retrieved Successfully",
            ))
        })
        .await
    }
}
