// Product commands and queries with their validation rules

use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::mediator::Request;
use crate::products::models::{ProductFilter, ProductResponse};
use crate::response::{ApiResponse, PagedResponse};
use crate::validation::{validate_not_blank, validate_not_nil, validate_positive_price};

/// Create a product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddProductCommand {
    #[validate(
        custom = "validate_not_blank",
        length(max = 100, message = "Name must be at most 100 characters.")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters."))]
    pub description: String,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = f64, example = 12.5)]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub is_new: bool,
}

impl Request for AddProductCommand {
    type Response = ApiResponse<ProductResponse>;
}

/// Replace the editable fields of an existing product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductCommand {
    #[validate(custom = "validate_not_nil")]
    pub id: Uuid,
    #[validate(
        custom = "validate_not_blank",
        length(max = 100, message = "Name must be at most 100 characters.")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters."))]
    pub description: String,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = f64, example = 12.5)]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub is_new: bool,
}

impl Request for UpdateProductCommand {
    type Response = ApiResponse<ProductResponse>;
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeleteProductCommand {
    #[validate(custom = "validate_not_nil")]
    pub id: Uuid,
}

impl Request for DeleteProductCommand {
    type Response = ApiResponse<ProductResponse>;
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleInStockProductCommand {
    #[validate(custom = "validate_not_nil")]
    pub id: Uuid,
}

impl Request for ToggleInStockProductCommand {
    type Response = ApiResponse<ProductResponse>;
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GetProductByIdRequest {
    #[validate(custom = "validate_not_nil")]
    pub id: Uuid,
}

impl Request for GetProductByIdRequest {
    type Response = ApiResponse<ProductResponse>;
}

/// Paged, filtered product listing
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GetAllProductsRequest {
    #[serde(default)]
    #[validate(range(min = 1, message = "Page number must be greater than 0."))]
    pub page_number: i32,
    #[serde(default)]
    #[validate(range(min = 1, message = "Page size must be greater than 0."))]
    pub page_size: i32,
    pub in_stock: Option<bool>,
    #[validate(length(max = 50, message = "Search string must be less than 50 characters."))]
    pub search: Option<String>,
    pub is_new: Option<bool>,
}

impl GetAllProductsRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Page number, falling back to 1 when not positive
    pub fn page(&self) -> u32 {
        u32::try_from(self.page_number).ok().filter(|p| *p > 0).unwrap_or(1)
    }

    /// Page size, falling back to the default when not positive
    pub fn size(&self) -> u32 {
        u32::try_from(self.page_size)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
    }

    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            search: self.search.clone(),
            in_stock: self.in_stock,
            is_new: self.is_new,
        }
    }
}

impl Request for GetAllProductsRequest {
    type Response = ApiResponse<PagedResponse<ProductResponse>>;
}
