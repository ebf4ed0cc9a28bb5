use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog product as stored
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub in_stock: bool,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
}

/// Filters accepted by the paged product listing
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on name or description
    pub search: Option<String>,
    pub in_stock: Option<bool>,
    pub is_new: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(in_stock) = self.in_stock {
            if product.in_stock != in_stock {
                return false;
            }
        }
        if let Some(is_new) = self.is_new {
            if product.is_new != is_new {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Product shape returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    #[schema(example = "Ceramic Mug")]
    pub name: String,
    pub description: String,
    #[schema(value_type = f64, example = 12.5)]
    pub price: Decimal,
    pub image_url: String,
    pub in_stock: bool,
    pub is_new: bool,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            image_url: product.image_url,
            in_stock: product.in_stock,
            is_new: product.is_new,
        }
    }
}
