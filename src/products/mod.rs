// Product catalog module
// Models, commands, handlers and HTTP endpoints for the CRUD surface

pub mod commands;
pub mod endpoints;
pub mod handlers;
pub mod models;

pub use commands::{
    AddProductCommand, DeleteProductCommand, GetAllProductsRequest, GetProductByIdRequest,
    ToggleInStockProductCommand, UpdateProductCommand,
};
pub use models::{Product, ProductFilter, ProductResponse};
