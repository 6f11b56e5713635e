//! Product catalog management

use log::debug;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::ApiTransport;
use crate::dispatch::{DispatchEvent, Dispatcher};
use crate::error::{Error, Result};
use crate::models::{decode_items, Product};

/// Notifications emitted by [`ProductsService`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProductEvent {
    Busy(bool),
    Loaded(Vec<Product>),
    Created(String),
    Updated { product_id: i64, message: String },
    CategoryChanged { product_id: i64, message: String },
    Deleted(String),
    Error(String),
}

impl DispatchEvent for ProductEvent {
    fn busy(busy: bool) -> Self {
        ProductEvent::Busy(busy)
    }

    fn failed(message: String) -> Self {
        ProductEvent::Error(message)
    }
}

/// Payload for POST `/producto/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    #[serde(rename = "nombre")]
    pub name: String,
    pub categoria_id: i64,
    #[serde(rename = "precio")]
    pub price: i64,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
}

impl NewProduct {
    pub fn new(name: &str, category_id: i64, price: i64, quantity: i64) -> Self {
        Self {
            name: name.trim().to_string(),
            categoria_id: category_id,
            price,
            quantity,
        }
    }

    /// Check the preconditions enforced before anything is sent
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("El nombre es obligatorio."));
        }
        if self.categoria_id <= 0 {
            return Err(Error::validation("Selecciona una categoría válida."));
        }
        validate_price_and_quantity(self.price, self.quantity)
    }
}

fn validate_product_id(product_id: i64) -> Result<()> {
    if product_id <= 0 {
        return Err(Error::validation("Producto inválido."));
    }
    Ok(())
}

fn validate_price_and_quantity(price: i64, quantity: i64) -> Result<()> {
    if price <= 0 {
        return Err(Error::validation("El precio debe ser mayor a 0."));
    }
    if quantity < 0 {
        return Err(Error::validation("La cantidad no puede ser negativa."));
    }
    Ok(())
}

/// Decode a product listing: a bare array or `{"productos": [...]}`.
/// Anything else is an empty catalog.
pub fn parse_products(data: Value) -> Result<Vec<Product>> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("productos") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(decode_items("products", items))
}

/// GET `/productos`
pub async fn fetch_products(api: &dyn ApiTransport) -> Result<Vec<Product>> {
    let response = api.get_json("/productos").await?.check()?;
    let items = parse_products(response.into_value())?;
    debug!("[products] received {}", items.len());
    Ok(items)
}

/// POST `/producto/`
pub async fn create_product(api: &dyn ApiTransport, product: &NewProduct) -> Result<String> {
    product.validate()?;
    let response = api
        .post_json("/producto/", serde_json::to_value(product)?)
        .await?
        .check()?;
    Ok(response.message(&["message", "detail"], "Producto creado"))
}

/// PUT `/producto/{id}/`
pub async fn update_product(
    api: &dyn ApiTransport,
    product_id: i64,
    price: i64,
    quantity: i64,
) -> Result<String> {
    validate_product_id(product_id)?;
    validate_price_and_quantity(price, quantity)?;
    let response = api
        .put_json(
            &format!("/producto/{}/", product_id),
            json!({ "precio": price, "cantidad": quantity }),
        )
        .await?
        .check()?;
    Ok(response.message(&["message", "detail"], "Producto actualizado"))
}

/// PUT `/producto/{id}/categoria`
pub async fn change_product_category(
    api: &dyn ApiTransport,
    product_id: i64,
    category_id: i64,
) -> Result<String> {
    validate_product_id(product_id)?;
    if category_id <= 0 {
        return Err(Error::validation("Selecciona una categoría válida."));
    }
    let response = api
        .put_json(
            &format!("/producto/{}/categoria", product_id),
            json!({ "categoria_id": category_id }),
        )
        .await?
        .check()?;
    Ok(response.message(&["message", "detail"], "Categoría actualizada"))
}

/// DELETE `/producto/{id}/`
pub async fn delete_product(api: &dyn ApiTransport, product_id: i64) -> Result<String> {
    validate_product_id(product_id)?;
    let response = api
        .delete_json(&format!("/producto/{}/", product_id))
        .await?
        .check()?;
    Ok(response.message(&["message", "detail"], "Producto eliminado"))
}

/// Background product operations, one at a time
pub struct ProductsService {
    api: Arc<dyn ApiTransport>,
    dispatcher: Dispatcher<ProductEvent>,
}

impl ProductsService {
    /// Create the service and the receiver its events arrive on
    pub fn new(api: Arc<dyn ApiTransport>) -> (Self, UnboundedReceiver<ProductEvent>) {
        let (dispatcher, events) = Dispatcher::channel("products");
        (Self { api, dispatcher }, events)
    }

    /// Spawn work on `handle` instead of the ambient runtime
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.dispatcher = self.dispatcher.with_runtime(handle);
        self
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    /// Load the catalog. Emits [`ProductEvent::Loaded`].
    pub fn load(&self) -> bool {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(async move { fetch_products(api.as_ref()).await }, ProductEvent::Loaded)
    }

    /// Create a product. Emits [`ProductEvent::Created`].
    pub fn create(&self, product: NewProduct) -> bool {
        let api = self.api.clone();
        self.dispatcher.dispatch(
            async move { create_product(api.as_ref(), &product).await },
            ProductEvent::Created,
        )
    }

    /// Change price and stock. Emits [`ProductEvent::Updated`].
    pub fn update(&self, product_id: i64, price: i64, quantity: i64) -> bool {
        let api = self.api.clone();
        self.dispatcher.dispatch(
            async move { update_product(api.as_ref(), product_id, price, quantity).await },
            move |message| ProductEvent::Updated {
                product_id,
                message,
            },
        )
    }

    /// Move a product to another category. Emits [`ProductEvent::CategoryChanged`].
    pub fn change_category(&self, product_id: i64, category_id: i64) -> bool {
        let api = self.api.clone();
        self.dispatcher.dispatch(
            async move { change_product_category(api.as_ref(), product_id, category_id).await },
            move |message| ProductEvent::CategoryChanged {
                product_id,
                message,
            },
        )
    }

    /// Delete a product. Emits [`ProductEvent::Deleted`].
    pub fn delete(&self, product_id: i64) -> bool {
        let api = self.api.clone();
        self.dispatcher.dispatch(
            async move { delete_product(api.as_ref(), product_id).await },
            ProductEvent::Deleted,
        )
    }
}
