//! Category management

use log::debug;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::ApiTransport;
use crate::dispatch::{DispatchEvent, Dispatcher};
use crate::error::{Error, Result};
use crate::models::{decode_items, Category};

/// Longest accepted category name, in characters
pub const MAX_NAME_LEN: usize = 80;

/// Notifications emitted by [`CategoriesService`]
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryEvent {
    Busy(bool),
    Loaded(Vec<Category>),
    Created(String),
    Deleted(String),
    Error(String),
}

impl DispatchEvent for CategoryEvent {
    fn busy(busy: bool) -> Self {
        CategoryEvent::Busy(busy)
    }

    fn failed(message: String) -> Self {
        CategoryEvent::Error(message)
    }
}

/// Trimmed category name, or the reason it is not acceptable
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("La categoría es obligatoria."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "La categoría no debe exceder {} caracteres.",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Decode a category listing: either a bare array or `{"categorias": [...]}`
pub fn parse_categories(data: Value) -> Result<Vec<Category>> {
    let items = match data {
        Value::Object(mut obj) => match obj.remove("categorias") {
            Some(Value::Array(items)) => items,
            None => Vec::new(),
            Some(_) => return Err(Error::validation("Formato inválido: 'categorias' no es lista")),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    Ok(decode_items("categories", items))
}

/// GET `/categorias`
pub async fn fetch_categories(api: &dyn ApiTransport) -> Result<Vec<Category>> {
    let response = api.get_json("/categorias").await?.check()?;
    let items = parse_categories(response.into_value())?;
    debug!("[categories] received {}", items.len());
    Ok(items)
}

/// POST `/categorias`
pub async fn create_category(api: &dyn ApiTransport, name: &str) -> Result<String> {
    let name = validate_name(name)?;
    let response = api
        .post_json("/categorias", json!({ "categoria": name }))
        .await?
        .check()?;
    Ok(response.message(&["message", "detail", "categoria"], "Categoría creada"))
}

/// DELETE `/categorias/{id}`
pub async fn delete_category(api: &dyn ApiTransport, category_id: i64) -> Result<String> {
    if category_id <= 0 {
        return Err(Error::validation("ID de categoría inválido."));
    }
    let response = api
        .delete_json(&format!("/categorias/{}", category_id))
        .await?
        .check()?;
    Ok(response.message(&["message", "detail"], "Categoría eliminada"))
}

/// Background category operations, one at a time
pub struct CategoriesService {
    api: Arc<dyn ApiTransport>,
    dispatcher: Dispatcher<CategoryEvent>,
}

impl CategoriesService {
    /// Create the service and the receiver its events arrive on
    pub fn new(api: Arc<dyn ApiTransport>) -> (Self, UnboundedReceiver<CategoryEvent>) {
        let (dispatcher, events) = Dispatcher::channel("categories");
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

    /// Load every category. Emits [`CategoryEvent::Loaded`].
    pub fn load(&self) -> bool {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(async move { fetch_categories(api.as_ref()).await }, CategoryEvent::Loaded)
    }

    /// Create a category. Emits [`CategoryEvent::Created`].
    pub fn create(&self, name: &str) -> bool {
        let api = self.api.clone();
        let name = name.to_string();
        self.dispatcher.dispatch(
            async move { create_category(api.as_ref(), &name).await },
            CategoryEvent::Created,
        )
    }

    /// Delete a category. Emits [`CategoryEvent::Deleted`].
    pub fn delete(&self, category_id: i64) -> bool {
        let api = self.api.clone();
        self.dispatcher.dispatch(
            async move { delete_category(api.as_ref(), category_id).await },
            CategoryEvent::Deleted,
        )
    }
}
