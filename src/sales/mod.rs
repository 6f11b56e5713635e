//! Sales: the cashier cart and the sales endpoints

mod cart;

use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::ApiTransport;
use crate::dispatch::{DispatchEvent, Dispatcher};
use crate::error::{Error, Result};
use crate::models::Sale;

pub use cart::*;

/// Notifications emitted by [`SalesService`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaleEvent {
    Busy(bool),
    Registered(String),
    /// Sales as returned by `/ListadoVentas`; the shape is left to the caller
    Listed(Vec<Value>),
    Error(String),
}

impl DispatchEvent for SaleEvent {
    fn busy(busy: bool) -> Self {
        SaleEvent::Busy(busy)
    }

    fn failed(message: String) -> Self {
        SaleEvent::Error(message)
    }
}

/// POST `/ventas`
pub async fn register_sale(api: &dyn ApiTransport, sale: &Sale) -> Result<String> {
    if sale.items.is_empty() {
        return Err(Error::validation("El carrito está vacío."));
    }
    let response = api
        .post_json("/ventas", serde_json::to_value(sale)?)
        .await?
        .check()?;
    Ok(response.message(&["message", "detail"], "Venta registrada"))
}

/// GET `/ListadoVentas`
pub async fn fetch_sales(api: &dyn ApiTransport) -> Result<Vec<Value>> {
    let response = api.get_json("/ListadoVentas").await?.check()?;
    Ok(match response.into_value() {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("ventas") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    })
}

/// Background sales operations, one at a time
pub struct SalesService {
    api: Arc<dyn ApiTransport>,
    dispatcher: Dispatcher<SaleEvent>,
}

impl SalesService {
    /// Create the service and the receiver its events arrive on
    pub fn new(api: Arc<dyn ApiTransport>) -> (Self, UnboundedReceiver<SaleEvent>) {
        let (dispatcher, events) = Dispatcher::channel("sales");
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

    pub fn register(&self, sale: Sale) -> bool {
        let api = self.api.clone();
        self.dispatcher.dispatch(
            async move { register_sale(api.as_ref(), &sale).await },
            SaleEvent::Registered,
        )
    }

    pub fn list(&self) -> bool {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(async move { fetch_sales(api.as_ref()).await }, SaleEvent::Listed)
    }
}
