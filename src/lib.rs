//! CloudPOS Rust Client Library
//!
//! A Rust client for the CloudPOS point-of-sale API: terminal linking and
//! login, category/product/user management, sales, and a connectivity
//! monitor. Long-running calls go through per-service background dispatchers
//! that report results as channel events, so a UI loop never blocks on I/O.

pub mod api;
pub mod auth;
pub mod categories;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod models;
pub mod money;
pub mod monitor;
pub mod products;
pub mod roles;
pub mod sales;
pub mod users;

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::{ApiClient, ApiTransport};
use crate::auth::Auth;
use crate::categories::{CategoriesService, CategoryEvent};
use crate::config::ClientOptions;
use crate::error::Result;
use crate::monitor::{ApiMonitor, MonitorEvent};
use crate::products::{ProductEvent, ProductsService};
use crate::roles::{Permissions, Role};
use crate::sales::{SaleEvent, SalesService};
use crate::users::{UserEvent, UsersService};

/// The main entry point for the CloudPOS client
pub struct CloudPos {
    /// HTTP client shared by every service
    client: ApiClient,
    /// Linking and login
    auth: Auth,
    /// Client options
    options: ClientOptions,
}

impl CloudPos {
    /// Create a new CloudPOS client
    ///
    /// # Example
    ///
    /// ```
    /// use cloudpos_client::{CloudPos, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_base_url("http://localhost:8000");
    /// let pos = CloudPos::new(options).unwrap();
    /// assert_eq!(pos.api_client().base_url(), "http://localhost:8000");
    /// ```
    pub fn new(options: ClientOptions) -> Result<Self> {
        let client = ApiClient::new(&options)?;
        let auth = Auth::new(client.clone());
        Ok(Self {
            client,
            auth,
            options,
        })
    }

    /// Create a client configured from the `CLOUDPOS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env())
    }

    /// Linking and login
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn api_client(&self) -> &ApiClient {
        &self.client
    }

    fn transport(&self) -> Arc<dyn ApiTransport> {
        Arc::new(self.client.clone())
    }

    /// Areas the given role may open, honoring `show_all`
    pub fn permissions(&self, role: Role) -> Permissions {
        if self.options.show_all {
            Permissions::all()
        } else {
            role.permissions()
        }
    }

    /// A category service and the receiver its events arrive on
    pub fn categories(&self) -> (CategoriesService, UnboundedReceiver<CategoryEvent>) {
        CategoriesService::new(self.transport())
    }

    /// A product service and the receiver its events arrive on
    pub fn products(&self) -> (ProductsService, UnboundedReceiver<ProductEvent>) {
        ProductsService::new(self.transport())
    }

    /// A user service and the receiver its events arrive on
    pub fn users(&self) -> (UsersService, UnboundedReceiver<UserEvent>) {
        UsersService::new(self.transport())
    }

    /// A sales service and the receiver its events arrive on
    pub fn sales(&self) -> (SalesService, UnboundedReceiver<SaleEvent>) {
        SalesService::new(self.transport())
    }

    /// A connectivity monitor using the configured interval; call
    /// [`ApiMonitor::start`] to begin pinging
    pub fn monitor(&self) -> (ApiMonitor, UnboundedReceiver<MonitorEvent>) {
        ApiMonitor::new(self.transport(), self.options.monitor_interval)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::api::{ApiClient, ApiResponse, ApiTransport};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::models::{Category, NewUser, Product, Sale, User};
    pub use crate::roles::{Area, Role};
    pub use crate::CloudPos;
}
