//! User account management

use chrono::Local;
use md5::{Digest, Md5};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::ApiTransport;
use crate::dispatch::{DispatchEvent, Dispatcher};
use crate::error::{Error, Result};
use crate::models::{decode_items, NewUser, User};

/// Notifications emitted by [`UsersService`]
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    Busy(bool),
    Listed(Vec<User>),
    Created(String),
    Updated(String),
    Error(String),
}

impl DispatchEvent for UserEvent {
    fn busy(busy: bool) -> Self {
        UserEvent::Busy(busy)
    }

    fn failed(message: String) -> Self {
        UserEvent::Error(message)
    }
}

/// Lowercase hex MD5 digest, the form the API stores passwords in
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Md5::digest(password.as_bytes()))
}

/// Decode `/usuarios`: `{"usuario": [...]}` or a bare array
pub fn parse_users(data: Value) -> Result<Vec<User>> {
    let items = match data {
        Value::Object(mut obj) if obj.contains_key("usuario") => match obj.remove("usuario") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(Error::general("Formato de respuesta inesperado.")),
        },
        Value::Array(items) => items,
        _ => return Err(Error::general("Formato de respuesta inesperado.")),
    };
    Ok(decode_items("users", items))
}

/// GET `/usuarios`
pub async fn fetch_users(api: &dyn ApiTransport) -> Result<Vec<User>> {
    let response = api.get_json("/usuarios").await?.check()?;
    parse_users(response.into_value())
}

/// POST `/usuario`. The password leaves this function hashed.
pub async fn create_user(api: &dyn ApiTransport, user: &NewUser) -> Result<String> {
    let name = user.name.trim();
    if name.is_empty() || user.password.is_empty() {
        return Err(Error::validation("Nombre y contraseña son obligatorios."));
    }
    let payload = json!({
        "nombre": name,
        "contrasena": hash_password(&user.password),
        "rol_id": user.role.id(),
        "fecha": Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    });
    api.post_json("/usuario", payload)
        .await?
        .check_or("No se pudo crear el usuario.")?;
    Ok("Usuario creado correctamente.".to_string())
}

/// PUT `/usuarios/{id}/nombre`
pub async fn rename_user(api: &dyn ApiTransport, user_id: i64, name: &str) -> Result<String> {
    let name = name.trim();
    if user_id <= 0 {
        return Err(Error::validation("Selecciona un usuario primero."));
    }
    if name.is_empty() {
        return Err(Error::validation("El nombre es obligatorio."));
    }
    api.put_json(&format!("/usuarios/{}/nombre", user_id), json!({ "nombre": name }))
        .await?
        .check_or("No se pudo actualizar el nombre.")?;
    Ok("Nombre actualizado.".to_string())
}

/// PUT `/usuarios/{id}/contrasena`
pub async fn change_user_password(api: &dyn ApiTransport, user_id: i64, password: &str) -> Result<String> {
    if user_id <= 0 {
        return Err(Error::validation("Selecciona un usuario primero."));
    }
    if password.is_empty() {
        return Err(Error::validation("La contraseña es obligatoria."));
    }
    api.put_json(
        &format!("/usuarios/{}/contrasena", user_id),
        json!({ "contrasena": hash_password(password) }),
    )
    .await?
    .check_or("No se pudo actualizar la contraseña.")?;
    Ok("Contraseña actualizada.".to_string())
}

/// Background user operations, one at a time
pub struct UsersService {
    api: Arc<dyn ApiTransport>,
    dispatcher: Dispatcher<UserEvent>,
}

impl UsersService {
    /// Create the service and the receiver its events arrive on
    pub fn new(api: Arc<dyn ApiTransport>) -> (Self, UnboundedReceiver<UserEvent>) {
        let (dispatcher, events) = Dispatcher::channel("users");
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

    pub fn list(&self) -> bool {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(async move { fetch_users(api.as_ref()).await }, UserEvent::Listed)
    }

    pub fn create(&self, user: NewUser) -> bool {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(async move { create_user(api.as_ref(), &user).await }, UserEvent::Created)
    }

    pub fn rename(&self, user_id: i64, name: &str) -> bool {
        let api = self.api.clone();
        let name = name.to_string();
        self.dispatcher.dispatch(
            async move { rename_user(api.as_ref(), user_id, &name).await },
            UserEvent::Updated,
        )
    }

    pub fn change_password(&self, user_id: i64, password: &str) -> bool {
        let api = self.api.clone();
        let password = password.to_string();
        self.dispatcher.dispatch(
            async move { change_user_password(api.as_ref(), user_id, &password).await },
            UserEvent::Updated,
        )
    }
}
