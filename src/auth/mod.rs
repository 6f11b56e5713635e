//! Client linking and user login

mod session;

use chrono::Local;
use log::{debug, info};
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::api::{ApiClient, ApiResponse};
use crate::dispatch::BusyFlag;
use crate::error::{Error, Result};
use crate::roles::{normalize_role, Role};
use crate::users::hash_password;

pub use session::*;

/// Keys the login reply may carry the session token under
const TOKEN_KEYS: [&str; 8] = [
    "token",
    "access_token",
    "auth_token",
    "jwt",
    "bearer",
    "authorization",
    "Authorization",
    "token_login",
];

/// Keys the login reply may carry the role under
const ROLE_KEYS: [&str; 6] = ["rol_id", "role_id", "id_rol", "rolid", "role", "rol"];

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user: String,
    pub role: Role,
}

/// Client for linking this terminal and logging users in
#[derive(Clone)]
pub struct Auth {
    client: ApiClient,
    pending: BusyFlag,
}

impl Auth {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            pending: BusyFlag::default(),
        }
    }

    /// The session this client writes tokens into
    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    /// Link this terminal with `/vincular`. The returned link token is also
    /// kept in the session; it is required by [`login`](Self::login).
    pub async fn link(&self, email: &str, code: &str) -> Result<String> {
        let (email, code) = (email.trim(), code.trim());
        if email.is_empty() || code.is_empty() {
            return Err(Error::validation("Debes ingresar Correo y Código."));
        }

        let payload = json!({
            "correo": email,
            "codigo": code,
            "fecha": Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        });
        let response = self
            .client
            .request_with_token(Method::POST, "/vincular", Some(&payload), None)
            .await?;

        if let Some(failure) = response.failure() {
            let message = failure.message_or_else(|status| format!("HTTP {}", status));
            return Err(Error::auth(format!("Error al vincular: {}", message)));
        }

        let token = response
            .json()
            .and_then(|v| v.get("token_vinculacion"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::auth("La API no entregó un token de vinculación."))?
            .to_string();

        self.session().set_link_token(&token);
        info!("terminal linked");
        Ok(token)
    }

    /// Log in with `/login`, authorized by the link token.
    ///
    /// On success the session token and role are stored in the session.
    pub async fn login(&self, user: &str, password: &str) -> Result<LoginOutcome> {
        let Some(_guard) = self.pending.try_acquire() else {
            return Err(Error::auth("Ya hay una autenticación en curso. Espera un momento…"));
        };

        let link_token = self
            .session()
            .link_token()
            .ok_or_else(|| Error::auth("Falta token de vinculación. Vincula el cliente primero."))?;

        let user = user.trim();
        if user.is_empty() {
            return Err(Error::validation("Ingresa tu usuario."));
        }
        if password.is_empty() {
            return Err(Error::validation("Ingresa tu contraseña."));
        }

        let payload = json!({ "nombre": user, "contrasena": hash_password(password) });
        let response = self
            .client
            .request_with_token(Method::POST, "/login", Some(&payload), Some(&link_token))
            .await?;

        let outcome = interpret_login(user, &response)?;
        let token = find_token(&response)
            .ok_or_else(|| Error::auth("El inicio de sesión no entregó token de sesión."))?;

        self.session().start(&token, &outcome.user, outcome.role);
        info!("logged in as {} ({})", outcome.user, outcome.role);
        Ok(outcome)
    }

    /// Forget the session token
    pub fn logout(&self) {
        debug!("session closed");
        self.session().end();
    }

    /// Whether a login is in flight
    pub fn is_pending(&self) -> bool {
        self.pending.is_set()
    }
}

fn interpret_login(user: &str, response: &ApiResponse) -> Result<LoginOutcome> {
    if let Some(failure) = response.failure() {
        if failure.status == 0 {
            return Err(Error::api(0, failure.message_or_else(|_| "Error de red".to_string())));
        }
        if failure.status == 401 || failure.status == 403 {
            return Err(Error::auth(
                "Token de vinculación inválido o expirado. Vuelve a vincular e inténtalo nuevamente.",
            ));
        }
        let message = failure.message_or_else(|status| match status {
            400 | 401 | 403 => "Usuario o contraseña incorrectos.".to_string(),
            _ => format!("Error HTTP {}", status),
        });
        return Err(Error::api(failure.status, message));
    }

    let role_raw = match response {
        ApiResponse::Text(text) => Value::String(text.clone()),
        ApiResponse::Json(Value::Object(obj)) => find_role(obj)
            .or_else(|| {
                ["user", "usuario", "data"]
                    .iter()
                    .filter_map(|key| obj.get(*key))
                    .find_map(|nested| nested.as_object())
                    .and_then(find_role)
            })
            .unwrap_or(Value::Null),
        _ => Value::Null,
    };

    Ok(LoginOutcome {
        user: user.to_string(),
        role: normalize_role(&role_raw, Role::Cajero),
    })
}

fn find_role(obj: &Map<String, Value>) -> Option<Value> {
    ROLE_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| !v.is_null())
        .cloned()
}

fn find_token(response: &ApiResponse) -> Option<String> {
    let obj = response.json()?.as_object()?;
    token_in(obj).or_else(|| obj.get("data").and_then(Value::as_object).and_then(token_in))
}

fn token_in(obj: &Map<String, Value>) -> Option<String> {
    TOKEN_KEYS.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiFailure;

    #[test]
    fn test_token_lookup() {
        let top = ApiResponse::Json(json!({"access_token": "abc"}));
        assert_eq!(find_token(&top).as_deref(), Some("abc"));

        let nested = ApiResponse::Json(json!({"token": "", "data": {"jwt": "xyz"}}));
        assert_eq!(find_token(&nested).as_deref(), Some("xyz"));

        assert_eq!(find_token(&ApiResponse::Json(json!({"ok": true}))), None);
        assert_eq!(find_token(&ApiResponse::Text("abc".to_string())), None);
    }

    #[test]
    fn test_role_lookup() {
        let top = ApiResponse::Json(json!({"token": "t", "rol_id": 3}));
        assert_eq!(interpret_login("ana", &top).unwrap().role, Role::Bodega);

        let nested = ApiResponse::Json(json!({"token": "t", "usuario": {"rol": "admin"}}));
        assert_eq!(interpret_login("ana", &nested).unwrap().role, Role::Administrador);

        let missing = ApiResponse::Json(json!({"token": "t"}));
        assert_eq!(interpret_login("ana", &missing).unwrap().role, Role::Cajero);
    }

    #[test]
    fn test_login_failures() {
        let unauthorized = ApiResponse::from_error_body(401, "", Some("Unauthorized"));
        assert!(matches!(interpret_login("ana", &unauthorized), Err(Error::Auth(_))));

        let bad = ApiResponse::from_error_body(400, r#"{"foo": 1}"#, None);
        assert_eq!(
            interpret_login("ana", &bad).unwrap_err().to_string(),
            "Usuario o contraseña incorrectos."
        );

        let flagged = ApiResponse::Json(json!({"error": true, "message": "Usuario bloqueado"}));
        assert_eq!(
            interpret_login("ana", &flagged).unwrap_err().to_string(),
            "Usuario bloqueado"
        );

        let offline = ApiResponse::Failure(ApiFailure::transport("connection refused"));
        assert_eq!(interpret_login("ana", &offline).unwrap_err().status(), Some(0));
    }
}
