//! Canonical roles and the areas each one may open

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Keys searched, in order, for a numeric role id inside an object
const ID_KEYS: [&str; 5] = ["rol_id", "role_id", "id_rol", "rolid", "id"];

/// Keys searched, in order, for a role name inside an object
const NAME_KEYS: [&str; 4] = ["rol", "role", "nombre_rol", "nombre"];

/// Canonical role of a logged-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrador,
    Cajero,
    Bodega,
}

impl Default for Role {
    fn default() -> Self {
        Role::Cajero
    }
}

impl Role {
    /// Role for a numeric id as issued by the API
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Administrador),
            2 => Some(Role::Cajero),
            3 => Some(Role::Bodega),
            _ => None,
        }
    }

    /// Role for a known name or alias, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "administrador" | "admin" | "administrator" => Some(Role::Administrador),
            "caja" | "cajero" => Some(Role::Cajero),
            "bodega" | "almacen" | "warehouse" => Some(Role::Bodega),
            _ => None,
        }
    }

    /// Numeric id as issued by the API
    pub fn id(self) -> i64 {
        match self {
            Role::Administrador => 1,
            Role::Cajero => 2,
            Role::Bodega => 3,
        }
    }

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Role::Administrador => "Administrador",
            Role::Cajero => "Cajero",
            Role::Bodega => "Bodega",
        }
    }

    /// Areas this role may open
    pub fn permissions(self) -> Permissions {
        match self {
            Role::Administrador => Permissions::all(),
            Role::Cajero => Permissions {
                cashier: true,
                ..Permissions::none()
            },
            Role::Bodega => Permissions {
                warehouse: true,
                ..Permissions::none()
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a raw role value to a canonical role.
///
/// Accepts integers, numeric strings, names/aliases, and objects carrying an
/// id (`rol_id`, `role_id`, `id_rol`, `rolid`, `id`) or a name (`rol`,
/// `role`, `nombre_rol`, `nombre`). Anything else yields `default`.
pub fn normalize_role(raw: &Value, default: Role) -> Role {
    match raw {
        Value::Number(n) => n.as_i64().and_then(Role::from_id).unwrap_or(default),
        Value::String(s) => normalize_role_str(s, default),
        Value::Object(obj) => {
            for key in ID_KEYS {
                match obj.get(key) {
                    None | Some(Value::Null) => continue,
                    Some(value) => {
                        if let Some(id) = as_role_id(value) {
                            return Role::from_id(id).unwrap_or(default);
                        }
                        // An id that is not numeric ends the id search.
                        break;
                    }
                }
            }
            NAME_KEYS
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(|name| normalize_role_str(name, default))
                .unwrap_or(default)
        }
        _ => default,
    }
}

fn normalize_role_str(raw: &str, default: Role) -> Role {
    let s = raw.trim();
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(Role::from_id)
            .unwrap_or(default);
    }
    Role::from_name(s).unwrap_or(default)
}

fn as_role_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Area of the application gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Cashier,
    Warehouse,
    Admin,
}

/// Which areas a role may open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub cashier: bool,
    pub warehouse: bool,
    pub admin: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            cashier: true,
            warehouse: true,
            admin: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn allows(&self, area: Area) -> bool {
        match area {
            Area::Cashier => self.cashier,
            Area::Warehouse => self.warehouse,
            Area::Admin => self.admin,
        }
    }

    /// Allowed areas, in navigation order
    pub fn areas(&self) -> Vec<Area> {
        [Area::Cashier, Area::Warehouse, Area::Admin]
            .into_iter()
            .filter(|area| self.allows(*area))
            .collect()
    }
}
