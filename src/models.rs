//! Entities exchanged with the CloudPOS API.
//!
//! The API uses Spanish field names and is loose about numeric types, so
//! decoding goes through the lenient helpers in [`lenient`].

use chrono::NaiveDateTime;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::roles::{normalize_role, Role};

/// Product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,

    #[serde(rename = "categoria", alias = "nombre", default, deserialize_with = "lenient::string")]
    pub name: String,
}

/// Product as listed by the catalog endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,

    #[serde(rename = "nombre", default, deserialize_with = "lenient::string")]
    pub name: String,

    /// Category name, or its id rendered as text when the API sends only that
    #[serde(rename = "categoria", default, deserialize_with = "lenient::opt_string")]
    pub category: Option<String>,

    #[serde(
        rename = "categoria_id",
        default,
        deserialize_with = "lenient::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<i64>,

    #[serde(rename = "precio", default, deserialize_with = "lenient::int")]
    pub price: i64,

    #[serde(alias = "cantidad", default, deserialize_with = "lenient::int")]
    pub stock: i64,
}

/// User account as listed by `/usuarios`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,

    #[serde(rename = "nombre", default, deserialize_with = "lenient::string")]
    pub name: String,

    /// Role exactly as sent by the API
    #[serde(rename = "rol", default)]
    pub role_raw: Value,

    #[serde(
        rename = "rol_id",
        default,
        deserialize_with = "lenient::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub role_id: Option<i64>,
}

impl User {
    /// Normalized role, preferring `rol_id` over `rol`
    pub fn role(&self) -> Role {
        match self.role_id.and_then(Role::from_id) {
            Some(role) => role,
            None => normalize_role(&self.role_raw, Role::default()),
        }
    }
}

/// Account to be created through `/usuario`
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// One line of a sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    #[serde(rename = "id_producto")]
    pub product_id: i64,

    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "precio")]
    pub price: i64,

    #[serde(rename = "precio_con_iva")]
    pub price_with_tax: i64,

    #[serde(rename = "cantidad")]
    pub quantity: i64,

    pub subtotal: i64,
}

/// Sale sent to `/ventas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(rename = "fecha")]
    pub timestamp: NaiveDateTime,

    #[serde(rename = "usuario")]
    pub user: String,

    pub items: Vec<SaleItem>,

    pub total: i64,
}

/// Decode each item of a listing, skipping the ones that do not decode
pub(crate) fn decode_items<T: DeserializeOwned>(kind: &str, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                debug!("[{}] skipping undecodable item: {}", kind, err);
                None
            }
        })
        .collect()
}

pub(crate) mod lenient {
    //! Deserializers that accept numbers, numeric strings and nulls alike

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_int(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn to_string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(to_int(&Value::deserialize(d)?).unwrap_or(0))
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(to_int(&Value::deserialize(d)?))
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_string(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(to_string(&Value::deserialize(d)?).filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_lenient_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "12",
            "nombre": "Café",
            "categoria": 4,
            "precio": "1500",
            "cantidad": null
        }))
        .unwrap();
        assert_eq!(product.id, 12);
        assert_eq!(product.category.as_deref(), Some("4"));
        assert_eq!(product.price, 1500);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_product_missing_fields_default() {
        let product: Product = serde_json::from_value(json!({"id": 1, "stock": 3})).unwrap();
        assert_eq!(product.name, "");
        assert_eq!(product.category, None);
        assert_eq!(product.stock, 3);
    }

    #[test]
    fn test_category_name_aliases() {
        let a: Category = serde_json::from_value(json!({"id": 1, "categoria": "Lácteos"})).unwrap();
        let b: Category = serde_json::from_value(json!({"id": 1, "nombre": "Lácteos"})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_user_role() {
        let user: User = serde_json::from_value(json!({"id": 5, "nombre": "ana", "rol": "Bodega"})).unwrap();
        assert_eq!(user.role(), Role::Bodega);

        let user: User = serde_json::from_value(json!({"id": 5, "nombre": "ana", "rol_id": "1"})).unwrap();
        assert_eq!(user.role(), Role::Administrador);

        let user: User = serde_json::from_value(json!({"id": 5})).unwrap();
        assert_eq!(user.role(), Role::Cajero);
    }

    #[test]
    fn test_sale_wire_names() {
        let sale = Sale {
            timestamp: NaiveDateTime::parse_from_str("2024-03-01 10:30:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            user: "ana".to_string(),
            items: vec![SaleItem {
                product_id: 1,
                name: "Pan".to_string(),
                price: 1000,
                price_with_tax: 1190,
                quantity: 2,
                subtotal: 2380,
            }],
            total: 2380,
        };
        let value = serde_json::to_value(&sale).unwrap();
        assert_eq!(value["fecha"], "2024-03-01T10:30:00");
        assert_eq!(value["usuario"], "ana");
        assert_eq!(value["items"][0]["precio_con_iva"], 1190);
        assert_eq!(value["total"], 2380);
    }
}
