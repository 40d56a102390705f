//! Payloads returned by the public demo APIs backing the screens.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub suite: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zipcode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderCompany {
    #[serde(default)]
    pub name: String,
}

/// `GET {jsonplaceholder}/users` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    pub address: PlaceholderAddress,
    pub company: PlaceholderCompany,
}

/// `GET {dummyjson}/products` element, found under the `products` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummyProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DummyCartProduct {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub price: f64,
    pub quantity: u32,
    pub total: f64,
}

/// `GET {dummyjson}/carts` element, found under the `carts` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummyCart {
    pub id: i64,
    #[serde(default)]
    pub products: Vec<DummyCartProduct>,
    pub total: f64,
    #[serde(default)]
    pub discounted_total: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_user_tolerates_missing_optional_fields() {
        let user: PlaceholderUser = serde_json::from_str(
            r#"{"id":1,"name":"Leanne Graham","email":"Sincere@april.biz",
                "address":{"city":"Gwenborough"},"company":{"name":"Romaguera-Crona"}}"#,
        )
        .expect("decode");
        assert_eq!(user.address.city, "Gwenborough");
        assert!(user.phone.is_none());
    }

    #[test]
    fn dummy_cart_reads_camel_case_totals() {
        let cart: DummyCart = serde_json::from_str(
            r#"{"id":3,"products":[{"id":9,"price":10.0,"quantity":2,"total":20.0}],
                "total":20.0,"discountedTotal":18.5}"#,
        )
        .expect("decode");
        assert_eq!(cart.discounted_total, Some(18.5));
        assert_eq!(cart.products[0].quantity, 2);
    }
}
