use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub title: String,
    pub model: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub condition: Option<String>,
    pub verified: i32,
    pub description: Option<String>,
    pub images_json: Option<Value>,
    pub highlights_json: Option<Value>,
    pub city_availability_json: Option<Value>,
    pub cost_components_json: Option<Value>,
    pub base_price: Option<f64>,
    pub list_price: Option<f64>,
    pub resale_price: Option<f64>,
    pub qty: i32,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Effective unit price: list price, falling back to base price.
    pub fn unit_price(&self) -> f64 {
        self.list_price.or(self.base_price).unwrap_or(0.0)
    }

    /// First image URL from the images payload, if any.
    pub fn first_image(&self) -> Option<String> {
        match &self.images_json {
            Some(Value::Array(items)) => items
                .first()
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub cart_id: i64,
    pub product_id: i64,
    pub qty: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping_fee: f64,
    pub total: f64,
    pub notes: Option<String>,
    pub shipping_address_json: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub title_snapshot: String,
    pub unit_price: f64,
    pub qty: i32,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub stripe_pi: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PickupRequest {
    pub id: i64,
    pub user_id: i64,
    pub brand_id: Option<i64>,
    pub model_text: Option<String>,
    pub storage: Option<String>,
    pub condition: Option<String>,
    pub additional_info: Option<String>,
    pub photos_json: Option<Value>,
    pub address_json: Option<Value>,
    pub scheduled_at: Option<String>,
    pub deposit_amount: Option<f64>,
    pub estimated_price: Option<f64>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub pickup_id: i64,
    pub tester_id: Option<i64>,
    pub diagnostics_json: Option<Value>,
    pub parts_replaced_json: Option<Value>,
    pub evaluation_cost: Option<f64>,
    pub final_offer: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(images: Option<Value>, list: Option<f64>, base: Option<f64>) -> Product {
        Product {
            id: 1,
            sku: "SKU-1".into(),
            title: "Test".into(),
            model: None,
            brand_id: None,
            category_id: None,
            condition: None,
            verified: 0,
            description: None,
            images_json: images,
            highlights_json: None,
            city_availability_json: None,
            cost_components_json: None,
            base_price: base,
            list_price: list,
            resale_price: None,
            qty: 1,
            rating: None,
            reviews: None,
            location: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unit_price_prefers_list_price() {
        assert_eq!(product(None, Some(999.0), Some(1049.0)).unit_price(), 999.0);
        assert_eq!(product(None, None, Some(1049.0)).unit_price(), 1049.0);
        assert_eq!(product(None, None, None).unit_price(), 0.0);
    }

    #[test]
    fn first_image_handles_shapes() {
        assert_eq!(
            product(Some(json!(["a.png", "b.png"])), None, None).first_image(),
            Some("a.png".to_string())
        );
        assert_eq!(product(Some(json!([])), None, None).first_image(), None);
        assert_eq!(product(Some(json!([42])), None, None).first_image(), None);
        assert_eq!(product(Some(json!("not-a-list")), None, None).first_image(), None);
        assert_eq!(product(None, None, None).first_image(), None);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            id: 1,
            email: "a@b.com".into(),
            password_hash: "secret".into(),
            role: "customer".into(),
            full_name: None,
            phone_number: None,
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(&user).unwrap();
        assert!(v.get("password_hash").is_none());
    }
}
