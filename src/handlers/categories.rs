use axum::Json;
use serde::Serialize;

use crate::db::{self, models::Category};
use crate::error::ApiError;

/// Category entry shaped for frontend navigation.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub icon: &'static str,
}

// Navigation set served when the categories table is empty (fresh install).
fn default_categories() -> Vec<CategoryView> {
    vec![
        CategoryView { id: "phones".into(), name: "Phones".into(), icon: "📱" },
        CategoryView { id: "laptops".into(), name: "Laptops".into(), icon: "💻" },
        CategoryView { id: "tablets".into(), name: "Tablets".into(), icon: "📱" },
        CategoryView { id: "accessories".into(), name: "Accessories".into(), icon: "🎧" },
    ]
}

fn slug_for(name: &str) -> String {
    match name {
        "Phone" => "phones".to_string(),
        "Laptop" => "laptops".to_string(),
        "Tablet" => "tablets".to_string(),
        "Accessory" => "accessories".to_string(),
        other => other.to_lowercase(),
    }
}

fn icon_for(name: &str) -> &'static str {
    match name {
        "Phone" | "Tablet" => "📱",
        "Laptop" => "💻",
        "Accessory" => "🎧",
        _ => "📦",
    }
}

fn display_name(name: &str) -> String {
    if name.ends_with('s') {
        name.to_string()
    } else {
        format!("{}s", name)
    }
}

/// GET /api/categories - categories with navigation slugs and icons
pub async fn list() -> Result<Json<Vec<CategoryView>>, ApiError> {
    let pool = db::pool().await?;

    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id")
        .fetch_all(&pool)
        .await?;

    if categories.is_empty() {
        return Ok(Json(default_categories()));
    }

    let views = categories
        .iter()
        .map(|cat| CategoryView {
            id: slug_for(&cat.name),
            name: display_name(&cat.name),
            icon: icon_for(&cat.name),
        })
        .collect();

    Ok(Json(views))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_slugs() {
        assert_eq!(slug_for("Phone"), "phones");
        assert_eq!(slug_for("Accessory"), "accessories");
        assert_eq!(slug_for("Wearable"), "wearable");
    }

    #[test]
    fn display_names_are_pluralized_once() {
        assert_eq!(display_name("Phone"), "Phones");
        assert_eq!(display_name("Accessories"), "Accessories");
    }

    #[test]
    fn unknown_names_get_box_icon() {
        assert_eq!(icon_for("Drone"), "📦");
        assert_eq!(icon_for("Laptop"), "💻");
    }

    #[test]
    fn defaults_cover_the_storefront_nav() {
        let defaults = default_categories();
        assert_eq!(defaults.len(), 4);
        assert_eq!(defaults[0].id, "phones");
    }
}
