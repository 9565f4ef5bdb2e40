use axum::extract::Path;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
    pub hub_name: &'static str,
}

// Fulfillment hubs. These are fixed deployment facts, not database rows.
pub const LOCATIONS: &[Location] = &[
    Location { id: "vancouver", name: "Vancouver", code: "VAN", hub_name: "Vancouver Hub" },
    Location { id: "ottawa", name: "Ottawa", code: "OTT", hub_name: "Ottawa Lab" },
    Location { id: "edmonton", name: "Edmonton", code: "EDM", hub_name: "Edmonton Studio" },
];

/// GET /api/locations - list available locations
pub async fn list() -> Json<&'static [Location]> {
    Json(LOCATIONS)
}

/// GET /api/locations/:id - location details by id
pub async fn get(Path(location_id): Path<String>) -> Result<Json<&'static Location>, ApiError> {
    LOCATIONS
        .iter()
        .find(|loc| loc.id == location_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Location '{}' not found", location_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_hubs_present() {
        let ids: Vec<&str> = LOCATIONS.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["vancouver", "ottawa", "edmonton"]);
    }
}
