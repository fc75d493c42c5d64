use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::material::MaterialEntry;

/// Body of `POST /api/v1/requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestPayload {
    pub materials: Vec<MaterialEntry>,
    pub location: GeoPoint,
}

/// Body of `POST /api/v1/requests/{id}/complete`. The measured quantity is
/// optional; when absent the requested estimate remains the figure of record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequestPayload {
    #[serde(default)]
    pub collected_kg: Option<f64>,
}
