use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Recyclable material categories accepted for doorstep collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    Plastic,
    Cardboard,
    Glass,
    Metal,
    Paper,
    Organic,
}

impl MaterialType {
    /// Human-readable label, used by client surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            MaterialType::Plastic => "Plastic",
            MaterialType::Cardboard => "Cardboard",
            MaterialType::Glass => "Glass",
            MaterialType::Metal => "Metal",
            MaterialType::Paper => "Paper",
            MaterialType::Organic => "Organic",
        }
    }
}

/// One line item of a pickup request: what and how much.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub material: MaterialType,
    pub quantity_kg: f64,
}

impl MaterialEntry {
    pub fn new(material: MaterialType, quantity_kg: f64) -> Result<Self> {
        if !quantity_kg.is_finite() || quantity_kg <= 0.0 {
            return Err(ModelError::InvalidQuantity(quantity_kg));
        }
        Ok(Self {
            material,
            quantity_kg,
        })
    }

    /// Validate an already-deserialized entry.
    pub fn validate(&self) -> Result<()> {
        if !self.quantity_kg.is_finite() || self.quantity_kg <= 0.0 {
            return Err(ModelError::InvalidQuantity(self.quantity_kg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_quantities() {
        assert!(MaterialEntry::new(MaterialType::Plastic, 0.0).is_err());
        assert!(MaterialEntry::new(MaterialType::Plastic, -1.5).is_err());
        assert!(MaterialEntry::new(MaterialType::Plastic, f64::NAN).is_err());
        assert!(MaterialEntry::new(MaterialType::Plastic, 2.0).is_ok());
    }

    #[test]
    fn material_type_serializes_snake_case() {
        let json = serde_json::to_string(&MaterialType::Cardboard).unwrap();
        assert_eq!(json, "\"cardboard\"");
    }
}
