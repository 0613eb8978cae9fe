use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SilhouetteError},
    types::Contour,
};

/// Contours together with the dimensions of the image they were traced on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub image_width: u32,
    pub image_height: u32,
}

fn number(value: impl Into<serde_json::Number>) -> serde_json::Value {
    serde_json::Value::Number(value.into())
}

impl ContourSet {
    pub fn new(contours: Vec<Contour>, image_width: u32, image_height: u32) -> Self {
        Self { contours, image_width, image_height }
    }

    /// One Polygon feature per contour, rings explicitly closed
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .contours
            .iter()
            .enumerate()
            .map(|(i, contour)| {
                let mut ring: Vec<Vec<f64>> = contour
                    .points
                    .iter()
                    .map(|&[x, y]| vec![f64::from(x), f64::from(y)])
                    .collect();
                if let Some(first) = ring.first().cloned() {
                    ring.push(first);
                }

                let mut properties = serde_json::Map::new();
                properties.insert("id".to_string(), number(i as u64));
                properties.insert("point_count".to_string(), number(contour.len() as u64));
                properties.insert(
                    "area".to_string(),
                    serde_json::Number::from_f64(contour.area())
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                );

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
                    id: Some(geojson::feature::Id::Number(serde_json::Number::from(i as u64))),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("image_width".to_string(), number(self.image_width));
        foreign_members.insert("image_height".to_string(), number(self.image_height));
        foreign_members.insert("contour_count".to_string(), number(self.contours.len() as u64));

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    pub fn save_geojson(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_geojson_string(&content)
    }

    pub fn from_geojson_string(content: &str) -> Result<Self> {
        let collection: FeatureCollection = content.parse()?;

        let dimension = |key: &str| -> Result<u32> {
            collection
                .foreign_members
                .as_ref()
                .and_then(|members| members.get(key))
                .and_then(serde_json::Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| SilhouetteError::InvalidParameter(format!("missing or invalid {key}")))
        };
        let image_width = dimension("image_width")?;
        let image_height = dimension("image_height")?;

        let mut contours = Vec::new();
        for feature in &collection.features {
            let Some(Value::Polygon(rings)) = feature.geometry.as_ref().map(|g| &g.value) else {
                continue;
            };
            let Some(exterior) = rings.first() else {
                continue;
            };
            let mut points = Vec::with_capacity(exterior.len());
            for position in exterior {
                let (Some(&x), Some(&y)) = (position.first(), position.get(1)) else {
                    return Err(SilhouetteError::InvalidParameter("position needs two coordinates".into()));
                };
                if x < 0.0 || y < 0.0 || x.fract() != 0.0 || y.fract() != 0.0 {
                    return Err(SilhouetteError::InvalidParameter(format!(
                        "contour point ({x}, {y}) is not a pixel coordinate"
                    )));
                }
                points.push([x as u32, y as u32]);
            }
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            contours.push(Contour::new(points));
        }

        Ok(Self { contours, image_width, image_height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContourSet {
        ContourSet::new(
            vec![
                Contour::new(vec![[0, 0], [3, 0], [3, 3], [0, 3]]),
                Contour::new(vec![[5, 5], [7, 5], [6, 7]]),
            ],
            8,
            8,
        )
    }

    #[test]
    fn test_geojson_export() {
        let collection = sample().to_geojson();
        assert_eq!(collection.features.len(), 2);
        let members = collection.foreign_members.expect("Has metadata");
        assert_eq!(members.get("image_width").and_then(|v| v.as_u64()), Some(8));

        let Some(Value::Polygon(rings)) = collection.features[0].geometry.as_ref().map(|g| g.value.clone()) else {
            panic!("Expected polygon geometry");
        };
        assert_eq!(rings[0].len(), 5, "Ring should be closed");
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_geojson_string_reload() {
        let set = sample();
        let json = set.to_geojson_string().expect("Should serialize");
        let parsed = ContourSet::from_geojson_string(&json).expect("Should parse");
        assert_eq!(parsed, set);
    }

    #[test]
    fn test_missing_dimensions_rejected() {
        let json = r#"{"type":"FeatureCollection","features":[]}"#;
        assert!(matches!(
            ContourSet::from_geojson_string(json),
            Err(SilhouetteError::InvalidParameter(_))
        ));
    }
}
