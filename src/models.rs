use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::PortError;

// ===== Port Models =====

/// A geographic port record.
///
/// Every field tolerates being absent from the input document. A present
/// `coordinates` value must hold exactly two numbers: longitude, latitude.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Port {
    /// Assigned identifier. Import uses the document key verbatim, the API
    /// derives it from the first unloc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub city: String,
    pub country: String,
    pub alias: Vec<String>,
    pub regions: Vec<String>,
    pub coordinates: Option<[f64; 2]>,
    pub province: String,
    pub timezone: String,
    pub unlocs: Vec<String>,
    pub code: String,
}

impl Port {
    /// Assign the identifier used by the single-record creation path: the
    /// first unloc, upper-cased. A blank first unloc is rejected because it
    /// would become an empty primary key.
    pub fn with_unloc_id(mut self) -> Result<Self, PortError> {
        let first = self
            .unlocs
            .first()
            .filter(|unloc| !unloc.trim().is_empty())
            .ok_or_else(|| PortError::InvalidPort("a non-blank first unloc is required".to_string()))?;

        self.id = Some(first.to_uppercase());
        Ok(self)
    }
}

/// Row shape of the `ports` table.
#[derive(Debug, Clone, FromRow)]
pub struct PortRow {
    pub id: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub alias: Vec<String>,
    pub regions: Vec<String>,
    pub coordinates: Option<Vec<f64>>,
    pub province: String,
    pub timezone: String,
    pub unlocs: Vec<String>,
    pub code: String,
}

impl TryFrom<PortRow> for Port {
    type Error = sqlx::Error;

    fn try_from(row: PortRow) -> Result<Self, Self::Error> {
        let coordinates = row
            .coordinates
            .map(|values| {
                <[f64; 2]>::try_from(values).map_err(|values| {
                    sqlx::Error::Decode(
                        format!(
                            "port '{}' has {} coordinates, expected 2",
                            row.id,
                            values.len()
                        )
                        .into(),
                    )
                })
            })
            .transpose()?;

        Ok(Port {
            id: Some(row.id),
            name: row.name,
            city: row.city,
            country: row.country,
            alias: row.alias,
            regions: row.regions,
            coordinates,
            province: row.province,
            timezone: row.timezone,
            unlocs: row.unlocs,
            code: row.code,
        })
    }
}

// ===== Response Wrappers =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    const AJMAN: &str = r#"{
        "name": "Ajman",
        "city": "Ajman",
        "country": "United Arab Emirates",
        "alias": [],
        "regions": [],
        "coordinates": [55.5136433, 25.4052165],
        "province": "Ajman",
        "timezone": "Asia/Dubai",
        "unlocs": ["AEAJM"],
        "code": "52000"
    }"#;

    #[test]
    fn deserializes_full_record() {
        let port: Port = serde_json::from_str(AJMAN).expect("valid port");
        assert_eq!(port.id, None);
        assert_eq!(port.name, "Ajman");
        assert_eq!(port.coordinates, Some([55.5136433, 25.4052165]));
        assert_eq!(port.unlocs, vec!["AEAJM".to_string()]);
        assert_eq!(port.code, "52000");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let port: Port = serde_json::from_str(r#"{"name": "Nowhere"}"#).expect("valid port");
        assert_eq!(port.name, "Nowhere");
        assert!(port.alias.is_empty());
        assert_eq!(port.coordinates, None);
    }

    #[test]
    fn coordinates_need_exactly_two_numbers() {
        assert!(serde_json::from_str::<Port>(r#"{"coordinates": [1.0]}"#).is_err());
        assert!(serde_json::from_str::<Port>(r#"{"coordinates": [1.0, 2.0, 3.0]}"#).is_err());
        assert!(serde_json::from_str::<Port>(r#"{"coordinates": "invalid"}"#).is_err());
    }

    #[test]
    fn unloc_id_is_upper_cased_first_entry() {
        let port = Port {
            unlocs: vec!["cncgu".to_string(), "CNZJG".to_string()],
            ..Port::default()
        };

        let port = port.with_unloc_id().expect("unloc present");
        assert_eq!(port.id.as_deref(), Some("CNCGU"));
    }

    #[test]
    fn unloc_id_requires_an_unloc() {
        let err = Port::default().with_unloc_id().unwrap_err();
        assert!(matches!(err, PortError::InvalidPort(_)));
    }

    #[test]
    fn unloc_id_rejects_blank_first_unloc() {
        let port = Port {
            unlocs: vec!["  ".to_string(), "CNCGU".to_string()],
            ..Port::default()
        };

        assert!(matches!(
            port.with_unloc_id(),
            Err(PortError::InvalidPort(_))
        ));
    }

    #[test]
    fn id_is_serialized_only_when_assigned() {
        let unassigned = serde_json::to_value(Port::default()).expect("serializes");
        assert!(unassigned.get("id").is_none());

        let assigned = Port {
            id: Some("AEAJM".to_string()),
            ..Port::default()
        };
        let value = serde_json::to_value(assigned).expect("serializes");
        assert_eq!(value["id"], "AEAJM");
    }

    #[test]
    fn row_with_wrong_coordinate_count_fails_to_convert() {
        let row = PortRow {
            id: "AEAJM".to_string(),
            name: String::new(),
            city: String::new(),
            country: String::new(),
            alias: Vec::new(),
            regions: Vec::new(),
            coordinates: Some(vec![1.0, 2.0, 3.0]),
            province: String::new(),
            timezone: String::new(),
            unlocs: Vec::new(),
            code: String::new(),
        };

        assert!(Port::try_from(row).is_err());
    }
}
