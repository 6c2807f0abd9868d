//! Persistence for port records.
//!
//! [`PortRepository`] is the seam between the service layer and storage. The
//! import pipeline only ever calls [`PortRepository::save_bulk`], one batch at
//! a time; HTTP handlers additionally use [`PortRepository::find_by_id`].

use crate::error::PortError;
use crate::models::{Port, PortRow};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashSet;

#[rocket::async_trait]
pub trait PortRepository: Send + Sync {
    /// Insert every port, overwriting all fields of rows that already exist
    /// with the same id. Re-saving the same batch is a no-op on the stored
    /// state.
    async fn save_bulk(&self, ports: &[Port]) -> Result<(), PortError>;

    /// Case-insensitive lookup by id.
    async fn find_by_id(&self, id: &str) -> Result<Port, PortError>;
}

/// Keep the last occurrence of every id, preserving the relative order of the
/// survivors. A single upsert statement cannot touch the same row twice.
pub(crate) fn dedup_last_wins(ports: &[Port]) -> Result<Vec<&Port>, PortError> {
    let mut seen = HashSet::with_capacity(ports.len());
    let mut unique = Vec::with_capacity(ports.len());

    for port in ports.iter().rev() {
        let id = port
            .id
            .as_deref()
            .ok_or_else(|| PortError::InvalidPort("port has no identifier".to_string()))?;
        if seen.insert(id) {
            unique.push(port);
        }
    }

    unique.reverse();
    Ok(unique)
}

/// Ports laid out as parallel columns for a single `UNNEST` upsert.
///
/// All vectors have the same length; index `i` is one row. List fields travel
/// as JSONB because PostgreSQL arrays of arrays must be rectangular.
#[derive(Debug, Default)]
pub(crate) struct PortColumns {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub cities: Vec<String>,
    pub countries: Vec<String>,
    pub aliases: Vec<Value>,
    pub regions: Vec<Value>,
    pub longitudes: Vec<Option<f64>>,
    pub latitudes: Vec<Option<f64>>,
    pub provinces: Vec<String>,
    pub timezones: Vec<String>,
    pub unlocs: Vec<Value>,
    pub codes: Vec<String>,
}

impl PortColumns {
    /// Columnar form of `ports` after last-wins deduplication.
    pub(crate) fn from_ports(ports: &[Port]) -> Result<Self, PortError> {
        let mut columns = Self::default();

        for port in dedup_last_wins(ports)? {
            let [longitude, latitude] = match port.coordinates {
                Some([longitude, latitude]) => [Some(longitude), Some(latitude)],
                None => [None, None],
            };

            columns.ids.push(port.id.clone().unwrap_or_default());
            columns.names.push(port.name.clone());
            columns.cities.push(port.city.clone());
            columns.countries.push(port.country.clone());
            columns.aliases.push(Value::from(port.alias.clone()));
            columns.regions.push(Value::from(port.regions.clone()));
            columns.longitudes.push(longitude);
            columns.latitudes.push(latitude);
            columns.provinces.push(port.province.clone());
            columns.timezones.push(port.timezone.clone());
            columns.unlocs.push(Value::from(port.unlocs.clone()));
            columns.codes.push(port.code.clone());
        }

        Ok(columns)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// [`PortRepository`] backed by the `ports` table.
#[derive(Clone)]
pub struct PostgresPortRepository {
    pool: PgPool,
}

impl PostgresPortRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl PortRepository for PostgresPortRepository {
    /// One statement per batch with a fixed parameter count, whatever the
    /// batch size.
    async fn save_bulk(&self, ports: &[Port]) -> Result<(), PortError> {
        let columns = PortColumns::from_ports(ports)?;
        if columns.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"INSERT INTO ports (
                id, name, city, country, alias, regions, coordinates,
                province, timezone, unlocs, code
               )
               SELECT t.id, t.name, t.city, t.country,
                      ARRAY(SELECT e.elem FROM jsonb_array_elements_text(t.alias)
                            WITH ORDINALITY AS e(elem, idx) ORDER BY e.idx),
                      ARRAY(SELECT e.elem FROM jsonb_array_elements_text(t.regions)
                            WITH ORDINALITY AS e(elem, idx) ORDER BY e.idx),
                      CASE WHEN t.longitude IS NULL OR t.latitude IS NULL THEN NULL
                           ELSE ARRAY[t.longitude, t.latitude] END,
                      t.province, t.timezone,
                      ARRAY(SELECT e.elem FROM jsonb_array_elements_text(t.unlocs)
                            WITH ORDINALITY AS e(elem, idx) ORDER BY e.idx),
                      t.code
               FROM UNNEST(
                   $1::text[], $2::text[], $3::text[], $4::text[],
                   $5::jsonb[], $6::jsonb[], $7::float8[], $8::float8[],
                   $9::text[], $10::text[], $11::jsonb[], $12::text[]
               ) AS t(id, name, city, country, alias, regions, longitude, latitude,
                      province, timezone, unlocs, code)
               ON CONFLICT (id) DO UPDATE SET
                   name = EXCLUDED.name,
                   city = EXCLUDED.city,
                   country = EXCLUDED.country,
                   alias = EXCLUDED.alias,
                   regions = EXCLUDED.regions,
                   coordinates = EXCLUDED.coordinates,
                   province = EXCLUDED.province,
                   timezone = EXCLUDED.timezone,
                   unlocs = EXCLUDED.unlocs,
                   code = EXCLUDED.code"#,
        )
        .bind(&columns.ids)
        .bind(&columns.names)
        .bind(&columns.cities)
        .bind(&columns.countries)
        .bind(&columns.aliases)
        .bind(&columns.regions)
        .bind(&columns.longitudes)
        .bind(&columns.latitudes)
        .bind(&columns.provinces)
        .bind(&columns.timezones)
        .bind(&columns.unlocs)
        .bind(&columns.codes)
        .execute(&self.pool)
        .await?;

        log::trace!("bulk upserted {} ports", columns.len());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Port, PortError> {
        let row = sqlx::query_as::<_, PortRow>(
            r#"
            SELECT id, name, city, country, alias, regions, coordinates,
                   province, timezone, unlocs, code
            FROM ports
            WHERE LOWER(id) = LOWER($1)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Port::try_from(row)?),
            None => Err(PortError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(id: Option<&str>, name: &str) -> Port {
        Port {
            id: id.map(str::to_string),
            name: name.to_string(),
            ..Port::default()
        }
    }

    #[test]
    fn dedup_keeps_last_occurrence_in_order() {
        let ports = vec![
            port(Some("A"), "first a"),
            port(Some("B"), "b"),
            port(Some("A"), "second a"),
            port(Some("C"), "c"),
        ];

        let unique = dedup_last_wins(&ports).expect("ids present");
        let names: Vec<&str> = unique.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "second a", "c"]);
    }

    #[test]
    fn columns_line_up_per_port() {
        let ports = vec![
            Port {
                alias: vec!["Zhangjiagang".to_string(), "Suzhou".to_string()],
                coordinates: Some([120.752503, 31.653686]),
                unlocs: vec!["CNCGU".to_string()],
                ..port(Some("CNCGU"), "Changshu")
            },
            port(Some("AEAJM"), "Ajman"),
        ];

        let columns = PortColumns::from_ports(&ports).expect("ids present");

        assert_eq!(columns.len(), 2);
        assert_eq!(columns.ids, vec!["CNCGU", "AEAJM"]);
        assert_eq!(columns.names, vec!["Changshu", "Ajman"]);
        assert_eq!(columns.longitudes, vec![Some(120.752503), None]);
        assert_eq!(columns.latitudes, vec![Some(31.653686), None]);
        assert_eq!(
            columns.aliases,
            vec![serde_json::json!(["Zhangjiagang", "Suzhou"]), serde_json::json!([])]
        );
        assert_eq!(columns.unlocs[0], serde_json::json!(["CNCGU"]));
        assert_eq!(columns.regions[1], serde_json::json!([]));
    }

    #[test]
    fn columns_hold_one_row_per_unique_id() {
        let ports: Vec<Port> = (0..6000)
            .map(|i| port(Some(format!("P{i:05}").as_str()), "bulk"))
            .chain(std::iter::once(port(Some("P00000"), "replaced")))
            .collect();

        let columns = PortColumns::from_ports(&ports).expect("ids present");

        assert_eq!(columns.len(), 6000);
        assert_eq!(columns.codes.len(), 6000);
        assert_eq!(columns.ids.last().map(String::as_str), Some("P00000"));
        assert_eq!(columns.names.last().map(String::as_str), Some("replaced"));
    }

    #[test]
    fn empty_batch_has_no_columns() {
        assert!(PortColumns::from_ports(&[]).expect("nothing to check").is_empty());
    }

    #[test]
    fn dedup_rejects_ports_without_id() {
        let ports = vec![port(Some("A"), "a"), port(None, "anonymous")];
        assert!(matches!(
            dedup_last_wins(&ports),
            Err(PortError::InvalidPort(_))
        ));
    }
}
