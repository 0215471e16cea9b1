//! Query functions for the address repair job.
//!
//! Candidate selection only matches rows whose address reference is still
//! null, which is what makes a fix pass safely re-runnable. The address
//! upsert leans on the unique constraint over `(osm_id, osm_type)` so the
//! get-or-create is a single atomic statement.

use addrfix_database_models::{CandidateCounts, ChargeCandidate, DriveCandidate, DriveSide};
use addrfix_geocoder_models::OsmAddress;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Loads drives missing at least one address reference.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn drive_candidates(db: &dyn Database) -> Result<Vec<DriveCandidate>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, start_address_id, start_position_id, end_address_id, end_position_id
             FROM drives
             WHERE start_address_id IS NULL OR end_address_id IS NULL
             ORDER BY id",
            &[],
        )
        .await?;

    let mut candidates = Vec::with_capacity(rows.len());

    for row in &rows {
        candidates.push(DriveCandidate {
            id: row.to_value("id").unwrap_or(0),
            start_address_id: row.to_value("start_address_id").unwrap_or(None),
            start_position_id: row.to_value("start_position_id").unwrap_or(None),
            end_address_id: row.to_value("end_address_id").unwrap_or(None),
            end_position_id: row.to_value("end_position_id").unwrap_or(None),
        });
    }

    Ok(candidates)
}

/// Loads charging processes missing their address reference.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn charge_candidates(db: &dyn Database) -> Result<Vec<ChargeCandidate>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, position_id
             FROM charging_processes
             WHERE address_id IS NULL
             ORDER BY id",
            &[],
        )
        .await?;

    let mut candidates = Vec::with_capacity(rows.len());

    for row in &rows {
        candidates.push(ChargeCandidate {
            id: row.to_value("id").unwrap_or(0),
            position_id: row.to_value("position_id").unwrap_or(None),
        });
    }

    Ok(candidates)
}

/// Looks up the coordinates of a recorded position.
///
/// Returns `None` when the position row does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the coordinates cannot be
/// read.
pub async fn position_coords(
    db: &dyn Database,
    position_id: i64,
) -> Result<Option<(f64, f64)>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT latitude, longitude FROM positions WHERE id = $1",
            &[DatabaseValue::Int64(position_id)],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let latitude: f64 = row.to_value("latitude").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse latitude of position {position_id}: {e}"),
    })?;
    let longitude: f64 = row.to_value("longitude").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse longitude of position {position_id}: {e}"),
    })?;

    Ok(Some((latitude, longitude)))
}

/// Inserts an address or returns the id of the existing row with the
/// same `(osm_id, osm_type)`.
///
/// The conflict arm writes `osm_id` back to itself solely so `RETURNING`
/// yields the id either way; an existing row keeps all of its fields
/// (first write wins).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_address(db: &dyn Database, address: &OsmAddress) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO addresses (
                display_name, latitude, longitude, name, house_number, road,
                neighbourhood, city, county, postcode, state, state_district,
                country, raw, inserted_at, updated_at, osm_id, osm_type
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14::jsonb, NOW(), NOW(), $15, $16
            )
            ON CONFLICT (osm_id, osm_type) DO UPDATE SET osm_id = EXCLUDED.osm_id
            RETURNING id",
            &[
                DatabaseValue::String(address.display_name.clone()),
                DatabaseValue::Real64(address.latitude),
                DatabaseValue::Real64(address.longitude),
                DatabaseValue::String(address.name.clone()),
                DatabaseValue::String(address.house_number.clone()),
                DatabaseValue::String(address.road.clone()),
                DatabaseValue::String(address.neighbourhood.clone()),
                DatabaseValue::String(address.city.clone()),
                DatabaseValue::String(address.county.clone()),
                DatabaseValue::String(address.postcode.clone()),
                DatabaseValue::String(address.state.clone()),
                DatabaseValue::String(address.state_district.clone()),
                DatabaseValue::String(address.country.clone()),
                DatabaseValue::String(address.raw.clone()),
                DatabaseValue::Int64(address.osm_id),
                DatabaseValue::String(address.osm_type.to_string()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to get address id from upsert".to_string(),
    })?;

    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse address id: {e}"),
    })?;

    Ok(id)
}

/// Points one side of a drive at a resolved address.
///
/// Returns the number of rows updated (0 when the drive no longer
/// exists).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_drive_address(
    db: &dyn Database,
    drive_id: i64,
    side: DriveSide,
    address_id: i64,
) -> Result<u64, DbError> {
    let sql = format!(
        "UPDATE drives SET {} = $2 WHERE id = $1",
        side.address_column()
    );

    let affected = db
        .exec_raw_params(
            &sql,
            &[
                DatabaseValue::Int64(drive_id),
                DatabaseValue::Int64(address_id),
            ],
        )
        .await?;

    Ok(affected)
}

/// Points a charging process at a resolved address.
///
/// Returns the number of rows updated.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_charging_process_address(
    db: &dyn Database,
    charging_process_id: i64,
    address_id: i64,
) -> Result<u64, DbError> {
    let affected = db
        .exec_raw_params(
            "UPDATE charging_processes SET address_id = $2 WHERE id = $1",
            &[
                DatabaseValue::Int64(charging_process_id),
                DatabaseValue::Int64(address_id),
            ],
        )
        .await?;

    Ok(affected)
}

/// Counts the references a fix pass would attempt, per kind.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn candidate_counts(db: &dyn Database) -> Result<CandidateCounts, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT
                COUNT(*) FILTER (WHERE start_address_id IS NULL) AS drive_starts,
                COUNT(*) FILTER (WHERE end_address_id IS NULL) AS drive_ends
             FROM drives",
            &[],
        )
        .await?;

    let mut counts = CandidateCounts::default();

    if let Some(row) = rows.first() {
        let starts: i64 = row.to_value("drive_starts").unwrap_or(0);
        let ends: i64 = row.to_value("drive_ends").unwrap_or(0);
        #[allow(clippy::cast_sign_loss)]
        {
            counts.drive_starts = starts as u64;
            counts.drive_ends = ends as u64;
        }
    }

    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) AS charges FROM charging_processes WHERE address_id IS NULL",
            &[],
        )
        .await?;

    if let Some(row) = rows.first() {
        let charges: i64 = row.to_value("charges").unwrap_or(0);
        #[allow(clippy::cast_sign_loss)]
        {
            counts.charges = charges as u64;
        }
    }

    Ok(counts)
}
