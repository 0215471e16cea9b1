#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Batch job that resolves and repoints missing telemetry addresses.
//!
//! One fix pass loads every `drives` row missing a start or end address
//! and every `charging_processes` row missing its address, resolves each
//! one's recorded position through the reverse geocoder, get-or-creates
//! the matching `addresses` row, and points the null reference at it.
//!
//! Each reference is processed to completion before the next begins and
//! every failure is isolated: an unresolvable record is logged, counted,
//! and left untouched for a future pass. Because candidate selection
//! only matches rows still lacking an address and the address store
//! deduplicates by `(osm_id, osm_type)`, a pass is safe to re-run — a
//! second pass over fixed data changes nothing.

pub mod progress;

use std::sync::Arc;
use std::time::{Duration, Instant};

use addrfix_database::{DbError, queries};
use addrfix_database_models::{ChargeCandidate, DriveCandidate, DriveSide};
use addrfix_geocoder::{GeocodeError, ReverseGeocoder};
use addrfix_geocoder_models::OsmAddress;
use async_trait::async_trait;
use switchy_database::Database;

use crate::progress::ProgressCallback;

/// Delay before every provider call. The public Nominatim instance
/// allows 1 request per second.
pub const OSM_RESOLVE_INTERVAL_MS: u64 = 1000;

/// Back-off applied after the provider reports rate limiting.
const RATE_LIMIT_BACKOFF_SECS: u64 = 60;

/// Errors that abort an entire fix pass.
///
/// Only the candidate queries can produce one; per-record failures are
/// counted in the [`RepairSummary`] instead.
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    /// Database error.
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    /// Store error from a non-database backend.
    #[error("Store error: {message}")]
    Store {
        /// Description of the failure.
        message: String,
    },
}

/// Read/write access to the telemetry rows the job touches.
///
/// Abstracting the store keeps the fix loop testable against an
/// in-memory implementation; [`PgStore`] is the production one.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Drives still missing at least one address reference.
    async fn drive_candidates(&self) -> Result<Vec<DriveCandidate>, RepairError>;

    /// Charging processes still missing their address reference.
    async fn charge_candidates(&self) -> Result<Vec<ChargeCandidate>, RepairError>;

    /// Coordinates of a recorded position, if the position exists.
    async fn position_coords(&self, position_id: i64) -> Result<Option<(f64, f64)>, RepairError>;

    /// Get-or-create an address row by `(osm_id, osm_type)`.
    async fn upsert_address(&self, address: &OsmAddress) -> Result<i64, RepairError>;

    /// Points one side of a drive at a resolved address.
    async fn set_drive_address(
        &self,
        drive_id: i64,
        side: DriveSide,
        address_id: i64,
    ) -> Result<(), RepairError>;

    /// Points a charging process at a resolved address.
    async fn set_charge_address(
        &self,
        charging_process_id: i64,
        address_id: i64,
    ) -> Result<(), RepairError>;
}

/// [`AddressStore`] backed by the telemetry `PostgreSQL` database.
pub struct PgStore<'a> {
    db: &'a dyn Database,
}

impl<'a> PgStore<'a> {
    /// Wraps an open database connection.
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AddressStore for PgStore<'_> {
    async fn drive_candidates(&self) -> Result<Vec<DriveCandidate>, RepairError> {
        Ok(queries::drive_candidates(self.db).await?)
    }

    async fn charge_candidates(&self) -> Result<Vec<ChargeCandidate>, RepairError> {
        Ok(queries::charge_candidates(self.db).await?)
    }

    async fn position_coords(&self, position_id: i64) -> Result<Option<(f64, f64)>, RepairError> {
        Ok(queries::position_coords(self.db, position_id).await?)
    }

    async fn upsert_address(&self, address: &OsmAddress) -> Result<i64, RepairError> {
        Ok(queries::upsert_address(self.db, address).await?)
    }

    async fn set_drive_address(
        &self,
        drive_id: i64,
        side: DriveSide,
        address_id: i64,
    ) -> Result<(), RepairError> {
        let affected = queries::set_drive_address(self.db, drive_id, side, address_id).await?;
        if affected == 0 {
            log::warn!("Drive #{drive_id} disappeared before its {side} address could be set");
        }
        Ok(())
    }

    async fn set_charge_address(
        &self,
        charging_process_id: i64,
        address_id: i64,
    ) -> Result<(), RepairError> {
        let affected =
            queries::set_charging_process_address(self.db, charging_process_id, address_id).await?;
        if affected == 0 {
            log::warn!(
                "Charging process #{charging_process_id} disappeared before its address could be set"
            );
        }
        Ok(())
    }
}

/// Tuning knobs for a fix pass.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Resolve and log, but write nothing.
    pub dry_run: bool,
    /// Delay inserted before every provider call.
    pub resolve_interval: Duration,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            resolve_interval: Duration::from_millis(OSM_RESOLVE_INTERVAL_MS),
        }
    }
}

/// Outcome counts for one fix pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Drive address references fixed (a drive can contribute two).
    pub drive_legs_fixed: u64,
    /// Charging processes fixed.
    pub charges_fixed: u64,
    /// References that could not be resolved or written.
    pub failed: u64,
    /// Candidates skipped because their position is missing.
    pub skipped: u64,
}

impl RepairSummary {
    /// Total references fixed across both tables.
    #[must_use]
    pub const fn fixed(&self) -> u64 {
        self.drive_legs_fixed + self.charges_fixed
    }
}

impl std::fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} drive leg(s) fixed, {} charge(s) fixed, {} failed, {} skipped",
            self.drive_legs_fixed, self.charges_fixed, self.failed, self.skipped
        )
    }
}

/// Per-reference outcome within a pass.
enum Outcome {
    Fixed,
    Failed,
    Skipped,
}

/// What resolving one position produced.
enum Resolution {
    Address(Box<OsmAddress>),
    Failed,
    MissingPosition,
}

/// Runs one fix pass: resolves and repoints every drive and charging
/// process still missing an address reference.
///
/// # Errors
///
/// Returns [`RepairError`] only when the candidate queries themselves
/// fail (e.g. the database became unreachable). Per-record resolution
/// and write failures are logged and counted in the summary.
pub async fn fix_missing_addresses(
    store: &dyn AddressStore,
    geocoder: &dyn ReverseGeocoder,
    options: &RepairOptions,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<RepairSummary, RepairError> {
    let start = Instant::now();

    let drives = store.drive_candidates().await?;
    let charges = store.charge_candidates().await?;

    let total_refs = drives
        .iter()
        .map(DriveCandidate::missing_references)
        .sum::<u64>()
        + charges.len() as u64;

    if total_refs == 0 {
        log::info!("No drives or charging processes need address resolution");
        return Ok(RepairSummary::default());
    }

    log::info!(
        "Found {} drive(s) and {} charging process(es) needing addresses ({total_refs} reference(s))",
        drives.len(),
        charges.len()
    );

    if let Some(ref p) = progress {
        p.set_total(total_refs);
    }

    let mut summary = RepairSummary::default();

    for drive in &drives {
        for side in [DriveSide::Start, DriveSide::End] {
            if !drive.needs_fix(side) {
                continue;
            }

            match fix_drive_side(store, geocoder, options, drive, side).await {
                Outcome::Fixed => summary.drive_legs_fixed += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }

            if let Some(ref p) = progress {
                p.inc(1);
            }
        }
    }

    for charge in &charges {
        match fix_charge(store, geocoder, options, charge).await {
            Outcome::Fixed => summary.charges_fixed += 1,
            Outcome::Failed => summary.failed += 1,
            Outcome::Skipped => summary.skipped += 1,
        }

        if let Some(ref p) = progress {
            p.inc(1);
        }
    }

    let elapsed = start.elapsed();
    log::info!(
        "Fix pass complete: {summary} in {:.1}s",
        elapsed.as_secs_f64()
    );

    if let Some(ref p) = progress {
        p.finish(summary.to_string());
    }

    Ok(summary)
}

/// Resolves and repoints one side of a drive.
async fn fix_drive_side(
    store: &dyn AddressStore,
    geocoder: &dyn ReverseGeocoder,
    options: &RepairOptions,
    drive: &DriveCandidate,
    side: DriveSide,
) -> Outcome {
    let Some(position_id) = drive.position_id(side) else {
        log::warn!("Drive #{} has no {side} position id, skipping", drive.id);
        return Outcome::Skipped;
    };

    let context = format!("drive #{} {side}", drive.id);
    let address = match resolve_position(store, geocoder, options, position_id, &context).await {
        Resolution::Address(address) => address,
        Resolution::Failed => return Outcome::Failed,
        Resolution::MissingPosition => return Outcome::Skipped,
    };

    if options.dry_run {
        log::info!(
            "[dry run] would set {side} address of drive #{} to '{}'",
            drive.id,
            address.display_name
        );
        return Outcome::Fixed;
    }

    let address_id = match store.upsert_address(&address).await {
        Ok(id) => id,
        Err(e) => {
            log::warn!(
                "{context}: failed to store address '{}': {e}",
                address.display_name
            );
            return Outcome::Failed;
        }
    };

    match store.set_drive_address(drive.id, side, address_id).await {
        Ok(()) => {
            log::info!(
                "Fixed {side} address of drive #{}: '{}' (address #{address_id})",
                drive.id,
                address.display_name
            );
            Outcome::Fixed
        }
        Err(e) => {
            log::warn!("{context}: failed to update drive: {e}");
            Outcome::Failed
        }
    }
}

/// Resolves and repoints a charging process.
async fn fix_charge(
    store: &dyn AddressStore,
    geocoder: &dyn ReverseGeocoder,
    options: &RepairOptions,
    charge: &ChargeCandidate,
) -> Outcome {
    let Some(position_id) = charge.position_id else {
        log::warn!(
            "Charging process #{} has no position id, skipping",
            charge.id
        );
        return Outcome::Skipped;
    };

    let context = format!("charging process #{}", charge.id);
    let address = match resolve_position(store, geocoder, options, position_id, &context).await {
        Resolution::Address(address) => address,
        Resolution::Failed => return Outcome::Failed,
        Resolution::MissingPosition => return Outcome::Skipped,
    };

    if options.dry_run {
        log::info!(
            "[dry run] would set address of charging process #{} to '{}'",
            charge.id,
            address.display_name
        );
        return Outcome::Fixed;
    }

    let address_id = match store.upsert_address(&address).await {
        Ok(id) => id,
        Err(e) => {
            log::warn!(
                "{context}: failed to store address '{}': {e}",
                address.display_name
            );
            return Outcome::Failed;
        }
    };

    match store.set_charge_address(charge.id, address_id).await {
        Ok(()) => {
            log::info!(
                "Fixed address of charging process #{}: '{}' (address #{address_id})",
                charge.id,
                address.display_name
            );
            Outcome::Fixed
        }
        Err(e) => {
            log::warn!("{context}: failed to update charging process: {e}");
            Outcome::Failed
        }
    }
}

/// Resolves the coordinates of one position, with all per-record failure
/// logging. Pacing happens here so every provider call is rate limited
/// no matter which table it came from.
async fn resolve_position(
    store: &dyn AddressStore,
    geocoder: &dyn ReverseGeocoder,
    options: &RepairOptions,
    position_id: i64,
    context: &str,
) -> Resolution {
    let (latitude, longitude) = match store.position_coords(position_id).await {
        Ok(Some(coords)) => coords,
        Ok(None) => {
            log::warn!("{context}: position #{position_id} not found");
            return Resolution::MissingPosition;
        }
        Err(e) => {
            log::warn!("{context}: failed to load position #{position_id}: {e}");
            return Resolution::Failed;
        }
    };

    tokio::time::sleep(options.resolve_interval).await;

    match geocoder.reverse(latitude, longitude).await {
        Ok(Some(address)) => {
            log::debug!(
                "{context}: ({latitude}, {longitude}) resolved to '{}'",
                address.display_name
            );
            Resolution::Address(Box::new(address))
        }
        Ok(None) => {
            log::warn!("{context}: no geocode result for ({latitude}, {longitude})");
            Resolution::Failed
        }
        Err(e) => {
            log::warn!("{context}: reverse geocoding failed: {e}");
            if matches!(e, GeocodeError::RateLimited) {
                log::warn!("Rate limited by the provider, waiting {RATE_LIMIT_BACKOFF_SECS}s...");
                tokio::time::sleep(Duration::from_secs(RATE_LIMIT_BACKOFF_SECS)).await;
            }
            Resolution::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use addrfix_geocoder_models::OsmType;

    use super::*;

    /// A `charging_processes` row as the in-memory store keeps it.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct ChargeRecord {
        id: i64,
        position_id: Option<i64>,
        address_id: Option<i64>,
    }

    /// A stored address row: `(id, osm_id, osm_type)`.
    type StoredAddress = (i64, i64, OsmType);

    /// In-memory [`AddressStore`] that enforces the same natural-key
    /// dedup the unique constraint does in `PostgreSQL`.
    #[derive(Default)]
    struct MemStore {
        drives: Mutex<Vec<DriveCandidate>>,
        charges: Mutex<Vec<ChargeRecord>>,
        positions: BTreeMap<i64, (f64, f64)>,
        addresses: Mutex<Vec<StoredAddress>>,
    }

    #[async_trait]
    impl AddressStore for MemStore {
        async fn drive_candidates(&self) -> Result<Vec<DriveCandidate>, RepairError> {
            Ok(self
                .drives
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.missing_references() > 0)
                .cloned()
                .collect())
        }

        async fn charge_candidates(&self) -> Result<Vec<ChargeCandidate>, RepairError> {
            Ok(self
                .charges
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.address_id.is_none())
                .map(|c| ChargeCandidate {
                    id: c.id,
                    position_id: c.position_id,
                })
                .collect())
        }

        async fn position_coords(
            &self,
            position_id: i64,
        ) -> Result<Option<(f64, f64)>, RepairError> {
            Ok(self.positions.get(&position_id).copied())
        }

        async fn upsert_address(&self, address: &OsmAddress) -> Result<i64, RepairError> {
            let mut addresses = self.addresses.lock().unwrap();
            if let Some(&(id, _, _)) = addresses
                .iter()
                .find(|(_, osm_id, osm_type)| (*osm_id, *osm_type) == address.natural_key())
            {
                return Ok(id);
            }
            let id = addresses.len() as i64 + 1;
            addresses.push((id, address.osm_id, address.osm_type));
            Ok(id)
        }

        async fn set_drive_address(
            &self,
            drive_id: i64,
            side: DriveSide,
            address_id: i64,
        ) -> Result<(), RepairError> {
            let mut drives = self.drives.lock().unwrap();
            let drive = drives
                .iter_mut()
                .find(|d| d.id == drive_id)
                .ok_or_else(|| RepairError::Store {
                    message: format!("no drive {drive_id}"),
                })?;
            match side {
                DriveSide::Start => drive.start_address_id = Some(address_id),
                DriveSide::End => drive.end_address_id = Some(address_id),
            }
            Ok(())
        }

        async fn set_charge_address(
            &self,
            charging_process_id: i64,
            address_id: i64,
        ) -> Result<(), RepairError> {
            let mut charges = self.charges.lock().unwrap();
            let charge = charges
                .iter_mut()
                .find(|c| c.id == charging_process_id)
                .ok_or_else(|| RepairError::Store {
                    message: format!("no charging process {charging_process_id}"),
                })?;
            charge.address_id = Some(address_id);
            Ok(())
        }
    }

    /// Scripted [`ReverseGeocoder`]: coordinates map to a fixed answer.
    /// Unknown coordinates yield `Ok(None)`; an entry of `Err` yields a
    /// parse error.
    #[derive(Default)]
    struct ScriptedGeocoder {
        responses: BTreeMap<String, Result<OsmAddress, String>>,
        calls: AtomicU64,
    }

    fn coord_key(latitude: f64, longitude: f64) -> String {
        format!("{latitude:.6},{longitude:.6}")
    }

    impl ScriptedGeocoder {
        fn resolves(mut self, latitude: f64, longitude: f64, address: OsmAddress) -> Self {
            self.responses
                .insert(coord_key(latitude, longitude), Ok(address));
            self
        }

        fn fails(mut self, latitude: f64, longitude: f64) -> Self {
            self.responses.insert(
                coord_key(latitude, longitude),
                Err("scripted failure".to_string()),
            );
            self
        }

        fn call_count(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReverseGeocoder for ScriptedGeocoder {
        async fn reverse(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<Option<OsmAddress>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(&coord_key(latitude, longitude)) {
                Some(Ok(address)) => Ok(Some(address.clone())),
                Some(Err(message)) => Err(GeocodeError::Parse {
                    message: message.clone(),
                }),
                None => Ok(None),
            }
        }
    }

    fn address(osm_id: i64, osm_type: OsmType, display_name: &str) -> OsmAddress {
        OsmAddress {
            latitude: 0.0,
            longitude: 0.0,
            display_name: display_name.to_string(),
            name: String::new(),
            house_number: String::new(),
            road: String::new(),
            neighbourhood: String::new(),
            city: String::new(),
            county: String::new(),
            postcode: String::new(),
            state: String::new(),
            state_district: String::new(),
            country: String::new(),
            raw: "{}".to_string(),
            osm_id,
            osm_type,
        }
    }

    fn options() -> RepairOptions {
        RepairOptions {
            dry_run: false,
            resolve_interval: Duration::ZERO,
        }
    }

    fn drive(
        id: i64,
        start: (Option<i64>, Option<i64>),
        end: (Option<i64>, Option<i64>),
    ) -> DriveCandidate {
        DriveCandidate {
            id,
            start_address_id: start.0,
            start_position_id: start.1,
            end_address_id: end.0,
            end_position_id: end.1,
        }
    }

    #[tokio::test]
    async fn fixes_both_ends_of_a_drive() {
        let store = MemStore {
            drives: Mutex::new(vec![drive(1, (None, Some(10)), (None, Some(20)))]),
            positions: BTreeMap::from([(10, (52.5, 13.4)), (20, (48.1, 11.6))]),
            ..MemStore::default()
        };
        let geocoder = ScriptedGeocoder::default()
            .resolves(52.5, 13.4, address(100, OsmType::Way, "A"))
            .resolves(48.1, 11.6, address(200, OsmType::Node, "B"));

        let summary = fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();

        assert_eq!(summary.drive_legs_fixed, 2);
        assert_eq!(summary.failed, 0);

        let drives = store.drives.lock().unwrap();
        let addresses = store.addresses.lock().unwrap();
        let a = addresses.iter().find(|(_, osm_id, _)| *osm_id == 100).unwrap().0;
        let b = addresses.iter().find(|(_, osm_id, _)| *osm_id == 200).unwrap().0;
        assert_eq!(drives[0].start_address_id, Some(a));
        assert_eq!(drives[0].end_address_id, Some(b));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn shares_address_rows_across_tables() {
        // A drive start and a charging process at the same location must
        // reference one address row, not two.
        let store = MemStore {
            drives: Mutex::new(vec![drive(1, (None, Some(10)), (Some(99), None))]),
            charges: Mutex::new(vec![ChargeRecord {
                id: 7,
                position_id: Some(11),
                address_id: None,
            }]),
            positions: BTreeMap::from([(10, (52.5, 13.4)), (11, (52.500_001, 13.400_001))]),
            ..MemStore::default()
        };
        let geocoder = ScriptedGeocoder::default()
            .resolves(52.5, 13.4, address(100, OsmType::Way, "Depot"))
            .resolves(52.500_001, 13.400_001, address(100, OsmType::Way, "Depot"));

        let summary = fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();

        assert_eq!(summary.fixed(), 2);
        assert_eq!(store.addresses.lock().unwrap().len(), 1);

        let drive_ref = store.drives.lock().unwrap()[0].start_address_id;
        let charge_ref = store.charges.lock().unwrap()[0].address_id;
        assert_eq!(drive_ref, charge_ref);
    }

    #[tokio::test]
    async fn second_pass_changes_nothing() {
        let store = MemStore {
            drives: Mutex::new(vec![drive(1, (None, Some(10)), (None, Some(20)))]),
            charges: Mutex::new(vec![ChargeRecord {
                id: 2,
                position_id: Some(10),
                address_id: None,
            }]),
            positions: BTreeMap::from([(10, (52.5, 13.4)), (20, (48.1, 11.6))]),
            ..MemStore::default()
        };
        let geocoder = ScriptedGeocoder::default()
            .resolves(52.5, 13.4, address(100, OsmType::Way, "A"))
            .resolves(48.1, 11.6, address(200, OsmType::Node, "B"));

        fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();
        let calls_after_first = geocoder.call_count();
        let drives_after_first = store.drives.lock().unwrap().clone();
        let addresses_after_first = store.addresses.lock().unwrap().clone();

        let summary = fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();

        assert_eq!(summary, RepairSummary::default());
        assert_eq!(geocoder.call_count(), calls_after_first);
        assert_eq!(*store.drives.lock().unwrap(), drives_after_first);
        assert_eq!(*store.addresses.lock().unwrap(), addresses_after_first);
    }

    #[tokio::test]
    async fn failure_is_isolated_to_one_record() {
        let store = MemStore {
            charges: Mutex::new(vec![
                ChargeRecord { id: 1, position_id: Some(10), address_id: None },
                ChargeRecord { id: 2, position_id: Some(20), address_id: None },
                ChargeRecord { id: 3, position_id: Some(30), address_id: None },
            ]),
            positions: BTreeMap::from([
                (10, (1.0, 1.0)),
                (20, (2.0, 2.0)),
                (30, (3.0, 3.0)),
            ]),
            ..MemStore::default()
        };
        let geocoder = ScriptedGeocoder::default()
            .resolves(1.0, 1.0, address(1, OsmType::Node, "First"))
            .fails(2.0, 2.0)
            .resolves(3.0, 3.0, address(3, OsmType::Node, "Third"));

        let summary = fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();

        assert_eq!(summary.charges_fixed, 2);
        assert_eq!(summary.failed, 1);

        let charges = store.charges.lock().unwrap();
        assert!(charges[0].address_id.is_some());
        assert!(charges[1].address_id.is_none());
        assert!(charges[2].address_id.is_some());
    }

    #[tokio::test]
    async fn fixes_start_when_end_resolution_fails() {
        let store = MemStore {
            drives: Mutex::new(vec![drive(1, (None, Some(10)), (None, Some(20)))]),
            positions: BTreeMap::from([(10, (52.5, 13.4)), (20, (48.1, 11.6))]),
            ..MemStore::default()
        };
        // The end coordinate has no scripted answer, so it resolves to
        // "no result".
        let geocoder =
            ScriptedGeocoder::default().resolves(52.5, 13.4, address(100, OsmType::Way, "A"));

        let summary = fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();

        assert_eq!(summary.drive_legs_fixed, 1);
        assert_eq!(summary.failed, 1);

        let drives = store.drives.lock().unwrap();
        assert!(drives[0].start_address_id.is_some());
        assert!(drives[0].end_address_id.is_none());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let store = MemStore {
            drives: Mutex::new(vec![drive(1, (None, Some(10)), (Some(5), None))]),
            positions: BTreeMap::from([(10, (52.5, 13.4))]),
            ..MemStore::default()
        };
        let geocoder =
            ScriptedGeocoder::default().resolves(52.5, 13.4, address(100, OsmType::Way, "A"));

        let opts = RepairOptions {
            dry_run: true,
            resolve_interval: Duration::ZERO,
        };
        let summary = fix_missing_addresses(&store, &geocoder, &opts, Some(progress::null_progress()))
            .await
            .unwrap();

        assert_eq!(summary.drive_legs_fixed, 1);
        assert!(store.addresses.lock().unwrap().is_empty());
        assert!(store.drives.lock().unwrap()[0].start_address_id.is_none());
    }

    #[tokio::test]
    async fn skips_candidates_without_positions() {
        let store = MemStore {
            charges: Mutex::new(vec![
                // No position id at all.
                ChargeRecord { id: 1, position_id: None, address_id: None },
                // Position id pointing at a row that does not exist.
                ChargeRecord { id: 2, position_id: Some(404), address_id: None },
            ]),
            ..MemStore::default()
        };
        let geocoder = ScriptedGeocoder::default();

        let summary = fix_missing_addresses(&store, &geocoder, &options(), None)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(geocoder.call_count(), 0);
    }
}
