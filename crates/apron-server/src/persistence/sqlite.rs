//! SQLite-backed store.
//!
//! The one-active-assignment rule is enforced by partial unique indexes, and
//! `claim_gate` flips the gate status with a compare-and-swap UPDATE inside
//! the same transaction that inserts the assignment.

use apron_core::{
    Assignment, AssignmentId, Flight, FlightId, Gate, GateClass, GateId, GateStatus, NewFlight,
    NewGate, UnknownCode,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;

use super::{Database, Store};
use crate::error::{EngineError, EngineResult};

const FLIGHT_COLUMNS: &str = "id, flight_number, aircraft_class, automaton_state, origin, destination, airline, \
     scheduled_arrival, actual_arrival, scheduled_departure, actual_departure, detected_at, created_at, updated_at";

const GATE_COLUMNS: &str =
    "id, gate_number, gate_class, status, is_active, terminal, location, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, flight_id, gate_id, assigned_at, expected_arrival, actual_arrival, \
     departure_time, is_active, led_activated, notes";

const AVAILABLE: &str = "is_active = 1 AND status IN ('FREE', 'RESERVED')";

#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    async fn fetch_assignment(&self, id: AssignmentId) -> EngineResult<Assignment> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        match row {
            Some(row) => Ok(Assignment::try_from(row)?),
            None => Err(EngineError::AssignmentNotFound(id)),
        }
    }

    async fn gate_exists(&self, id: GateId) -> EngineResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gates WHERE id = ?1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(count > 0)
    }

    async fn query_gates(&self, sql: &str, class: Option<GateClass>) -> EngineResult<Vec<Gate>> {
        let mut query = sqlx::query_as::<_, GateRow>(sql);
        if let Some(class) = class {
            query = query.bind(class.as_str());
        }
        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows
            .into_iter()
            .map(Gate::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn query_assignments(&self, sql: &str, key: Option<i64>) -> EngineResult<Vec<Assignment>> {
        let mut query = sqlx::query_as::<_, AssignmentRow>(sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows
            .into_iter()
            .map(Assignment::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn query_flights(&self, sql: &str) -> EngineResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(sql)
            .fetch_all(self.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(Flight::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_flight(&self, request: NewFlight) -> EngineResult<Flight> {
        let now = ts(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO flights (flight_number, aircraft_class, automaton_state, status, origin, destination,
                                 airline, scheduled_arrival, scheduled_departure, created_at, updated_at)
            VALUES (?1, ?2, 'S0', 'DETECTED', ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&request.flight_number)
        .bind(request.aircraft_class.as_str())
        .bind(&request.origin)
        .bind(&request.destination)
        .bind(&request.airline)
        .bind(request.scheduled_arrival.map(ts))
        .bind(request.scheduled_departure.map(ts))
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|err| duplicate_or(err, format!("flight {}", request.flight_number)))?;

        let id = result.last_insert_rowid();
        self.get_flight(id)
            .await?
            .ok_or(EngineError::FlightNotFound(id))
    }

    async fn get_flight(&self, id: FlightId) -> EngineResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Flight::try_from).transpose()?)
    }

    async fn list_flights(&self) -> EngineResult<Vec<Flight>> {
        self.query_flights(&format!("SELECT {FLIGHT_COLUMNS} FROM flights ORDER BY id"))
            .await
    }

    async fn find_flight_by_number(&self, flight_number: &str) -> EngineResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE flight_number = ?1"
        ))
        .bind(flight_number)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Flight::try_from).transpose()?)
    }

    async fn save_flight(&self, flight: &Flight) -> EngineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE flights SET
                aircraft_class = ?2, automaton_state = ?3, status = ?4,
                origin = ?5, destination = ?6, airline = ?7,
                scheduled_arrival = ?8, actual_arrival = ?9,
                scheduled_departure = ?10, actual_departure = ?11,
                detected_at = ?12, updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(flight.id)
        .bind(flight.aircraft_class.as_str())
        .bind(flight.automaton_state.code())
        .bind(flight.status().as_str())
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(&flight.airline)
        .bind(flight.scheduled_arrival.map(ts))
        .bind(flight.actual_arrival.map(ts))
        .bind(flight.scheduled_departure.map(ts))
        .bind(flight.actual_departure.map(ts))
        .bind(flight.detected_at.map(ts))
        .bind(ts(flight.updated_at))
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::FlightNotFound(flight.id));
        }
        Ok(())
    }

    async fn find_waiting_flights(&self) -> EngineResult<Vec<Flight>> {
        self.query_flights(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE automaton_state = 'S6' \
             ORDER BY detected_at IS NULL, detected_at, id"
        ))
        .await
    }

    async fn insert_gate(&self, request: NewGate) -> EngineResult<Gate> {
        let now = ts(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO gates (gate_number, gate_class, status, is_active, terminal, location, created_at, updated_at)
            VALUES (?1, ?2, 'FREE', 1, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&request.gate_number)
        .bind(request.gate_class.as_str())
        .bind(&request.terminal)
        .bind(&request.location)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|err| duplicate_or(err, format!("gate {}", request.gate_number)))?;

        let id = result.last_insert_rowid();
        self.get_gate(id).await?.ok_or(EngineError::GateNotFound(id))
    }

    async fn get_gate(&self, id: GateId) -> EngineResult<Option<Gate>> {
        let row = sqlx::query_as::<_, GateRow>(&format!(
            "SELECT {GATE_COLUMNS} FROM gates WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Gate::try_from).transpose()?)
    }

    async fn list_gates(&self) -> EngineResult<Vec<Gate>> {
        self.query_gates(&format!("SELECT {GATE_COLUMNS} FROM gates ORDER BY id"), None)
            .await
    }

    async fn find_available_gates_by_class(&self, class: GateClass) -> EngineResult<Vec<Gate>> {
        self.query_gates(
            &format!(
                "SELECT {GATE_COLUMNS} FROM gates WHERE {AVAILABLE} AND gate_class = ?1 ORDER BY id"
            ),
            Some(class),
        )
        .await
    }

    async fn find_available_gates_by_class_desc(&self) -> EngineResult<Vec<Gate>> {
        self.query_gates(
            &format!(
                "SELECT {GATE_COLUMNS} FROM gates WHERE {AVAILABLE} \
                 ORDER BY CASE gate_class WHEN 'JUMBO' THEN 3 WHEN 'WIDE_BODY' THEN 2 ELSE 1 END DESC, id"
            ),
            None,
        )
        .await
    }

    async fn set_gate_status(&self, id: GateId, status: GateStatus) -> EngineResult<Gate> {
        let result = sqlx::query(
            r#"
            UPDATE gates SET status = ?2, updated_at = ?3
            WHERE id = ?1
              AND NOT EXISTS (SELECT 1 FROM assignments WHERE gate_id = ?1 AND is_active = 1)
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(ts(Utc::now()))
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(if self.gate_exists(id).await? {
                EngineError::GateInUse(id)
            } else {
                EngineError::GateNotFound(id)
            });
        }
        self.get_gate(id).await?.ok_or(EngineError::GateNotFound(id))
    }

    async fn exists_active_assignment_for_flight(&self, flight_id: FlightId) -> EngineResult<bool> {
        Ok(self.find_active_assignment_for_flight(flight_id).await?.is_some())
    }

    async fn exists_active_assignment_for_gate(&self, gate_id: GateId) -> EngineResult<bool> {
        Ok(self.find_active_assignment_for_gate(gate_id).await?.is_some())
    }

    async fn find_active_assignment_for_flight(
        &self,
        flight_id: FlightId,
    ) -> EngineResult<Option<Assignment>> {
        let mut found = self
            .query_assignments(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE flight_id = ?1 AND is_active = 1"
                ),
                Some(flight_id),
            )
            .await?;
        Ok(found.pop())
    }

    async fn find_active_assignment_for_gate(
        &self,
        gate_id: GateId,
    ) -> EngineResult<Option<Assignment>> {
        let mut found = self
            .query_assignments(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE gate_id = ?1 AND is_active = 1"
                ),
                Some(gate_id),
            )
            .await?;
        Ok(found.pop())
    }

    async fn claim_gate(
        &self,
        flight_id: FlightId,
        gate_id: GateId,
        expected_arrival: Option<DateTime<Utc>>,
    ) -> EngineResult<Assignment> {
        let now = ts(Utc::now());
        let mut tx = self.pool().begin().await?;

        // Write first so the transaction takes the write lock up front.
        let swapped = sqlx::query(&format!(
            "UPDATE gates SET status = 'ASSIGNED', updated_at = ?2 WHERE id = ?1 AND {AVAILABLE}"
        ))
        .bind(gate_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if swapped.rows_affected() == 0 {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gates WHERE id = ?1")
                .bind(gate_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if count == 0 {
                EngineError::GateNotFound(gate_id)
            } else {
                EngineError::GateAlreadyOccupied(gate_id)
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO assignments (flight_id, gate_id, assigned_at, expected_arrival, is_active, led_activated)
            VALUES (?1, ?2, ?3, ?4, 1, 0)
            "#,
        )
        .bind(flight_id)
        .bind(gate_id)
        .bind(&now)
        .bind(expected_arrival.map(ts))
        .execute(&mut *tx)
        .await
        .map_err(|err| claim_conflict(err, flight_id, gate_id))?;

        let id = inserted.last_insert_rowid();
        tx.commit().await?;

        self.fetch_assignment(id).await
    }

    async fn record_arrival(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<Assignment> {
        let at = ts(at);
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE assignments SET actual_arrival = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(assignment_id)
        .bind(&at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(EngineError::AssignmentNotFound(assignment_id));
        }

        sqlx::query(
            "UPDATE gates SET status = 'OCCUPIED', updated_at = ?2 \
             WHERE id = (SELECT gate_id FROM assignments WHERE id = ?1)",
        )
        .bind(assignment_id)
        .bind(&at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.fetch_assignment(assignment_id).await
    }

    async fn complete_assignment(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<Assignment> {
        let at = ts(at);
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE assignments SET is_active = 0, led_activated = 0, departure_time = ?2 \
             WHERE id = ?1 AND is_active = 1",
        )
        .bind(assignment_id)
        .bind(&at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(EngineError::AssignmentNotFound(assignment_id));
        }

        sqlx::query(
            "UPDATE gates SET status = 'FREE', updated_at = ?2 \
             WHERE id = (SELECT gate_id FROM assignments WHERE id = ?1)",
        )
        .bind(assignment_id)
        .bind(&at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.fetch_assignment(assignment_id).await
    }

    async fn set_led_activated(&self, assignment_id: AssignmentId, on: bool) -> EngineResult<()> {
        let result = sqlx::query("UPDATE assignments SET led_activated = ?2 WHERE id = ?1")
            .bind(assignment_id)
            .bind(on)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::AssignmentNotFound(assignment_id));
        }
        Ok(())
    }

    async fn list_active_assignments(&self) -> EngineResult<Vec<Assignment>> {
        self.query_assignments(
            &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE is_active = 1 ORDER BY id"),
            None,
        )
        .await
    }

    async fn gate_history(&self, gate_id: GateId) -> EngineResult<Vec<Assignment>> {
        self.query_assignments(
            &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE gate_id = ?1 \
                 ORDER BY assigned_at DESC, id DESC"
            ),
            Some(gate_id),
        )
        .await
    }
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    value.as_deref().map(parse_ts).transpose()
}

fn decode<T: FromStr<Err = UnknownCode>>(value: &str) -> Result<T, sqlx::Error> {
    value.parse().map_err(|e: UnknownCode| sqlx::Error::Decode(Box::new(e)))
}

fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Some(db_err.message()),
        _ => None,
    }
}

fn duplicate_or(err: sqlx::Error, what: String) -> EngineError {
    if unique_violation(&err).is_some() {
        EngineError::Duplicate(what)
    } else {
        EngineError::Storage(err)
    }
}

fn claim_conflict(err: sqlx::Error, flight_id: FlightId, gate_id: GateId) -> EngineError {
    match unique_violation(&err) {
        Some(message) if message.contains("flight") => EngineError::FlightAlreadyAssigned(flight_id),
        Some(_) => EngineError::GateAlreadyOccupied(gate_id),
        None => EngineError::Storage(err),
    }
}

// Internal row types for SQLx
#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    flight_number: String,
    aircraft_class: String,
    automaton_state: String,
    origin: Option<String>,
    destination: Option<String>,
    airline: Option<String>,
    scheduled_arrival: Option<String>,
    actual_arrival: Option<String>,
    scheduled_departure: Option<String>,
    actual_departure: Option<String>,
    detected_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FlightRow> for Flight {
    type Error = sqlx::Error;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            aircraft_class: decode(&row.aircraft_class)?,
            automaton_state: decode(&row.automaton_state)?,
            origin: row.origin,
            destination: row.destination,
            airline: row.airline,
            scheduled_arrival: parse_opt_ts(row.scheduled_arrival)?,
            actual_arrival: parse_opt_ts(row.actual_arrival)?,
            scheduled_departure: parse_opt_ts(row.scheduled_departure)?,
            actual_departure: parse_opt_ts(row.actual_departure)?,
            detected_at: parse_opt_ts(row.detected_at)?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GateRow {
    id: i64,
    gate_number: String,
    gate_class: String,
    status: String,
    is_active: bool,
    terminal: Option<String>,
    location: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<GateRow> for Gate {
    type Error = sqlx::Error;

    fn try_from(row: GateRow) -> Result<Self, Self::Error> {
        Ok(Gate {
            id: row.id,
            gate_number: row.gate_number,
            gate_class: decode(&row.gate_class)?,
            status: decode(&row.status)?,
            is_active: row.is_active,
            terminal: row.terminal,
            location: row.location,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: i64,
    flight_id: i64,
    gate_id: i64,
    assigned_at: String,
    expected_arrival: Option<String>,
    actual_arrival: Option<String>,
    departure_time: Option<String>,
    is_active: bool,
    led_activated: bool,
    notes: Option<String>,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = sqlx::Error;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: row.id,
            flight_id: row.flight_id,
            gate_id: row.gate_id,
            assigned_at: parse_ts(&row.assigned_at)?,
            expected_arrival: parse_opt_ts(row.expected_arrival)?,
            actual_arrival: parse_opt_ts(row.actual_arrival)?,
            departure_time: parse_opt_ts(row.departure_time)?,
            is_active: row.is_active,
            led_activated: row.led_activated,
            notes: row.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_memory_database;
    use apron_core::{AircraftClass, AutomatonState};

    async fn store() -> SqliteStore {
        SqliteStore::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_flight_round_trips_through_sqlite() {
        let store = store().await;
        let flight = store
            .insert_flight(NewFlight::new("AV101", AircraftClass::WideBody).with_route("BOG", "MDE", "Avianca"))
            .await
            .unwrap();
        assert_eq!(flight.automaton_state, AutomatonState::S0);

        let mut updated = flight.clone();
        updated.apply_state(AutomatonState::S6, Utc::now());
        updated.detected_at = Some(Utc::now());
        store.save_flight(&updated).await.unwrap();

        let waiting = store.find_waiting_flights().await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].flight_number, "AV101");
        assert_eq!(waiting[0].origin.as_deref(), Some("BOG"));

        let err = store
            .insert_flight(NewFlight::new("AV101", AircraftClass::Jumbo))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_claim_enforces_single_active_assignment() {
        let store = store().await;
        let a = store.insert_flight(NewFlight::new("AV101", AircraftClass::NarrowBody)).await.unwrap();
        let b = store.insert_flight(NewFlight::new("AV102", AircraftClass::NarrowBody)).await.unwrap();
        let gate = store.insert_gate(NewGate::new("C1", GateClass::NarrowBody)).await.unwrap();
        let other = store.insert_gate(NewGate::new("C2", GateClass::NarrowBody)).await.unwrap();

        let assignment = store.claim_gate(a.id, gate.id, None).await.unwrap();
        assert!(assignment.is_active);
        assert_eq!(store.get_gate(gate.id).await.unwrap().unwrap().status, GateStatus::Assigned);

        let err = store.claim_gate(b.id, gate.id, None).await.unwrap_err();
        assert!(matches!(err, EngineError::GateAlreadyOccupied(_)));

        let err = store.claim_gate(a.id, other.id, None).await.unwrap_err();
        assert!(matches!(err, EngineError::FlightAlreadyAssigned(_)));
        // The failed claim rolled back its gate update.
        assert_eq!(store.get_gate(other.id).await.unwrap().unwrap().status, GateStatus::Free);

        let err = store.claim_gate(b.id, 999, None).await.unwrap_err();
        assert!(matches!(err, EngineError::GateNotFound(999)));
    }

    #[tokio::test]
    async fn test_arrival_and_departure_update_gate() {
        let store = store().await;
        let flight = store.insert_flight(NewFlight::new("AV101", AircraftClass::Jumbo)).await.unwrap();
        let gate = store.insert_gate(NewGate::new("A1", GateClass::Jumbo)).await.unwrap();
        let assignment = store.claim_gate(flight.id, gate.id, None).await.unwrap();

        store.set_led_activated(assignment.id, true).await.unwrap();
        store.record_arrival(assignment.id, Utc::now()).await.unwrap();
        assert_eq!(store.get_gate(gate.id).await.unwrap().unwrap().status, GateStatus::Occupied);

        let err = store.set_gate_status(gate.id, GateStatus::Maintenance).await.unwrap_err();
        assert!(matches!(err, EngineError::GateInUse(_)));

        let done = store.complete_assignment(assignment.id, Utc::now()).await.unwrap();
        assert!(!done.is_active);
        assert!(!done.led_activated);
        assert_eq!(store.get_gate(gate.id).await.unwrap().unwrap().status, GateStatus::Free);
        assert!(store.list_active_assignments().await.unwrap().is_empty());
        assert_eq!(store.gate_history(gate.id).await.unwrap().len(), 1);

        // The gate can be claimed again once the old assignment is inactive.
        store.claim_gate(flight.id, gate.id, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_available_gates_ordering() {
        let store = store().await;
        store.insert_gate(NewGate::new("C1", GateClass::NarrowBody)).await.unwrap();
        store.insert_gate(NewGate::new("B1", GateClass::WideBody)).await.unwrap();
        let jumbo = store.insert_gate(NewGate::new("A1", GateClass::Jumbo)).await.unwrap();
        store.insert_gate(NewGate::new("B2", GateClass::WideBody)).await.unwrap();

        let numbers: Vec<String> = store
            .find_available_gates_by_class_desc()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.gate_number)
            .collect();
        assert_eq!(numbers, ["A1", "B1", "B2", "C1"]);

        store.set_gate_status(jumbo.id, GateStatus::Reserved).await.unwrap();
        assert_eq!(store.find_available_gates_by_class(GateClass::Jumbo).await.unwrap().len(), 1);
        store.set_gate_status(jumbo.id, GateStatus::Maintenance).await.unwrap();
        assert!(store.find_available_gates_by_class(GateClass::Jumbo).await.unwrap().is_empty());
    }
}
