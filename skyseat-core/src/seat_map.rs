use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::service::ServiceError;

/// Name of the passenger holding a seat. Never empty or blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PassengerName(String);

impl PassengerName {
    pub fn new(name: impl Into<String>) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidPassengerName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PassengerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    id: String,
    occupant: Option<PassengerName>,
}

impl Seat {
    pub fn vacant(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            occupant: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn occupant(&self) -> Option<&PassengerName> {
        self.occupant.as_ref()
    }

    pub fn is_vacant(&self) -> bool {
        self.occupant.is_none()
    }

    /// Seats the passenger if the seat is free. Returns `false` and leaves the
    /// current occupant in place otherwise.
    pub fn occupy(&mut self, passenger: PassengerName) -> bool {
        if self.occupant.is_some() {
            return false;
        }
        self.occupant = Some(passenger);
        true
    }

    /// Clears the occupant. Returns `false` if the seat was already vacant.
    pub fn vacate(&mut self) -> bool {
        self.occupant.take().is_some()
    }
}

/// A flight and its fixed set of seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight {
    id: String,
    seats: HashMap<String, Seat>,
}

impl Flight {
    /// Builds a flight with every seat vacant. Seat ids must be unique and the
    /// flight must have at least one seat.
    pub fn new<I, S>(id: impl Into<String>, seat_ids: I) -> Result<Self, SeedError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SeedError::EmptyIdentifier);
        }

        let mut seats = HashMap::new();
        for seat_id in seat_ids {
            let seat_id = seat_id.into();
            if seat_id.trim().is_empty() {
                return Err(SeedError::EmptyIdentifier);
            }
            if seats.contains_key(&seat_id) {
                return Err(SeedError::DuplicateSeat {
                    flight_id: id,
                    seat_id,
                });
            }
            seats.insert(seat_id.clone(), Seat::vacant(seat_id));
        }

        if seats.is_empty() {
            return Err(SeedError::EmptyFlight(id));
        }

        Ok(Self { id, seats })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.get(seat_id)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    fn snapshot(&self) -> FlightSnapshot {
        FlightSnapshot {
            seats: self
                .seats
                .values()
                .map(|seat| {
                    (
                        seat.id.clone(),
                        seat.occupant.as_ref().map(|name| name.0.clone()),
                    )
                })
                .collect(),
        }
    }
}

/// Every flight known to the process. Lives inside the gate; callers only
/// ever see it through a guard or as a [`SeatMapSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatMap {
    flights: HashMap<String, Flight>,
}

impl SeatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_flight(&mut self, flight: Flight) -> Result<(), SeedError> {
        if self.flights.contains_key(flight.id()) {
            return Err(SeedError::DuplicateFlight(flight.id));
        }
        self.flights.insert(flight.id.clone(), flight);
        Ok(())
    }

    pub fn flight(&self, flight_id: &str) -> Option<&Flight> {
        self.flights.get(flight_id)
    }

    pub fn flights(&self) -> impl Iterator<Item = &Flight> {
        self.flights.values()
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Looks up a seat for mutation, distinguishing an unknown flight from an
    /// unknown seat on a known flight.
    pub fn seat_mut(&mut self, flight_id: &str, seat_id: &str) -> Result<&mut Seat, ServiceError> {
        let flight = self
            .flights
            .get_mut(flight_id)
            .ok_or_else(|| ServiceError::UnknownFlight(flight_id.to_string()))?;

        flight
            .seats
            .get_mut(seat_id)
            .ok_or_else(|| ServiceError::UnknownSeat {
                flight_id: flight_id.to_string(),
                seat_id: seat_id.to_string(),
            })
    }

    /// Vacates every seat of every flight. Returns how many seats were occupied.
    pub fn vacate_all(&mut self) -> usize {
        self.flights
            .values_mut()
            .flat_map(|flight| flight.seats.values_mut())
            .map(Seat::vacate)
            .filter(|was_occupied| *was_occupied)
            .count()
    }

    /// Deep copy of the current occupancy. Occupant names are cloned, so the
    /// result is unaffected by later writes.
    pub fn snapshot(&self) -> SeatMapSnapshot {
        SeatMapSnapshot {
            flights: self
                .flights
                .values()
                .map(|flight| (flight.id.clone(), flight.snapshot()))
                .collect(),
        }
    }
}

/// Point-in-time copy of a [`SeatMap`], keyed by flight id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeatMapSnapshot {
    flights: BTreeMap<String, FlightSnapshot>,
}

impl SeatMapSnapshot {
    pub fn flight(&self, flight_id: &str) -> Option<&FlightSnapshot> {
        self.flights.get(flight_id)
    }

    /// Occupant of a seat, `None` when the seat is vacant or unknown.
    pub fn occupant(&self, flight_id: &str, seat_id: &str) -> Option<&str> {
        self.flight(flight_id)?.occupant(seat_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlightSnapshot)> {
        self.flights.iter().map(|(id, flight)| (id.as_str(), flight))
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn seat_count(&self) -> usize {
        self.flights.values().map(FlightSnapshot::len).sum()
    }

    pub fn occupied_count(&self) -> usize {
        self.flights.values().map(FlightSnapshot::occupied_count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlightSnapshot {
    seats: BTreeMap<String, Option<String>>,
}

impl FlightSnapshot {
    pub fn occupant(&self, seat_id: &str) -> Option<&str> {
        self.seats.get(seat_id)?.as_deref()
    }

    pub fn contains_seat(&self, seat_id: &str) -> bool {
        self.seats.contains_key(seat_id)
    }

    /// Seats in id order with their occupant, if any.
    pub fn seats(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.seats
            .iter()
            .map(|(id, occupant)| (id.as_str(), occupant.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.values().filter(|occupant| occupant.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeedError {
    #[error("fleet has no flights")]
    EmptyFleet,

    #[error("flight and seat identifiers must not be empty")]
    EmptyIdentifier,

    #[error("flight `{0}` is declared more than once")]
    DuplicateFlight(String),

    #[error("flight `{flight_id}` declares seat `{seat_id}` more than once")]
    DuplicateSeat { flight_id: String, seat_id: String },

    #[error("flight `{0}` has no seats")]
    EmptyFlight(String),

    #[error("flight `{flight_id}` has an invalid layout: {reason}")]
    InvalidLayout { flight_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat_map() -> SeatMap {
        let mut map = SeatMap::new();
        map.insert_flight(Flight::new("vuelo_123", ["A1", "A2", "B1"]).unwrap())
            .unwrap();
        map
    }

    #[test]
    fn test_blank_passenger_name_is_rejected() {
        assert_eq!(PassengerName::new(""), Err(ServiceError::InvalidPassengerName));
        assert_eq!(PassengerName::new("   "), Err(ServiceError::InvalidPassengerName));
        assert_eq!(PassengerName::new("Alice").unwrap().as_str(), "Alice");
    }

    #[test]
    fn test_seat_occupy_and_vacate() {
        let mut seat = Seat::vacant("A1");
        assert!(seat.occupy(PassengerName::new("Alice").unwrap()));
        assert!(!seat.occupy(PassengerName::new("Bob").unwrap()));
        assert_eq!(seat.occupant().unwrap().as_str(), "Alice");

        assert!(seat.vacate());
        assert!(!seat.vacate());
        assert!(seat.is_vacant());
    }

    #[test]
    fn test_flight_rejects_duplicate_and_missing_seats() {
        assert_eq!(
            Flight::new("KT123", ["1A", "1A"]),
            Err(SeedError::DuplicateSeat {
                flight_id: "KT123".to_string(),
                seat_id: "1A".to_string(),
            })
        );
        assert_eq!(
            Flight::new("KT123", Vec::<String>::new()),
            Err(SeedError::EmptyFlight("KT123".to_string()))
        );
        assert_eq!(Flight::new("", ["1A"]), Err(SeedError::EmptyIdentifier));
    }

    #[test]
    fn test_duplicate_flight_is_rejected() {
        let mut map = seat_map();
        let err = map
            .insert_flight(Flight::new("vuelo_123", ["Z9"]).unwrap())
            .unwrap_err();
        assert_eq!(err, SeedError::DuplicateFlight("vuelo_123".to_string()));
        assert!(map.flight("vuelo_123").unwrap().seat("Z9").is_none());
    }

    #[test]
    fn test_seat_lookup_distinguishes_flight_and_seat() {
        let mut map = seat_map();
        assert_eq!(
            map.seat_mut("vuelo_999", "A1").unwrap_err(),
            ServiceError::UnknownFlight("vuelo_999".to_string())
        );
        assert_eq!(
            map.seat_mut("vuelo_123", "Z9").unwrap_err(),
            ServiceError::UnknownSeat {
                flight_id: "vuelo_123".to_string(),
                seat_id: "Z9".to_string(),
            }
        );
        assert!(map.seat_mut("vuelo_123", "A1").is_ok());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_writes() {
        let mut map = seat_map();
        map.seat_mut("vuelo_123", "A1")
            .unwrap()
            .occupy(PassengerName::new("Alice").unwrap());

        let snapshot = map.snapshot();
        map.seat_mut("vuelo_123", "A1").unwrap().vacate();
        map.seat_mut("vuelo_123", "B1")
            .unwrap()
            .occupy(PassengerName::new("Bob").unwrap());

        assert_eq!(snapshot.occupant("vuelo_123", "A1"), Some("Alice"));
        assert_eq!(snapshot.occupant("vuelo_123", "B1"), None);
        assert!(snapshot.flight("vuelo_123").unwrap().contains_seat("B1"));
        assert!(!snapshot.flight("vuelo_123").unwrap().contains_seat("Z9"));
        assert_eq!(snapshot.occupied_count(), 1);
        assert_eq!(snapshot.seat_count(), 3);
    }

    #[test]
    fn test_vacate_all_counts_released_seats() {
        let mut map = seat_map();
        for seat_id in ["A1", "B1"] {
            map.seat_mut("vuelo_123", seat_id)
                .unwrap()
                .occupy(PassengerName::new("Alice").unwrap());
        }

        assert_eq!(map.vacate_all(), 2);
        assert_eq!(map.vacate_all(), 0);
        assert_eq!(map.snapshot().occupied_count(), 0);
    }

    #[test]
    fn test_snapshot_serializes_as_nested_maps() {
        let mut map = seat_map();
        map.seat_mut("vuelo_123", "A2")
            .unwrap()
            .occupy(PassengerName::new("Alice").unwrap());

        let json = serde_json::to_value(map.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "vuelo_123": { "seats": { "A1": null, "A2": "Alice", "B1": null } }
            })
        );
    }
}
