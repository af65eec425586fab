use skyseat_core::{Flight, SeatMap, SeedError};
use tracing::info;

use crate::app_config::{CabinLayout, FleetConfig, FlightSeed};

const SEAT_LETTERS: &str = "ABCDEF";

/// Builds the process seat map from the configured fleet, all seats vacant.
pub fn build_seat_map(fleet: &FleetConfig) -> Result<SeatMap, SeedError> {
    if fleet.flights.is_empty() {
        return Err(SeedError::EmptyFleet);
    }

    let mut seat_map = SeatMap::new();
    for seed in &fleet.flights {
        let flight = Flight::new(seed.id.clone(), seed.seat_ids()?)?;
        info!(flight_id = %seed.id, seats = flight.len(), "flight seeded");
        seat_map.insert_flight(flight)?;
    }
    Ok(seat_map)
}

impl FlightSeed {
    pub fn seat_ids(&self) -> Result<Vec<String>, SeedError> {
        match (&self.layout, self.seats.is_empty()) {
            (Some(_), false) => Err(SeedError::InvalidLayout {
                flight_id: self.id.clone(),
                reason: "declare either `seats` or `layout`, not both".into(),
            }),
            (Some(layout), true) => layout.seat_ids(&self.id),
            (None, _) => Ok(self.seats.clone()),
        }
    }
}

impl CabinLayout {
    pub fn seat_ids(&self, flight_id: &str) -> Result<Vec<String>, SeedError> {
        let invalid = |reason: String| SeedError::InvalidLayout {
            flight_id: flight_id.to_string(),
            reason,
        };

        if self.rows == 0 {
            return Err(invalid("a cabin needs at least one row".into()));
        }
        let per_row = usize::try_from(self.seats_per_row)
            .ok()
            .filter(|n| (1..=SEAT_LETTERS.len()).contains(n))
            .ok_or_else(|| {
                invalid(format!(
                    "seats_per_row must be between 1 and {}, got {}",
                    SEAT_LETTERS.len(),
                    self.seats_per_row
                ))
            })?;

        Ok((1..=self.rows)
            .flat_map(|row| {
                SEAT_LETTERS[..per_row]
                    .chars()
                    .map(move |letter| format!("{row}{letter}"))
            })
            .collect())
    }
}
