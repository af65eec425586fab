use std::time::Duration;

use tracing::{debug, info, warn};

use crate::gate::{Gate, GateError, GateStats, ReadGuard, WriteGuard};
use crate::seat_map::{PassengerName, SeatMap, SeatMapSnapshot};
use crate::CoreResult;

/// Query, reserve, cancel and reset over one shared [`SeatMap`].
///
/// Built once at startup and shared by reference (usually behind an `Arc`).
/// Every operation is a single critical section: reads see a whole state,
/// never half of a write.
#[derive(Debug)]
pub struct FlightService {
    gate: Gate<SeatMap>,
    acquire_timeout: Option<Duration>,
}

impl FlightService {
    pub fn new(seat_map: SeatMap) -> Self {
        Self::with_acquire_timeout(seat_map, None)
    }

    /// With `Some(timeout)`, operations that cannot enter the gate in time
    /// fail with [`ServiceError::Busy`] instead of blocking indefinitely.
    pub fn with_acquire_timeout(seat_map: SeatMap, acquire_timeout: Option<Duration>) -> Self {
        Self {
            gate: Gate::new(seat_map),
            acquire_timeout,
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    pub fn gate_stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// Consistent copy of every flight's seats.
    pub fn query_all(&self) -> CoreResult<SeatMapSnapshot> {
        let seat_map = self.read()?;
        let snapshot = seat_map.snapshot();
        drop(seat_map);

        debug!(
            flights = snapshot.len(),
            occupied = snapshot.occupied_count(),
            "seat map snapshot taken"
        );
        Ok(snapshot)
    }

    /// Seats `passenger` if the seat is vacant. `Ok(false)` means the seat was
    /// already taken and nothing changed.
    pub fn reserve(&self, flight_id: &str, seat_id: &str, passenger: &str) -> CoreResult<bool> {
        let passenger = PassengerName::new(passenger)?;

        let mut seat_map = self.write()?;
        let seat = seat_map
            .seat_mut(flight_id, seat_id)
            .inspect_err(|err| warn!(flight_id, seat_id, %err, "reserve on unknown seat"))?;
        let reserved = seat.occupy(passenger);
        drop(seat_map);

        if reserved {
            info!(flight_id, seat_id, "seat reserved");
        } else {
            debug!(flight_id, seat_id, "seat already occupied");
        }
        Ok(reserved)
    }

    /// Vacates the seat. `Ok(false)` means it was already vacant.
    pub fn cancel(&self, flight_id: &str, seat_id: &str) -> CoreResult<bool> {
        let mut seat_map = self.write()?;
        let seat = seat_map
            .seat_mut(flight_id, seat_id)
            .inspect_err(|err| warn!(flight_id, seat_id, %err, "cancel on unknown seat"))?;
        let cancelled = seat.vacate();
        drop(seat_map);

        if cancelled {
            info!(flight_id, seat_id, "reservation cancelled");
        } else {
            debug!(flight_id, seat_id, "seat already vacant");
        }
        Ok(cancelled)
    }

    /// Vacates every seat on every flight.
    pub fn reset_all(&self) -> CoreResult<()> {
        let released = self.write()?.vacate_all();
        info!(released, "all seats reset");
        Ok(())
    }

    fn read(&self) -> Result<ReadGuard<'_, SeatMap>, GateError> {
        match self.acquire_timeout {
            Some(timeout) => self.gate.enter_read_timeout(timeout),
            None => Ok(self.gate.enter_read()),
        }
    }

    fn write(&self) -> Result<WriteGuard<'_, SeatMap>, GateError> {
        match self.acquire_timeout {
            Some(timeout) => self.gate.enter_write_timeout(timeout),
            None => Ok(self.gate.enter_write()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("unknown flight `{0}`")]
    UnknownFlight(String),

    #[error("unknown seat `{seat_id}` on flight `{flight_id}`")]
    UnknownSeat { flight_id: String, seat_id: String },

    #[error("passenger name must not be empty")]
    InvalidPassengerName,

    #[error("seat map is busy: {0}")]
    Busy(#[from] GateError),
}

impl ServiceError {
    /// True for references to flights or seats that do not exist.
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, Self::UnknownFlight(_) | Self::UnknownSeat { .. })
    }
}
