//! Seat occupancy for a small flight inventory, guarded by a writer-priority
//! readers–writers gate.
//!
//! [`FlightService`] is the only way in: queries take the gate in read mode
//! and return an owned [`SeatMapSnapshot`], while reservations, cancellations
//! and resets take it in write mode.

pub mod gate;
pub mod seat_map;
pub mod service;

pub use gate::{AccessMode, Gate, GateError, GateMode, GateStats, ReadGuard, WriteGuard};
pub use seat_map::{
    Flight, FlightSnapshot, PassengerName, Seat, SeatMap, SeatMapSnapshot, SeedError,
};
pub use service::{FlightService, ServiceError};

pub type CoreResult<T> = Result<T, ServiceError>;
