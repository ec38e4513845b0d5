//! Background loops for continuous processing.

pub mod waiting_flight_loop;
