//! Application core: domain logic with no I/O of its own.
//!
//! This module contains the business rules for a feeder controller and
//! its status board: persisted schedule state, the outbound event
//! vocabulary, and the two service loops.  All interaction with sensors,
//! pins, files and sockets happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable on simulated time.

pub mod events;
pub mod ports;
pub mod service;
pub mod state;
