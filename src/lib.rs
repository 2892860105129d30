//! Intersection Simulation Library
//!
//! A signalized-intersection traffic simulation that runs headless: an
//! adaptive two-phase signal controller, autonomous vehicle agents and a
//! density-driven traffic generator, advanced tick by tick from a single
//! session object.

pub mod simulation;
