//! Hail Core Library
//!
//! Core functionality for Hail - private rideshare driver tracking over
//! Nostr. A rider follows a small roster of independent drivers, receives
//! their end-to-end encrypted location broadcasts over public relays, and
//! gets a live availability view plus fare estimates - without any central
//! dispatch server learning who follows whom or where anyone is.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod fare;
pub mod keys;
pub mod location;
pub mod nostr;
pub mod relay;
pub mod roster;
