//! Bluesky legacy bridge library.
//!
//! A service that lets clients written for the old numeric-ID Twitter v1
//! API read and write a Bluesky account. Identifiers cross the boundary
//! through a reversible integer codec ([`bridge`]), and the upstream's
//! opaque cursor pagination is bridged to `max_id`-style paging through an
//! encrypted per-session continuation store ([`continuation`]).

pub mod auth;
pub mod bluesky;
pub mod bridge;
pub mod config;
pub mod continuation;
pub mod crypto;
pub mod db;
pub mod legacy;
pub mod timeline;
pub mod web;
