//! Perch Core
//!
//! Core types shared by the Perch client and tool server.
//!
//! This crate contains:
//! - Domain types: entities returned by the Woodpecker CI API (Repo, Pipeline, etc.)
//! - DTOs: request bodies and parameters sent to the Woodpecker CI API

pub mod domain;
pub mod dto;
