//! Data Transfer Objects
//!
//! Request bodies and parameters sent to the Woodpecker CI API.

pub mod pipeline;
