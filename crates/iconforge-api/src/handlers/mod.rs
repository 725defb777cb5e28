//! API route handlers

pub mod forge;
pub mod health;
pub mod materials;
