//! DonorDB Core Types
//!
//! This crate provides the foundational types used throughout DonorDB:
//! - Identity types (DonatorId, ProvinceId, EntityKind)
//! - Entity structures (Donator, Province)

mod entity;
mod id;

pub use entity::*;
pub use id::*;
