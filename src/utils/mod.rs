// src/utils/mod.rs

pub mod hash;
pub mod id;
pub mod jwt;
