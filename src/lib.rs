// src/lib.rs

//! blogsync Library
//!
//! Incrementally syncs a blog's articles and notes, rehosting embedded
//! images along the way.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
