//! lexsite - marketing site and lead-management backend for a law firm
//!
//! Serves the public site API (practice areas, blog, testimonials, contact
//! form, newsletter, fee calculator) and the staff dashboard API (lead
//! pipeline, content management, users).

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
