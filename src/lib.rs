//! Two small JSON services sharing one crate.
//!
//! * **news service** – accounts with bcrypt-hashed passwords, JWT login, and
//!   an `/articles` feed built from per-category web searches (Serper).
//! * **family service** – admin-gated family directory with embedded members
//!   and a family photo hosted on Cloudinary. Photos are uploaded after the
//!   create request has been answered.
//!
//! Both binaries live in `src/bin/`; the routers are in [`api`].

pub mod api;
pub mod config;
pub mod database;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;
