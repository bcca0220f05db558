//! # Academic Orders Bot
//!
//! A Telegram bot that takes orders for academic work: students place
//! orders through a step-by-step dialogue, pay by card transfer and leave
//! reviews, while a single admin prices orders, confirms payments and
//! answers questions.
//!
//! ## Features
//! - Order wizard with optional file upload
//! - Manual payment flow with receipt review
//! - Support messages and reviews with admin replies
//! - Admin panel with statistics and broadcasts
//! - Deadline alerts for the admin
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Background services: deadline alerts, broadcasts, file storage, health
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
