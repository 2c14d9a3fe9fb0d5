//! # Café Telegram Bot
//!
//! A Telegram bot front end for a café, talking to small backend services
//! (auth, menu, promo, info, media) through a JSON request/response
//! envelope. Customers browse the menu and promotions; admins manage them
//! through guided multi-step dialogues.

pub mod access;
pub mod bot;
pub mod client;
pub mod config;
pub mod controller;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod memory;
pub mod models;
pub mod rpc;
pub mod server;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod validation;
