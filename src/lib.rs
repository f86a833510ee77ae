//! Goalkeeper - reconciles payment checkout completions with commitment goals
//!
//! This library provides the goal store, the Stripe checkout-session client,
//! and the HTTP handlers that tie a completed checkout to exactly one active goal.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payments;
