//! A central limit order book matching engine for a single instrument.
//!
//! The crate is organized bottom-up: fixed-point [`price`], the [`order`]
//! and [`trade`] domain types, the [`orderbook`] price-level index and
//! matcher, a durable [`repository`], the serializing [`engine`], and the
//! [`snapshot`] view used by both queries and the push stream. [`api`] and
//! [`ws`] wire all of it to an `axum` HTTP and WebSocket surface.

pub mod api;
pub mod config;
pub mod engine;
pub mod order;
pub mod orderbook;
pub mod price;
pub mod repository;
pub mod snapshot;
pub mod time;
pub mod trade;
pub mod ws;
