//! Churn Prediction Client Library
//!
//! This library provides the client side of the bank churn prediction
//! service: form validation, payload construction, the HTTP prediction
//! protocol, and the controller that ties them together.
//!
//! # Modules
//!
//! - `core`: Domain-layer re-exports (models, validation, normalization).
//! - `integrations`: External service integrations.
//! - `cancellation`: Cancellation source/token pair for in-flight requests.
//! - `config`: Configuration management.
//! - `errors`: Prediction failure types.
//! - `form_controller`: Form state and single in-flight submission.
//! - `models`: Form, payload and result data models.
//! - `normalize`: Response shape normalization.
//! - `prediction_client`: Churn prediction API client.
//! - `validation`: Field validation and payload coercion.

pub mod core;
pub mod integrations;

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod form_controller;
pub mod models;
pub mod normalize;
pub mod prediction_client;
pub mod validation;
