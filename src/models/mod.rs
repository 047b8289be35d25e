//! Request and Response models for the service APIs
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    CacheItemRequest, CacheQuery, IdentityRequest, LimitSetRequest, MetricUpdateRequest,
};
pub use responses::{ActiveUsersResponse, HealthResponse, LimitResponse, StatsResponse};
