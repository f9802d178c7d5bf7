//! Integration Tests Module
//!
//! End-to-end tests for the Yojna Setu service: multi-turn eligibility
//! conversations against SQLite storage, and the HTTP routes driven through
//! the axum router with scripted chat and speech providers.

// Scripted providers, state builders and request helpers
mod support;

// Multi-turn conversations through the agent service
mod eligibility_flow_test;

// HTTP routes through the router
mod routes_test;
