//! Gluepipe Core
//!
//! Core types shared by the Gluepipe stage handlers.
//!
//! This crate contains:
//! - Domain types: the stage event, job configuration, commit directive and
//!   completion result that flow through a single invocation
//! - DTOs: request/response shapes for the job, repository and pipeline services

pub mod domain;
pub mod dto;
