//! Data Transfer Objects for the external services
//!
//! Wire shapes for the job service (Glue), the repository service
//! (CodeCommit) and the pipeline callback (CodePipeline). Field names follow
//! each service's JSON protocol.

pub mod codecommit;
pub mod codepipeline;
pub mod glue;
