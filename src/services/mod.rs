//! Application services orchestrating the domain layer

pub mod deploy_service;
