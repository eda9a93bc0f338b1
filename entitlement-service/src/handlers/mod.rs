pub mod access;
pub mod activation;
pub mod admin;
pub mod business;
pub mod subscription;
pub mod webhook;
