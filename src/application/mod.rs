pub mod builder;
pub mod cache_key;
pub mod dto;
pub mod errors;
pub mod generator;
pub mod lifecycle;
pub mod locks;
pub mod partition;
pub mod policy;
pub mod ports;
pub mod use_cases;
