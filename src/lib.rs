pub mod cache;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod export;
pub mod llm;
pub mod merge;
pub mod pipeline;
