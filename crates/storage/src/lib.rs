pub mod http;
pub mod local;
pub mod memory;
pub mod records;
pub mod repository;
pub mod sqlite;
