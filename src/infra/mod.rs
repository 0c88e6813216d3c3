pub mod cache;
pub mod db;
pub mod payments;
pub mod storage;
