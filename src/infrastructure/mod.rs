pub mod db;
pub mod inference;
pub mod queue;
pub mod storage;
