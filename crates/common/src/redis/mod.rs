pub mod dedup_store;

pub use dedup_store::RedisDedupStore;
