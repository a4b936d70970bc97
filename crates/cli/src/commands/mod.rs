pub mod backfill;
pub mod replenish;
pub mod schema;
pub mod seed;
pub mod stream;
