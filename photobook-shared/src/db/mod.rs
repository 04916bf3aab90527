/// Database layer: connection pool and embedded migrations
///
/// Models are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
