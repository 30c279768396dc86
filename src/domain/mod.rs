// Domain layer: models, the CSV schema and the ports the adapters implement.

pub mod model;
pub mod ports;
pub mod schema;
