// Domain layer: resource-file model and the ports the export core talks through.

pub mod model;
pub mod ports;
