// Domain layer: core models and ports (interfaces). No dependencies on the
// adapters or config layers.

pub mod model;
pub mod ports;
