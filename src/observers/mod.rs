// Consumers of solver output that run alongside the simulation

pub mod imgstream;
pub mod tracers;
