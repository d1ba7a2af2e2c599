pub mod campaign;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use seeds::resolve_seed_inputs;
pub use tester::*;
