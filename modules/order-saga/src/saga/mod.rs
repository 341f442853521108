pub mod compensation;
pub mod executor;

pub use compensation::{run_compensation, CompensationOutcome};
pub use executor::{execute_saga, SagaOutcome};
