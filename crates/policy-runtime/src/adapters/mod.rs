//! Runtime adapters wrapped around the collaborator ports.

pub mod metered;

pub use metered::MeteredLedger;
