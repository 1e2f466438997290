#[cfg(test)]
pub mod action_gate_tests;
#[cfg(test)]
pub mod metadata_rotation_tests;
#[cfg(test)]
pub mod phase_polling_tests;
#[cfg(test)]
pub mod scenario_tests;
#[cfg(test)]
pub mod utils;
