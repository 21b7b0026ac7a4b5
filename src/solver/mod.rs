mod gs;

pub use gs::{GsSolver, SolverConfig};
pub(crate) use gs::get_two_mut;
