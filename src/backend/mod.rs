//! Output backends: both consume the same optimized [`crate::sir::SirProgram`].

pub mod c_emit;
pub mod sir_text;
