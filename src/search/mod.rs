pub mod backtrack;
pub mod confusion;
pub mod decoder;
pub mod evaluation;
