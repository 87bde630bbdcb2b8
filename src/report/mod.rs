pub mod assembler;
pub mod narrative;
pub mod types;
