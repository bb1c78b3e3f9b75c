pub mod input;
pub mod literal;
pub mod metadata;
pub mod output;
