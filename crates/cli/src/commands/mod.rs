pub mod compile;
pub mod functions;
pub mod tokens;
