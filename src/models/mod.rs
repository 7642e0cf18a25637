pub mod instrument;
pub mod order;
