mod manager;
pub mod turn;

pub use manager::Session;
pub use turn::{run_turn, TurnEvent};
