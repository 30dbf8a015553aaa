pub mod battery;
pub mod cable;
pub mod runs;
pub mod solve;
pub mod validate;
