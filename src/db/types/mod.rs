mod room_types;

pub use room_types::*;
