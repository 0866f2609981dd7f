pub mod rooms;
pub mod settings;
pub mod settlement;
pub mod users;
