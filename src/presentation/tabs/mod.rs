pub mod events;
pub mod home;
pub mod map;
pub mod settings;
