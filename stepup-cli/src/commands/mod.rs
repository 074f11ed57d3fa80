pub mod devices;
pub mod logout;
pub mod verify;
