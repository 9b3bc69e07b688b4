pub mod indycar;
pub mod tracks;
