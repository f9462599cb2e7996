pub mod control;
pub mod interface;
pub mod socket;
