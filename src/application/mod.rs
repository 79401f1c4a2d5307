pub mod dto;
pub mod frames;
pub mod ports;
pub mod services;
