//! # rgbmatrix-demo
//!
//! Demo animations for the 8×8 RGB LED matrix. Plays on the FPGA board
//! over UART or in the browser preview, chosen by config or CLI flag.

pub mod animation;
pub mod config;
