//! # UI Module
//!
//! Screens and canvas widgets of the Fretly front end.

pub mod fretboard;
pub mod game;
pub mod home;
pub mod pitch_meter;
