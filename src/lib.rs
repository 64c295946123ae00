//! A four-function calculator driven by keypad events or spoken phrases.
//!
//! - [`calculator`]: evaluation, formatting and the keypad state machine
//! - [`voice`]: transcript normalisation and speech collaborator contracts
//! - [`history`]: calculation history storage and search
//! - [`config`]: user configuration

pub mod calculator;
pub mod config;
pub mod history;
pub mod voice;
