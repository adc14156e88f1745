pub mod error;
pub mod config;
pub mod chip;
pub mod catalog;
pub mod sim;
pub mod psrand;
pub mod progress;
pub mod bench;
pub mod march;
pub mod psrandom;
pub mod refresh;
pub mod driver;
pub mod dispatch;
pub mod input;
pub mod menu;
pub mod panel;
pub mod visual;
pub mod operator;
