//! Scripts for deploying, wiring and releasing the liquid staking contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod chain;
pub mod cli;
mod commands;
pub mod constants;
pub mod deployer;
pub mod errors;
pub mod export;
pub mod migrations;
pub mod networks;
pub mod predict;
pub mod records;
pub mod solidity;
pub mod verify;

#[cfg(test)]
mod testing;
