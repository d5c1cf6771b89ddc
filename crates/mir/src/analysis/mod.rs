//! # Analysis Module
//!
//! This module contains analyses performed on MIR, currently dominance
//! information for SSA construction.

pub mod dominance;


pub use dominance::Dominance;
