//! HTTP handlers

pub mod entities;
pub mod health;
pub mod predict;

#[cfg(test)]
mod tests;
