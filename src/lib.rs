//! GeoGebra MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing GeoGebra plotting.
//! Provides tools for plotting functions, parametric and implicit curves,
//! inspecting the construction, and exporting renders.

pub mod config;
pub mod error;
pub mod geogebra;
pub mod mcp;

pub use config::Config;
pub use error::{GeoGebraMcpError, Result};
