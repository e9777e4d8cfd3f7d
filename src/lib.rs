//! Blaw is a finite-volume, method-of-lines solver for one-dimensional
//! systems of hyperbolic balance laws, `q_t + f(q)_x = s(q)`. Cell averages
//! are reconstructed to cell boundaries and quadrature points, combined by a
//! numerical flux and a source term, and advanced in time with an explicit
//! Runge-Kutta scheme. Runs may be split over several workers, each owning a
//! contiguous block of cells and exchanging ghost cells with its neighbors
//! once per step, either as threads of one process or as processes talking
//! over TCP.

pub mod cache;
pub mod component;
pub mod config;
pub mod context;
pub mod decomposition;
pub mod dump;
pub mod error;
pub mod evolver;
pub mod flux;
pub mod grid;
pub mod halo;
pub mod index_space;
pub mod message;
pub mod parallel;
pub mod quadrature;
pub mod reconstruct;
pub mod schedule;
pub mod solver;
pub mod source;
pub mod state;
pub mod system;

pub use error::Error;
pub use solver::{ExecutionMode, RunStatus, RunSummary, Solver, SolverBuilder};
