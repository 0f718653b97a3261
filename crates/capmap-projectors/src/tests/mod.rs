//! Behavioural tests for the projections, driven through an in-memory
//! backend.


mod realization;
