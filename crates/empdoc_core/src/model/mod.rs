//! Domain model for the employee record set and its denormalized form.
//!
//! # Responsibility
//! - Describe source rows exactly as the relational schema stores them.
//! - Describe the nested destination document with its wire field names.
//!
//! # Invariants
//! - `emp_no` is the identity on both sides.
//! - Destination documents are append-only; nothing here mutates them after build.

pub mod document;
pub mod employee;
