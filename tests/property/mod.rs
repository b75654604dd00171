// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! This module contains property-based tests using proptest to verify
//! ordering and address-space properties of the planner.

mod apply_order;
mod address_space;
