// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Software War - Capture & Resistance Service
//!
//! Role-gated REST service in which `juan` (admin) and his `slave` agents
//! capture `developer` users, developers trade resistance feedback, and
//! captors compete on a reward leaderboard.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password login, session tokens and per-route access rules
//! - `leaderboard` - Slave standings, streaks and monthly awards
//! - `stats` - Capture and reward statistics
//! - `storage` - Embedded redb document store and repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
