// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

pub mod channel_pool;
pub mod config;
pub mod erlang;
pub mod event;
pub mod event_queue;
pub mod handoff_queue;
pub mod output;
pub mod simulation;
pub mod user_config;
pub mod utils;
pub mod variates;
