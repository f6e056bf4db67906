//! Remittance Settlement Engine Library
//! # Overview
//!
//! Multi-tenant settlement engine for hawala-style remittance networks. An
//! operator accepts **outgoing** remittances (money it now owes a counterparty
//! abroad, in a foreign currency) and receives **incoming** remittances (foreign
//! funds it can use to pay those debts). The engine matches the two, fully or
//! partially, records the realized profit of each match, and keeps a signed cash
//! ledger per tenant, branch and currency.
//!
//! # Architecture
//!
//! - [`types`] - Remittances, settlements, ledger entries, errors
//! - [`config`] - Engine configuration (TOML file + overrides)
//! - [`core`] - Business logic:
//!   - [`core::engine`] - The `SettlementEngine` facade and settlement primitive
//!   - [`core::auto_settle`] - Strategy-driven settlement runs
//!   - [`core::selector`] - FIFO / LIFO / BEST_RATE suggestions
//!   - [`core::ledger`] - Cash ledger with cached balances
//!   - [`core::summary`] - Aging report and consistency verification
//! - [`io`] - Journal CSV reading and report writing
//! - [`pipeline`] - Sync and tenant-parallel async journal pipelines
//! - [`cli`] - CLI argument parsing
//!
//! # Settlement
//!
//! Settling `s` units of an outgoing debt against an incoming remittance in the
//! same currency moves `s` from both sides' remaining balances to their
//! settled/allocated totals and realizes
//! `s × payout_rate − s × acquisition_rate` of profit in the home currency.
//! Neither side can ever be settled beyond its remaining balance, no matter
//! how many settlements race.
//!
//! # Remittance States
//!
//! - Outgoing: `PENDING → PARTIAL → COMPLETED`, or `PENDING → CANCELLED`
//! - Incoming: `PENDING → PARTIAL → COMPLETED → PAID`, or `PENDING → CANCELLED`

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

pub use config::EngineConfig;
pub use core::{BatchProcessor, Command, CommandOutcome, SettlementEngine};
pub use io::{write_balances_csv, write_remittances_csv};
pub use types::{
    AutoSettleResult, Currency, IncomingRemittance, IncomingStatus, OutgoingRemittance,
    OutgoingStatus, RemittanceId, Settlement, SettlementError, SettlementStrategy, TenantId,
};
