//! Core library for the helios-roster command line application.
//!
//! The library loads a school-directory export into an in-memory
//! [`Directory`](helios::roster::model::Directory) and reconciles it against a
//! remote record store. Row sources live under [`helios::roster::io`], the
//! entity model inside [`helios::roster::model`], the row-to-entity builder in
//! [`helios::roster::load`], and the remote reconciliation under
//! [`helios::roster::sync`].

pub mod helios;

pub use helios::roster::{
    Result, RosterError, config, error, export, io, load, logging, model, sync,
};
