//! Driving adapters: the CSV files the command-line tool reads and writes.

pub mod csv;
