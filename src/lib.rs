pub mod calibration;
pub mod config;
pub mod dataset;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod lims;
pub mod matrix;
pub mod output;
pub mod reconcile;
pub mod record;
pub mod report;
