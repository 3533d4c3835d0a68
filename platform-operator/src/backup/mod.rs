//! Scheduled backup controller (§11.1, supplemented from
//! `original_source/controllers/databasebackup_controller.go`):
//! ensure-exists-only reconciliation of a CronJob per DatabaseBackup.

pub mod reconcile;

pub use reconcile::run;
