pub mod aggregator;
pub mod dry_run;
pub mod monitor;
