pub mod ports;
pub mod incremental_run_use_case;
