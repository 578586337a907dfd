pub mod cadence;
pub mod live_annotate_use_case;
pub mod result_cache;
