mod helpers;
mod test_health;
mod test_metrics;
mod test_ops_cache;
