mod test_cache;
mod test_logging;
mod test_metrics;
mod test_pagination;
