use std::collections::BTreeMap;
use std::fmt::Display;

const PARAM_DELIMITER: &str = "|";

/// Builds `prefix:k1:v1|k2:v2` with params sorted by name.
///
/// The same parameter set always yields the same key regardless of the
/// order it was supplied in. A repeated name keeps its last value.
pub fn generate_cache_key<I, K, V>(prefix: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
        .collect();

    let rendered: Vec<String> = sorted
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect();

    format!("{}:{}", prefix, rendered.join(PARAM_DELIMITER))
}
