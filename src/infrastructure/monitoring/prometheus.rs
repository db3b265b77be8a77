//! Text exposition format rendering.

use super::types::{Metric, MetricValue};
use std::fmt::Write;

/// Renders metrics in registration order.
///
/// Each metric gets a `# HELP` and `# TYPE` line, one sample line per
/// retained value, then a blank line. Label pairs keep the order they were
/// supplied in.
pub fn render(metrics: &[Metric]) -> String {
    let mut output = String::new();

    for metric in metrics {
        let _ = writeln!(output, "# HELP {} {}", metric.name, escape_help(&metric.help));
        let _ = writeln!(output, "# TYPE {} {}", metric.name, metric.metric_type);
        for value in &metric.values {
            write_sample(&mut output, &metric.name, value);
        }
        output.push('\n');
    }

    output
}

fn write_sample(output: &mut String, name: &str, value: &MetricValue) {
    output.push_str(name);
    if !value.labels.is_empty() {
        output.push('{');
        for (i, (key, val)) in value.labels.iter().enumerate() {
            if i > 0 {
                output.push(',');
            }
            let _ = write!(output, "{}=\"{}\"", key, escape_label_value(val));
        }
        output.push('}');
    }
    let _ = writeln!(output, " {}", value.value);
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
