use engine_core::reporter::{RunReporter, TracingReporter, render_table};

/// Logs messages and prints tables to stdout, unless stdout is reserved for JSON output.
pub struct ConsoleReporter {
    json: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl RunReporter for ConsoleReporter {
    fn info(&self, message: &str) {
        TracingReporter.info(message);
    }

    fn error(&self, message: &str) {
        TracingReporter.error(message);
    }

    fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json {
            TracingReporter.table(headers, rows);
        } else {
            println!("{}", render_table(headers, rows));
        }
    }
}
