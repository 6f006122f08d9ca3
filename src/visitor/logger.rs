use std::sync::Arc;
use tracing::error;

use crate::visitor::models::VisitorRecord;
use crate::visitor::sink::VisitorSink;

/// Writes visitor records to the primary sink and, optionally, a forwarder
///
/// Failures are logged and swallowed. The forwarder runs on a spawned task and
/// is never awaited by the request path.
#[derive(Clone)]
pub struct VisitorLogger {
    sink: Arc<dyn VisitorSink>,
    forwarder: Option<Arc<dyn VisitorSink>>,
}

impl VisitorLogger {
    pub fn new(sink: Arc<dyn VisitorSink>) -> Self {
        Self {
            sink,
            forwarder: None,
        }
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn VisitorSink>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub async fn log(&self, record: &VisitorRecord) {
        if let Err(e) = self.sink.record(record).await {
            error!(ip = %record.ip, error = %e, "Failed to log visitor record");
        }

        if let Some(forwarder) = &self.forwarder {
            let forwarder = Arc::clone(forwarder);
            let record = record.clone();
            tokio::spawn(async move {
                if let Err(e) = forwarder.record(&record).await {
                    error!(ip = %record.ip, error = %e, "Failed to store visitor data");
                }
            });
        }
    }
}
