use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use outcall_protocol::Event;
use outcall_sampling::RawConfig;

use crate::upstream::{ApiError, CollectorApi, EventReceipt};

/// Collects formatted log output in memory.
#[derive(Clone, Debug, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Runs `f` with a subscriber writing all messages of the current thread into this buffer.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// A collection API that records sent events and serves a canned configuration.
#[derive(Debug)]
pub struct FakeCollector {
    events: Mutex<Vec<Event>>,
    send_status: Mutex<Option<u16>>,
    receipt_etag: Mutex<Option<String>>,
    config: Mutex<Result<Option<RawConfig>, u16>>,
    config_fetches: AtomicUsize,
}

impl FakeCollector {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            send_status: Mutex::new(None),
            receipt_etag: Mutex::new(None),
            config: Mutex::new(Ok(None)),
            config_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_config(self, body: &str, etag: Option<&str>) -> Self {
        self.set_config(body, etag);
        self
    }

    pub fn with_config_status(self, status: u16) -> Self {
        *self.config.lock().unwrap() = Err(status);
        self
    }

    pub fn with_send_status(self, status: u16) -> Self {
        *self.send_status.lock().unwrap() = Some(status);
        self
    }

    pub fn with_receipt_etag(self, etag: &str) -> Self {
        *self.receipt_etag.lock().unwrap() = Some(etag.to_owned());
        self
    }

    pub fn set_config(&self, body: &str, etag: Option<&str>) {
        *self.config.lock().unwrap() = Ok(Some(RawConfig {
            body: body.as_bytes().to_vec(),
            etag: etag.map(str::to_owned),
        }));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn config_fetches(&self) -> usize {
        self.config_fetches.load(Ordering::Relaxed)
    }
}

impl CollectorApi for FakeCollector {
    fn create_event(&self, event: &Event) -> Result<EventReceipt, ApiError> {
        if let Some(status) = *self.send_status.lock().unwrap() {
            return Err(ApiError::Status(status));
        }

        self.events.lock().unwrap().push(event.clone());
        Ok(EventReceipt {
            config_etag: self.receipt_etag.lock().unwrap().clone(),
        })
    }

    fn get_config(&self) -> Result<Option<RawConfig>, ApiError> {
        self.config_fetches.fetch_add(1, Ordering::Relaxed);
        self.config
            .lock()
            .unwrap()
            .clone()
            .map_err(ApiError::Status)
    }
}
