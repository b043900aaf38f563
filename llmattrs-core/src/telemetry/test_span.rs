#![cfg(test)]

//! Capture layer for asserting what `TracingTracer` records on `tracing` spans.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{span, Subscriber};
use tracing_core::field::{Field, Visit};
use tracing_subscriber::registry;
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

#[derive(Default, Debug)]
pub struct SpanData {
    pub name: String,
    /// Field values stringified; `&str` values keep their surrounding quotes.
    pub fields: Mutex<HashMap<String, String>>,
}

#[derive(Default, Debug)]
pub struct SpanStore {
    pub spans: Mutex<HashMap<tracing::span::Id, Arc<SpanData>>>,
}

#[derive(Clone)]
pub struct CaptureLayer {
    pub store: Arc<SpanStore>,
}

struct FieldVisitor<'a> {
    map: &'a mut HashMap<String, String>,
}

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn core::fmt::Debug) {
        self.map.insert(field.name().to_string(), format!("{value:?}"));
    }
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.map.insert(field.name().to_string(), value.to_string());
    }
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.map.insert(field.name().to_string(), value.to_string());
    }
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.map.insert(field.name().to_string(), value.to_string());
    }
    fn record_str(&mut self, field: &Field, value: &str) {
        self.map.insert(field.name().to_string(), format!("\"{value}\""));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, _ctx: Context<'_, S>) {
        let data = Arc::new(SpanData {
            name: attrs.metadata().name().to_string(),
            ..Default::default()
        });
        {
            let mut map = data.fields.lock().unwrap();
            attrs.record(&mut FieldVisitor { map: &mut map });
        }
        self.store.spans.lock().unwrap().insert(id.clone(), data);
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, _ctx: Context<'_, S>) {
        if let Some(data) = self.store.spans.lock().unwrap().get(id) {
            let mut map = data.fields.lock().unwrap();
            values.record(&mut FieldVisitor { map: &mut map });
        }
    }
}

static GUARDS: once_cell::sync::Lazy<Mutex<Vec<tracing::subscriber::DefaultGuard>>> =
    once_cell::sync::Lazy::new(|| Mutex::new(Vec::new()));

/// Install a capturing subscriber as the default for the calling test thread.
pub fn install_capture() -> Arc<SpanStore> {
    use tracing_subscriber::prelude::*;
    let store = Arc::new(SpanStore::default());
    let layer = CaptureLayer {
        store: store.clone(),
    };
    let subscriber = registry::Registry::default().with(layer);
    let guard = tracing::subscriber::set_default(subscriber);
    GUARDS.lock().unwrap().push(guard);
    store
}
