//! In-memory collaborators for driving a `LiveSeriesController` in tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use candle_feed::trader::{
    BaseDatafeed, BaseGateway, ControllerState, EventOutcome, FetchError, GatewayError, GatewayEvent,
    GatewayEventSender, HistoryRequest, LiveSeriesController, Periodicity, RenderSink, SeriesError,
    SeriesSettings, SeriesSnapshot, StaticTokenProvider, SubscribeRequest, TickData, TickStream,
};

pub const EURUSD: &str = "ad9e5345-4c3b-41fc-9437-1d253f62db52";
pub const GBPUSD: &str = "3a3b9d1f-6f05-4b1e-9c1c-6d2e4f0b7a11";

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// Bars response of `count` bars starting at `start`, `step` apart.
/// Prices are multiples of 0.0001.
pub fn bars_payload(start: DateTime<Utc>, step: Duration, count: usize) -> Value {
    let data: Vec<Value> = (0..count)
        .map(|i| {
            let base = 10710 + i as i64;
            json!({
                "t": (start + step * i as i32).to_rfc3339(),
                "o": base as f64 / 10000.0,
                "h": (base + 5) as f64 / 10000.0,
                "l": (base - 5) as f64 / 10000.0,
                "c": (base + 2) as f64 / 10000.0,
                "v": 100 + i,
            })
        })
        .collect();
    json!({ "data": data })
}

/// Datafeed answering by periodicity
#[derive(Default)]
pub struct MockDatafeed {
    responses: Mutex<HashMap<Periodicity, Result<Value, FetchError>>>,
    requests: Mutex<Vec<HistoryRequest>>,
}

impl MockDatafeed {
    pub fn respond(&self, periodicity: Periodicity, response: Result<Value, FetchError>) {
        self.responses.lock().unwrap().insert(periodicity, response);
    }

    pub fn requests(&self) -> Vec<HistoryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseDatafeed for MockDatafeed {
    async fn query_bar_history(&self, req: HistoryRequest, _token: &str) -> Result<Value, FetchError> {
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&req.periodicity)
            .cloned()
            .unwrap_or(Err(FetchError::NotConfigured));
        self.requests.lock().unwrap().push(req);
        response
    }
}

/// Gateway handing out in-memory tick streams
#[derive(Default)]
pub struct MockGateway {
    senders: Mutex<Vec<GatewayEventSender>>,
    subscriptions: Mutex<Vec<SubscribeRequest>>,
    subscribe_error: Mutex<Option<GatewayError>>,
    unsubscribes: AtomicUsize,
}

impl MockGateway {
    pub fn fail_subscribe(&self, error: GatewayError) {
        *self.subscribe_error.lock().unwrap() = Some(error);
    }

    /// Sender of the newest stream
    pub fn sender(&self) -> GatewayEventSender {
        self.senders.lock().unwrap().last().cloned().expect("no stream opened")
    }

    pub fn send_tick(&self, instrument_id: &str, datetime: DateTime<Utc>, price: f64) {
        let _ = self
            .sender()
            .send(GatewayEvent::Tick(TickData::new(instrument_id, datetime, price)));
    }

    /// Drop every sender, closing all streams
    pub fn close_streams(&self) {
        self.senders.lock().unwrap().clear();
    }

    pub fn subscriptions(&self) -> Vec<SubscribeRequest> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseGateway for MockGateway {
    fn gateway_name(&self) -> &str {
        "MOCK"
    }

    async fn subscribe(&self, req: SubscribeRequest) -> Result<TickStream, GatewayError> {
        self.subscriptions.lock().unwrap().push(req);
        if let Some(e) = self.subscribe_error.lock().unwrap().clone() {
            return Err(e);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn unsubscribe(&self) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything a controller pushed to its sink
#[derive(Clone, Default)]
pub struct SinkLog {
    pub snapshots: Arc<Mutex<Vec<SeriesSnapshot>>>,
    pub states: Arc<Mutex<Vec<ControllerState>>>,
    pub errors: Arc<Mutex<Vec<SeriesError>>>,
}

impl SinkLog {
    pub fn last_snapshot(&self) -> SeriesSnapshot {
        self.snapshots.lock().unwrap().last().cloned().expect("nothing rendered")
    }

    pub fn states(&self) -> Vec<ControllerState> {
        self.states.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<SeriesError> {
        self.errors.lock().unwrap().clone()
    }
}

pub struct RecordingSink(pub SinkLog);

impl RenderSink for RecordingSink {
    fn render(&mut self, snapshot: &SeriesSnapshot) {
        self.0.snapshots.lock().unwrap().push(snapshot.clone());
    }

    fn on_state_change(&mut self, state: ControllerState) {
        self.0.states.lock().unwrap().push(state);
    }

    fn on_error(&mut self, error: &SeriesError) {
        self.0.errors.lock().unwrap().push(error.clone());
    }
}

pub struct Harness {
    pub controller: LiveSeriesController,
    pub datafeed: Arc<MockDatafeed>,
    pub gateway: Arc<MockGateway>,
    pub sink: SinkLog,
}

impl Harness {
    pub fn new(token: &str) -> Self {
        let datafeed = Arc::new(MockDatafeed::default());
        let gateway = Arc::new(MockGateway::default());
        let sink = SinkLog::default();

        let controller = LiveSeriesController::new(
            SeriesSettings::default(),
            Arc::new(StaticTokenProvider::new(token)),
            datafeed.clone(),
            gateway.clone(),
            Box::new(RecordingSink(sink.clone())),
        );

        Self {
            controller,
            datafeed,
            gateway,
            sink,
        }
    }

    /// Next outcome of the current generation
    pub async fn step(&mut self) -> Result<EventOutcome, SeriesError> {
        loop {
            match self.controller.step().await {
                Ok(EventOutcome::Stale) => continue,
                other => return other,
            }
        }
    }

    /// Select `instrument_id` with a canned history and wait until live
    pub async fn go_live(&mut self, instrument_id: &str, periodicity: Periodicity, payload: Value) {
        self.datafeed.respond(periodicity, Ok(payload));
        self.controller.select(Some(instrument_id), periodicity).await.unwrap();
        let outcome = self.step().await.unwrap();
        assert!(matches!(outcome, EventOutcome::Loaded { .. }), "{:?}", outcome);
        assert_eq!(self.controller.state(), ControllerState::Live);
    }
}
