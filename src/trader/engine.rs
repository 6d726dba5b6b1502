//! Live series controller.
//!
//! Owns the bar series of the current (instrument, periodicity) selection and
//! drives it through its lifecycle:
//!
//! ```text
//! Idle --select--> Loading --history ok--> Live
//!                     |                      |
//!                     +--history failed--> Error <--stream failed--+
//! any --disconnect--> Idle          Live/Error --reselect--> Loading
//! ```
//!
//! All mutation happens on the task that owns the controller, one event at a
//! time. The history fetch and the tick stream run in background tasks that
//! only post [`ControllerEvent`]s tagged with the generation of the selection
//! that started them; events from a superseded generation are discarded.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::bar_generator::{BarGenerator, TickOutcome};
use super::constant::{ControllerState, Periodicity};
use super::datafeed::{parse_bar_history, BaseDatafeed};
use super::error::{FetchError, GatewayError, SeriesError};
use super::gateway::{BaseGateway, GatewayEvent, TickStream, TokenProvider};
use super::object::{BarData, HistoryRequest, SeriesSnapshot, SubscribeRequest, TickData};
use super::setting::SeriesSettings;
use super::utility::format_price;

/// Consumer of series snapshots, typically a chart renderer.
///
/// `render` is called after every change of the series, including resets to
/// an empty series.
pub trait RenderSink: Send {
    fn render(&mut self, snapshot: &SeriesSnapshot);

    fn on_state_change(&mut self, _state: ControllerState) {}

    /// Failures that happen outside a direct call (history, tick stream)
    fn on_error(&mut self, _error: &SeriesError) {}
}

/// Sink writing every snapshot to the log, used by the command line binary
#[derive(Debug, Default)]
pub struct LoggingRenderSink {
    /// Open time of the last bar logged, to log closed bars only once
    last_logged: Option<chrono::DateTime<chrono::Utc>>,
}

impl LoggingRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn format_bar(bar: &BarData, precision: usize) -> String {
        format!(
            "{} O {} H {} L {} C {}",
            bar.datetime.format("%Y-%m-%d %H:%M:%S"),
            format_price(bar.open_price, precision),
            format_price(bar.high_price, precision),
            format_price(bar.low_price, precision),
            format_price(bar.close_price, precision),
        )
    }
}

impl RenderSink for LoggingRenderSink {
    fn render(&mut self, snapshot: &SeriesSnapshot) {
        let Some(last) = snapshot.last_bar() else {
            self.last_logged = None;
            info!("Series cleared ({})", snapshot.periodicity.display_name());
            return;
        };

        let instrument = snapshot.instrument_id.as_deref().unwrap_or("-");
        if self.last_logged.is_none() {
            info!(
                "{} {}: {} bars, precision {}",
                instrument,
                snapshot.periodicity.display_name(),
                snapshot.bars.len(),
                snapshot.precision
            );
            for bar in &snapshot.bars {
                info!("  {}", Self::format_bar(bar, snapshot.precision));
            }
        } else if self.last_logged != Some(last.datetime) {
            info!("{} new bar {}", instrument, Self::format_bar(last, snapshot.precision));
        } else {
            debug!("{} {}", instrument, Self::format_bar(last, snapshot.precision));
        }
        self.last_logged = Some(last.datetime);
    }

    fn on_state_change(&mut self, state: ControllerState) {
        info!("State: {}", state);
    }

    fn on_error(&mut self, error: &SeriesError) {
        error!("Live series error: {}", error);
    }
}

/// Instrument and periodicity currently displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub instrument_id: String,
    pub periodicity: Periodicity,
}

/// Completion posted by a background task
#[derive(Debug)]
pub enum ControllerEvent {
    HistoryLoaded {
        generation: u64,
        result: Result<Value, FetchError>,
    },
    Stream {
        generation: u64,
        event: GatewayEvent,
    },
    StreamClosed {
        generation: u64,
    },
}

impl ControllerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ControllerEvent::HistoryLoaded { generation, .. }
            | ControllerEvent::Stream { generation, .. }
            | ControllerEvent::StreamClosed { generation } => *generation,
        }
    }
}

/// How an event was handled
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// History seeded the series and the tick stream is open
    Loaded { bars: usize },
    /// A tick changed the series
    Tick(TickOutcome),
    /// Belongs to a superseded selection
    Stale,
    /// Not applicable in the current state, or an unusable tick
    Ignored,
}

pub struct LiveSeriesController {
    settings: SeriesSettings,
    tokens: Arc<dyn TokenProvider>,
    datafeed: Arc<dyn BaseDatafeed>,
    gateway: Arc<dyn BaseGateway>,
    sink: Box<dyn RenderSink>,

    state: ControllerState,
    selection: Option<Selection>,
    token: Option<String>,
    generation: u64,
    generator: BarGenerator,

    fetch_task: Option<JoinHandle<()>>,
    stream_task: Option<JoinHandle<()>>,
    subscribed: bool,

    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    event_rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl LiveSeriesController {
    pub fn new(
        settings: SeriesSettings,
        tokens: Arc<dyn TokenProvider>,
        datafeed: Arc<dyn BaseDatafeed>,
        gateway: Arc<dyn BaseGateway>,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let generator = BarGenerator::new(settings.periodicity, settings.timezone, settings.bar_count);

        Self {
            settings,
            tokens,
            datafeed,
            gateway,
            sink,
            state: ControllerState::Idle,
            selection: None,
            token: None,
            generation: 0,
            generator,
            fetch_task: None,
            stream_task: None,
            subscribed: false,
            event_tx,
            event_rx,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn periodicity(&self) -> Periodicity {
        self.generator.periodicity()
    }

    /// Token of the current selection; bumped on every reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn precision(&self) -> usize {
        self.generator.precision()
    }

    /// Copy of the current series
    pub fn snapshot(&self) -> SeriesSnapshot {
        self.generator
            .snapshot(self.selection.as_ref().map(|s| s.instrument_id.clone()))
    }

    /// Show `instrument_id` at `periodicity`.
    ///
    /// Whatever was shown before is torn down first: the tick stream is
    /// closed, an in-flight history fetch is aborted and the series cleared.
    /// Fails without fetching when there is no instrument or no token; the
    /// controller is then `Idle`.
    pub async fn select(
        &mut self,
        instrument_id: Option<&str>,
        periodicity: Periodicity,
    ) -> Result<(), SeriesError> {
        self.reset().await;
        self.generator.set_periodicity(periodicity);

        let instrument_id = instrument_id.map(str::trim).filter(|id| !id.is_empty());
        let prepared = match instrument_id {
            None => Err(SeriesError::MissingInstrument),
            Some(id) => match self.tokens.access_token() {
                Some(token) => Ok((id.to_string(), token)),
                None => Err(SeriesError::MissingToken),
            },
        };

        let (instrument_id, token) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("Selection not started: {}", e);
                self.render();
                self.set_state(ControllerState::Idle);
                return Err(e);
            }
        };

        self.selection = Some(Selection {
            instrument_id: instrument_id.clone(),
            periodicity,
        });
        self.token = Some(token.clone());
        self.render();
        self.set_state(ControllerState::Loading);

        let req = HistoryRequest {
            instrument_id,
            interval: self.settings.interval,
            periodicity,
            bars_count: self.settings.bar_count,
        };
        info!(
            "Loading {} bars of {} ({}), generation {}",
            req.bars_count, req.instrument_id, periodicity, self.generation
        );

        let datafeed = Arc::clone(&self.datafeed);
        let tx = self.event_tx.clone();
        let generation = self.generation;
        self.fetch_task = Some(tokio::spawn(async move {
            let result = datafeed.query_bar_history(req, &token).await;
            let _ = tx.send(ControllerEvent::HistoryLoaded { generation, result });
        }));

        Ok(())
    }

    /// Reselect the current instrument at another periodicity
    pub async fn change_periodicity(&mut self, periodicity: Periodicity) -> Result<(), SeriesError> {
        let instrument_id = self.selection.as_ref().map(|s| s.instrument_id.clone());
        match instrument_id {
            Some(id) => self.select(Some(&id), periodicity).await,
            None => {
                self.generator.set_periodicity(periodicity);
                self.render();
                Ok(())
            }
        }
    }

    /// Select another instrument at the current periodicity
    pub async fn change_instrument(&mut self, instrument_id: Option<&str>) -> Result<(), SeriesError> {
        let periodicity = self.periodicity();
        self.select(instrument_id, periodicity).await
    }

    /// Tear everything down and return to `Idle`
    pub async fn disconnect(&mut self) {
        self.reset().await;
        self.render();
        self.set_state(ControllerState::Idle);
        info!("Live series disconnected");
    }

    /// Wait for the next background event and apply it
    pub async fn step(&mut self) -> Result<EventOutcome, SeriesError> {
        match self.event_rx.recv().await {
            Some(event) => self.handle_event(event).await,
            None => Ok(EventOutcome::Ignored),
        }
    }

    /// Apply a background event
    pub async fn handle_event(&mut self, event: ControllerEvent) -> Result<EventOutcome, SeriesError> {
        if event.generation() != self.generation {
            debug!(
                "Discarding event of generation {} (current {})",
                event.generation(),
                self.generation
            );
            return Ok(EventOutcome::Stale);
        }

        match event {
            ControllerEvent::HistoryLoaded { result, .. } => self.on_history(result).await,
            ControllerEvent::Stream {
                event: GatewayEvent::Tick(tick),
                ..
            } => Ok(self.on_tick(&tick)),
            ControllerEvent::Stream {
                event: GatewayEvent::Error(e),
                ..
            } => self.on_stream_failure(e).await,
            ControllerEvent::StreamClosed { .. } => self.on_stream_failure(GatewayError::Closed).await,
        }
    }

    async fn on_history(&mut self, result: Result<Value, FetchError>) -> Result<EventOutcome, SeriesError> {
        self.fetch_task = None;
        if self.state != ControllerState::Loading {
            return Ok(EventOutcome::Ignored);
        }

        let timezone = *self.generator.timezone();
        let bars = match result.and_then(|payload| parse_bar_history(&payload, &timezone)) {
            Ok(bars) => bars,
            Err(e) => {
                error!("Failed to load bar history: {}", e);
                self.close_stream().await;
                self.generator.reset();
                self.render();
                return Err(self.fail(SeriesError::Fetch(e)));
            }
        };

        self.generator.load_history(bars);
        let loaded = self.generator.buffer().len();
        self.render();

        let (Some(selection), Some(token)) = (self.selection.clone(), self.token.clone()) else {
            return Ok(EventOutcome::Ignored);
        };

        let req = SubscribeRequest::new(selection.instrument_id.clone(), token);
        match self.gateway.subscribe(req).await {
            Ok(stream) => {
                self.spawn_forwarder(stream);
                info!(
                    "{} ({}) live with {} bars, precision {}",
                    selection.instrument_id,
                    selection.periodicity,
                    loaded,
                    self.generator.precision()
                );
                self.set_state(ControllerState::Live);
                Ok(EventOutcome::Loaded { bars: loaded })
            }
            Err(e) => {
                error!("Failed to subscribe {}: {}", selection.instrument_id, e);
                self.close_stream().await;
                Err(self.fail(SeriesError::Stream(e)))
            }
        }
    }

    fn on_tick(&mut self, tick: &TickData) -> EventOutcome {
        if self.state != ControllerState::Live {
            debug!("Ignoring tick while {}", self.state);
            return EventOutcome::Ignored;
        }

        let matches_selection = self
            .selection
            .as_ref()
            .is_some_and(|s| s.instrument_id == tick.instrument_id);
        if !matches_selection {
            debug!("Ignoring tick for {}", tick.instrument_id);
            return EventOutcome::Ignored;
        }

        match self.generator.update_tick(tick) {
            Ok(outcome) => {
                if let TickOutcome::Extended { late: true } = outcome {
                    warn!(
                        "Late tick at {} folded into bar {:?}",
                        tick.datetime,
                        self.generator.buffer().last_datetime()
                    );
                }
                self.render();
                EventOutcome::Tick(outcome)
            }
            Err(e) => {
                warn!("Dropping tick for {}: {}", tick.instrument_id, e);
                EventOutcome::Ignored
            }
        }
    }

    async fn on_stream_failure(&mut self, e: GatewayError) -> Result<EventOutcome, SeriesError> {
        if self.state != ControllerState::Live {
            return Ok(EventOutcome::Ignored);
        }

        error!("Tick stream failed: {}", e);
        self.close_stream().await;
        Err(self.fail(SeriesError::Stream(e)))
    }

    fn spawn_forwarder(&mut self, mut stream: TickStream) {
        let tx = self.event_tx.clone();
        let generation = self.generation;

        self.subscribed = true;
        self.stream_task = Some(tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                let failed = matches!(event, GatewayEvent::Error(_));
                if tx.send(ControllerEvent::Stream { generation, event }).is_err() || failed {
                    return;
                }
            }
            let _ = tx.send(ControllerEvent::StreamClosed { generation });
        }));
    }

    async fn close_stream(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
        if self.subscribed {
            self.subscribed = false;
            self.gateway.unsubscribe().await;
        }
    }

    /// Invalidate everything belonging to the current selection
    async fn reset(&mut self) {
        self.generation += 1;
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        self.close_stream().await;
        self.generator.reset();
        self.selection = None;
        self.token = None;
    }

    fn fail(&mut self, e: SeriesError) -> SeriesError {
        self.set_state(ControllerState::Error);
        self.sink.on_error(&e);
        e
    }

    fn render(&mut self) {
        let snapshot = self.snapshot();
        self.sink.render(&snapshot);
    }

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            info!("Live series {} -> {}", self.state, state);
            self.state = state;
            self.sink.on_state_change(state);
        }
    }
}

impl Drop for LiveSeriesController {
    fn drop(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }
}
