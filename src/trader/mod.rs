//! Trader module - Core live series functionality.
//!
//! This module provides the components that turn a historical seed and a
//! stream of price ticks into a fixed-size OHLC bar series:
//!
//! - **constant**: Periodicity, controller and generator states, defaults
//! - **object**: Data structures for BarData, TickData, requests and snapshots
//! - **error**: Error types for fetches, streams and series operations
//! - **period**: Bar boundary calculation in a reference time zone
//! - **bar_buffer**: Fixed-capacity, time-ordered window of bars
//! - **bar_generator**: Tick aggregation into the open bar
//! - **datafeed**: Datafeed abstraction and history response parsing
//! - **gateway**: Tick stream gateway and token provider abstractions
//! - **engine**: Live series controller driving the lifecycle
//! - **setting**: Global settings management
//! - **utility**: Precision inference and other helpers
//! - **logger**: Logging utilities

pub mod bar_buffer;
pub mod bar_generator;
pub mod constant;
pub mod datafeed;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod object;
pub mod period;
pub mod setting;
pub mod utility;

// Re-exports for convenience
pub use bar_buffer::BarSeriesBuffer;
pub use bar_generator::{BarGenerator, TickOutcome};
pub use constant::{ControllerState, GeneratorState, Periodicity, DEFAULT_BAR_COUNT, DEFAULT_PRECISION, MAX_BAR_COUNT, MAX_PRECISION};
pub use datafeed::{parse_bar_history, BaseDatafeed, EmptyDatafeed};
pub use engine::{ControllerEvent, EventOutcome, LiveSeriesController, LoggingRenderSink, RenderSink, Selection};
pub use error::{FetchError, GatewayError, SeriesError};
pub use gateway::{BaseGateway, GatewayEvent, GatewayEventSender, StaticTokenProvider, TickStream, TokenProvider};
pub use logger::{init_logger, CRITICAL, DEBUG, ERROR, INFO, WARNING};
pub use object::{BarData, HistoryRequest, SeriesSnapshot, SubscribeRequest, TickData};
pub use period::{parse_timezone, period_start};
pub use setting::{SeriesSettings, SettingValue, Settings};
pub use utility::{
    format_price, get_digits, get_file_path, get_folder_path, infer_precision, parse_iso_datetime, TEMP_DIR,
};
