//! Candle Feed - Command line entry point
//!
//! Streams a live candle series for one instrument and logs every change.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use candle_feed::gateway::{FintachartsConfig, FintachartsDatafeed, FintachartsGateway};
use candle_feed::trader::{
    init_logger, BaseDatafeed, LiveSeriesController, LoggingRenderSink, Periodicity, SeriesSettings,
    SettingValue, Settings,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Instrument id as known to the market data provider
    #[arg(short, long)]
    instrument: Option<String>,

    /// Bar periodicity: minute, hour, day, week, month or year
    #[arg(short, long)]
    periodicity: Option<Periodicity>,

    /// Number of bars kept in the window
    #[arg(short, long)]
    bars: Option<usize>,

    /// Access token (overrides fintacharts.access_token)
    #[arg(long, env = "FINTACHARTS_TOKEN")]
    token: Option<String>,

    /// Reference time zone for bar boundaries (e.g. "Europe/London")
    #[arg(long)]
    timezone: Option<String>,

    /// Path to a settings file (defaults to candle_setting.json in the data folder)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Load settings and overlay command line values
    fn settings(&self) -> Settings {
        let settings = match &self.config {
            Some(path) => Settings::from_path(path),
            None => Settings::new(),
        };

        if let Some(token) = &self.token {
            settings.set("fintacharts.access_token", SettingValue::String(token.clone()));
        }
        if let Some(bars) = self.bars {
            settings.set("chart.bar_count", SettingValue::Int(i64::try_from(bars).unwrap_or(i64::MAX)));
        }
        if let Some(timezone) = &self.timezone {
            settings.set("chart.timezone", SettingValue::String(timezone.clone()));
        }
        if let Some(periodicity) = self.periodicity {
            settings.set("chart.periodicity", SettingValue::String(periodicity.value().to_string()));
        }

        settings
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = cli.settings();

    init_logger(&settings);
    info!("Candle Feed v{}", candle_feed::VERSION);

    let series = SeriesSettings::from_settings(&settings)?;
    let periodicity = series.periodicity;
    let config = FintachartsConfig::from_settings(&settings);

    let datafeed = Arc::new(FintachartsDatafeed::new(&config)?);
    datafeed.init().await?;
    let gateway = Arc::new(FintachartsGateway::new("FINTACHARTS", config));

    let mut controller = LiveSeriesController::new(
        series,
        Arc::new(settings),
        datafeed,
        gateway,
        Box::new(LoggingRenderSink::new()),
    );

    controller.select(cli.instrument.as_deref(), periodicity).await?;

    loop {
        let next = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            result = controller.step() => Some(result),
        };

        match next {
            None => {
                info!("Interrupted, shutting down");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                error!("Stopping: {}", e);
                controller.disconnect().await;
                return Err(e.into());
            }
        }
    }

    controller.disconnect().await;
    Ok(())
}
