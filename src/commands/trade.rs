//! Trade command handler.
//!
//! Runs the crossover controller against Alpaca market data and drives it
//! from a line console on stdin. Ctrl-C stops trading and exits.

use crossover_trader::exchange::{AlpacaClient, ExecutionGateway, Executor, PaperExecutor};
use crossover_trader::logging::{CsvRecorder, MultiRecorder, TracingRecorder};
use crossover_trader::trading::{
    EventKind, RunControl, TradingConfig, TradingController, TradingEvent, TradingSession,
};

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::cli::ExecutionMode;

/// Console commands accepted on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Start,
    Stop,
    Status,
    Quit,
    Help,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "status" => Ok(Self::Status),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "help" | "?" => Ok(Self::Help),
            other => Err(format!("Unknown command: '{}'. Type 'help'.", other)),
        }
    }
}

const HELP: &str = "Commands: start | stop | status | quit";

/// Run the crossover trading loop until `quit` or Ctrl-C.
///
/// # Errors
/// Returns error if the configuration is invalid, Alpaca credentials are
/// missing or the worker task panics.
pub async fn run_trade(
    config: TradingConfig,
    mode: ExecutionMode,
    trades_file: PathBuf,
    autostart: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    info!(symbol = %config.symbol, mode = ?mode, journal = %trades_file.display(), "--- Crossover Trader: Initializing ---");
    if mode == ExecutionMode::Live {
        warn!("Live endpoint selected: orders use real money");
    }

    let alpaca = Arc::new(AlpacaClient::from_env(mode != ExecutionMode::Live)?);
    if let Err(e) = alpaca.test_connection().await {
        warn!(error = %e, "Alpaca connection check failed; cycles will retry");
    }

    let executor: Arc<dyn Executor> = match mode {
        ExecutionMode::DryRun => Arc::new(PaperExecutor::new()),
        ExecutionMode::Paper | ExecutionMode::Live => alpaca.clone(),
    };
    let recorder = MultiRecorder::new(vec![
        Box::new(CsvRecorder::new(trades_file)),
        Box::new(TracingRecorder::new()),
    ]);
    let gateway = ExecutionGateway::new(executor, mode.is_paper()).with_recorder(Arc::new(recorder));

    let controller = TradingController::new(config, alpaca, gateway, RunControl::new())?;
    let session = controller.spawn();
    tokio::spawn(print_events(session.subscribe()));

    println!("{}", HELP);
    if autostart {
        session.start();
    }

    console(&session).await?;

    let controller = session.shutdown().await?;
    let status = controller.status();
    info!(
        capital = %status.capital,
        position = status.position_qty,
        cycles = status.cycles,
        errors = status.errors,
        "Trading session ended"
    );
    Ok(())
}

async fn console(session: &TradingSession) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping");
                return Ok(());
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Detached stdin: keep running until Ctrl-C.
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Start) => {
                        if !session.start() {
                            println!("Already running");
                        }
                    }
                    Ok(ConsoleCommand::Stop) => {
                        if !session.stop() {
                            println!("Already stopped");
                        }
                    }
                    Ok(ConsoleCommand::Status) => println!("{}", session.status()),
                    Ok(ConsoleCommand::Help) => println!("{}", HELP),
                    Ok(ConsoleCommand::Quit) => return Ok(()),
                    Err(e) => println!("{}", e),
                }
            }
        }
    }
}

/// Echo notable events to the console. Snapshots are left to the log.
async fn print_events(mut events: broadcast::Receiver<TradingEvent>) {
    loop {
        match events.recv().await {
            Ok(event) if event.kind != EventKind::Snapshot => {
                println!(
                    "[{}] {:?}: {}",
                    event.timestamp.format("%H:%M:%S"),
                    event.kind,
                    event.message
                );
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Console fell behind the event stream");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_command_parsing() {
        assert_eq!("start".parse(), Ok(ConsoleCommand::Start));
        assert_eq!(" STOP \n".parse(), Ok(ConsoleCommand::Stop));
        assert_eq!("status".parse(), Ok(ConsoleCommand::Status));
        assert_eq!("q".parse(), Ok(ConsoleCommand::Quit));
        assert!("buy".parse::<ConsoleCommand>().is_err());
    }
}
