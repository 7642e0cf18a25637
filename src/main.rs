/**
* filename : main
* author : HAMA
* date: 2025. 5. 8.
* description: 주문 실행 CLI 및 대화형 메뉴
**/

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};

use xFutures::commands::{self, Command, CommandOutput};
use xFutures::config::Config;
use xFutures::core::{CancelToken, TwapScheduler};
use xFutures::exchange::{BinanceFuturesClient, ExchangeClient, InMemoryExchange};
use xFutures::order_core::validator::parse_positive;
use xFutures::order_core::OrderExecutor;
use xFutures::utils::{format_timestamp, logging};
use xFutures::{TimeInForce, TradingError};

#[derive(Parser, Debug)]
#[command(name = "xfutures")]
#[command(version, about = "Futures order execution helper: min-notional sizing and TWAP slicing", long_about = None)]
struct Cli {
    /// Config file (defaults to ./config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory exchange instead of the network connector
    #[arg(long, global = true)]
    dry_run: bool,

    /// API key (overrides config file and BINANCE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API secret (overrides config file and BINANCE_API_SECRET)
    #[arg(long, global = true)]
    api_secret: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Place a market order
    Market {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        side: String,
        #[arg(long, value_parser = positive_decimal)]
        qty: Decimal,
        #[arg(long)]
        reduce_only: bool,
    },
    /// Place a limit order
    Limit {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        side: String,
        #[arg(long, value_parser = positive_decimal)]
        qty: Decimal,
        #[arg(long, value_parser = positive_decimal)]
        price: Decimal,
        #[arg(long)]
        tif: Option<String>,
    },
    /// Place a stop-limit order
    StopLimit {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        side: String,
        #[arg(long, value_parser = positive_decimal)]
        qty: Decimal,
        #[arg(long, value_parser = positive_decimal)]
        stop: Decimal,
        #[arg(long, value_parser = positive_decimal)]
        price: Decimal,
        #[arg(long)]
        tif: Option<String>,
    },
    /// Slice a market order over time
    Twap {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        side: String,
        #[arg(long, value_parser = positive_decimal)]
        total_qty: Decimal,
        #[arg(long)]
        slices: Option<usize>,
        /// Seconds between slices
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Query an order by id or client order id
    Status {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        order_id: Option<String>,
        #[arg(long)]
        client_order_id: Option<String>,
    },
    /// Interactive menu
    Menu,
}

fn positive_decimal(raw: &str) -> Result<Decimal, String> {
    parse_positive("value", raw).map_err(|e| e.to_string())
}

struct App {
    config: Config,
    executor: Arc<OrderExecutor>,
    scheduler: TwapScheduler,
}

impl App {
    fn new(config: Config, dry_run: bool) -> Result<Self, TradingError> {
        let client: Arc<dyn ExchangeClient> = if dry_run || config.exchange.use_mock {
            log::warn!("Dry-run mode: orders go to the in-memory exchange");
            Arc::new(InMemoryExchange::with_default_instruments())
        } else {
            Arc::new(BinanceFuturesClient::from_config(&config.exchange)?)
        };

        let executor = Arc::new(OrderExecutor::new(client, &config.execution));
        let scheduler = TwapScheduler::new(executor.clone(), config.execution.quantity_precision);
        Ok(App { config, executor, scheduler })
    }

    /// 명령 실행. TWAP 실행 중에는 Ctrl-C 로 남은 슬라이스 취소
    async fn run(&self, command: Command) -> Result<CommandOutput, TradingError> {
        let cancel = CancelToken::new();
        let watcher = matches!(command, Command::RunTwap { .. }).then(|| {
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Ctrl-C received, cancelling remaining TWAP slices");
                    token.cancel();
                }
            })
        });

        let result = commands::dispatch(&self.executor, &self.scheduler, command, &cancel).await;
        if let Some(handle) = watcher {
            handle.abort();
        }
        result
    }

    fn time_in_force(&self, raw: Option<String>) -> Result<TimeInForce, TradingError> {
        match raw {
            Some(s) => s.parse(),
            None => Ok(self.config.execution.default_time_in_force),
        }
    }

    fn build_command(&self, cmd: CliCommand) -> Result<Option<Command>, TradingError> {
        let command = match cmd {
            CliCommand::Market { symbol, side, qty, reduce_only } => {
                Command::market(&symbol, &side, qty)?.with_reduce_only(reduce_only)
            }
            CliCommand::Limit { symbol, side, qty, price, tif } => {
                Command::limit(&symbol, &side, qty, price)?.with_time_in_force(self.time_in_force(tif)?)
            }
            CliCommand::StopLimit { symbol, side, qty, stop, price, tif } => {
                Command::stop_limit(&symbol, &side, qty, stop, price)?.with_time_in_force(self.time_in_force(tif)?)
            }
            CliCommand::Twap { symbol, side, total_qty, slices, interval } => Command::twap(
                &symbol,
                &side,
                total_qty,
                slices.unwrap_or(self.config.execution.twap_default_slices),
                interval.unwrap_or(self.config.execution.twap_default_interval_secs),
            )?,
            CliCommand::Status { symbol, order_id, client_order_id } => {
                Command::order_status(&symbol, order_id, client_order_id)?
            }
            CliCommand::Menu => return Ok(None),
        };
        Ok(Some(command))
    }
}

fn print_output(output: &CommandOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("{:?} (serialization failed: {})", output, e),
    }
    if let CommandOutput::Twap(execution) = output {
        println!(
            "TWAP 완료: {} 슬라이스 - 총 수량 {} - {} ~ {}",
            execution.results.len(),
            execution.executed_quantity(),
            format_timestamp(execution.started_at, "%H:%M:%S"),
            format_timestamp(execution.finished_at, "%H:%M:%S"),
        );
    }
}

/// 중단된 TWAP 의 완료 슬라이스 요약
fn partial_report(error: &TradingError) -> Option<String> {
    let partial = error.partial_results();
    if partial.is_empty() {
        return None;
    }
    let json = serde_json::to_string_pretty(partial).unwrap_or_default();
    Some(format!("완료된 슬라이스 {}개:\n{}", partial.len(), json))
}

fn print_partial(error: &TradingError) {
    if let Some(report) = partial_report(error) {
        println!("{}", report);
    }
}

fn print_error(error: &TradingError) {
    print_partial(error);
    eprintln!("실행 오류: {}", error);
}

async fn prompt<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>, label: &str) -> Result<String, TradingError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    match lines.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => Err(TradingError::Cancelled),
    }
}

async fn prompt_decimal<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>, label: &str) -> Result<Decimal, TradingError> {
    let raw = prompt(lines, label).await?;
    parse_positive(label.trim_end_matches(": "), &raw)
}

async fn prompt_usize<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>, label: &str) -> Result<usize, TradingError> {
    let raw = prompt(lines, label).await?;
    raw.parse()
        .map_err(|_| TradingError::InvalidParameter(format!("{} must be a whole number, got '{}'", label.trim_end_matches(": "), raw)))
}

/// 메뉴 한 항목 입력 수집. None 이면 종료
async fn read_menu_command<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<Option<Command>, TradingError> {
    println!("\n=== Trading Bot ===");
    println!("1. Market Order");
    println!("2. Limit Order");
    println!("3. Stop-Limit Order");
    println!("4. TWAP Order");
    println!("5. Order Status");
    println!("6. Exit");

    let command = match prompt(lines, "Choose an option: ").await?.as_str() {
        "1" => {
            let symbol = prompt(lines, "Symbol: ").await?;
            let side = prompt(lines, "Side (BUY/SELL): ").await?;
            let qty = prompt_decimal(lines, "Quantity: ").await?;
            Command::market(&symbol, &side, qty)?
        }
        "2" => {
            let symbol = prompt(lines, "Symbol: ").await?;
            let side = prompt(lines, "Side (BUY/SELL): ").await?;
            let qty = prompt_decimal(lines, "Quantity: ").await?;
            let price = prompt_decimal(lines, "Price: ").await?;
            Command::limit(&symbol, &side, qty, price)?
        }
        "3" => {
            let symbol = prompt(lines, "Symbol: ").await?;
            let side = prompt(lines, "Side (BUY/SELL): ").await?;
            let qty = prompt_decimal(lines, "Quantity: ").await?;
            let stop = prompt_decimal(lines, "Stop Price: ").await?;
            let price = prompt_decimal(lines, "Limit Price: ").await?;
            Command::stop_limit(&symbol, &side, qty, stop, price)?
        }
        "4" => {
            let symbol = prompt(lines, "Symbol: ").await?;
            let side = prompt(lines, "Side (BUY/SELL): ").await?;
            let total = prompt_decimal(lines, "Total Quantity: ").await?;
            let slices = prompt_usize(lines, "Slices: ").await?;
            let interval = prompt_usize(lines, "Interval Seconds: ").await?;
            Command::twap(&symbol, &side, total, slices, interval as u64)?
        }
        "5" => {
            let symbol = prompt(lines, "Symbol: ").await?;
            let order_id = prompt(lines, "Order ID (blank to use client order id): ").await?;
            let client_order_id = if order_id.is_empty() {
                Some(prompt(lines, "Client Order ID: ").await?)
            } else {
                None
            };
            Command::order_status(&symbol, Some(order_id), client_order_id)?
        }
        "6" => return Ok(None),
        other => {
            return Err(TradingError::InvalidParameter(format!("invalid choice '{}'", other)));
        }
    };
    Ok(Some(command))
}

/// 대화형 메뉴. 오류는 출력만 하고 다음 입력을 계속 받음
///
/// 입력 대기 중 `interrupt` 가 끝나면 종료. 매 입력마다 새로 만들어서
/// TWAP 실행 중 받은 Ctrl-C 는 메뉴 종료로 이어지지 않음
async fn run_menu<R, F, Fut>(app: &App, input: R, mut interrupt: F) -> Result<(), TradingError>
where
    R: AsyncBufRead + Unpin,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut lines = input.lines();
    loop {
        let next = tokio::select! {
            next = read_menu_command(&mut lines) => next,
            _ = interrupt() => {
                println!("\nGoodbye!");
                return Ok(());
            }
        };
        match next {
            Ok(Some(command)) => match app.run(command).await {
                Ok(output) => print_output(&output),
                Err(e) => print_error(&e),
            },
            Ok(None) => {
                println!("Goodbye!");
                return Ok(());
            }
            // stdin 종료
            Err(TradingError::Cancelled) => return Ok(()),
            Err(e) => {
                logging::log_error("menu", &e);
                print_error(&e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // 설정 로드
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.exchange.override_credentials(cli.api_key, cli.api_secret);

    // 로깅 초기화
    logging::init(&config.logging.level)?;
    log::info!("xFutures {} 시작", xFutures::VERSION);

    let app = App::new(config, cli.dry_run)?;

    match app.build_command(cli.command)? {
        Some(command) => match app.run(command).await {
            Ok(output) => print_output(&output),
            Err(e) => {
                // 오류 메시지는 anyhow 가 출력
                print_partial(&e);
                return Err(e.into());
            }
        },
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_menu(&app, stdin, || async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use xFutures::OrderResult;

    fn dry_run_app() -> App {
        App::new(Config::default(), true).unwrap()
    }

    #[tokio::test]
    async fn test_menu_keeps_running_after_errors() {
        let app = dry_run_app();
        let input: &[u8] = b"9\n1\nBTCUSDT\nHOLD\n0.01\n1\nBTCUSDT\nBUY\n0.001\n6\n";
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_menu(&app, input, std::future::pending::<()>),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_menu_ends_on_eof() {
        let app = dry_run_app();
        let input: &[u8] = b"";
        assert!(run_menu(&app, input, std::future::pending::<()>).await.is_ok());
    }

    #[tokio::test]
    async fn test_interrupt_ends_menu_while_waiting_for_input() {
        let app = dry_run_app();
        // 쓰는 쪽을 살려 두어 입력이 계속 대기 상태
        let (_writer, reader) = tokio::io::duplex(64);
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_menu(&app, BufReader::new(reader), || async {}),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[test]
    fn test_partial_report_only_for_aborted_twap() {
        assert!(partial_report(&TradingError::Cancelled).is_none());

        let completed: Vec<OrderResult> = Vec::new();
        let empty = TradingError::TwapAborted {
            completed,
            failed_slice: 0,
            source: Box::new(TradingError::Cancelled),
        };
        assert!(partial_report(&empty).is_none());
    }

    #[test]
    fn test_cli_accepts_credentials() {
        let cli = Cli::try_parse_from([
            "xfutures", "--api-key", "key", "--api-secret", "secret", "market", "--symbol", "BTCUSDT", "--side",
            "BUY", "--qty", "0.002",
        ])
        .unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("key"));
        assert_eq!(cli.api_secret.as_deref(), Some("secret"));
        assert!(matches!(cli.command, CliCommand::Market { .. }));
    }
}
