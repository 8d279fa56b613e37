//! BitFrac CLI - offline helpers around the DApp core
//!
//!   bitfrac chains                          → Known networks
//!   bitfrac units <amount> --currency ETH   → Decimal amount → smallest unit
//!   bitfrac units <value> --decimals 8 --format
//!   bitfrac estimate <amount> [days]        → Staking reward estimate(s)
//!   bitfrac demo                            → Scripted wallet session walkthrough
//!
//! Configuration:
//!   bitfrac init --app <name> --chain-id <id> --presale <addr> --token <addr> ...
//!   bitfrac config [--app <name>]
//!
//! Output format:
//!   --json     Output compact JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use anyhow::{anyhow, Context, Result};
use bitfrac::config::{config_path, load_dotenv, AppConfig, DEFAULT_APP};
use bitfrac::core::{known_networks, parse_chain_id, SEPOLIA_CHAIN_ID};
use bitfrac::dapp::staking::{tier, MIN_STAKING_DAYS};
use bitfrac::dapp::{estimate_reward, format_units, parse_units, Currency, InvestmentRegistration, TIERS};
use bitfrac::logging::init_logging;
use bitfrac::{MockProvider, ProviderEvent, SessionConfig, SessionSnapshot, WalletSession};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("bitfrac {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("chains") => cmd_chains(),
        Some("units") => cmd_units(&opts),
        Some("estimate") => cmd_estimate(&opts),
        Some("demo") => cmd_demo(&opts),
        Some("init") => cmd_init(&opts),
        Some("config") => cmd_config(&opts),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || (!opts.json && std::io::stdout().is_terminal());
    let render = |value: &Value| {
        if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .unwrap_or_else(|_| value.to_string())
    };

    match result {
        Ok(output) => println!("{}", render(&output)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": format!("{e:#}")})));
            std::process::exit(1);
        }
    }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    positional: Vec<String>,
    // Config options
    app: Option<String>,
    chain_id: Option<String>,
    token: Option<String>,
    presale: Option<String>,
    revenue: Option<String>,
    stablecoin: Option<String>,
    // Units options
    currency: Option<String>,
    decimals: Option<String>,
    format: bool,
    // Demo options
    delay_ms: Option<u64>,
    // Output options
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv(Path::new(".env"));

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let mut value = || {
                i += 1;
                args.get(i).cloned()
            };
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--format" => opts.format = true,
                "--app" | "-a" => opts.app = value(),
                "--chain-id" | "-c" => opts.chain_id = value(),
                "--token" => opts.token = value(),
                "--presale" => opts.presale = value(),
                "--revenue" => opts.revenue = value(),
                "--stablecoin" => opts.stablecoin = value(),
                "--currency" => opts.currency = value(),
                "--decimals" | "-d" => opts.decimals = value(),
                "--delay-ms" => opts.delay_ms = value().and_then(|v| v.parse().ok()),
                _ => positional.push(arg.clone()),
            }
            i += 1;
        }

        let mut positional = positional.into_iter();
        opts.command = positional.next();
        opts.positional = positional.collect();
        opts
    }

    fn arg(&self, index: usize, name: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{name}>"))
    }

    fn app(&self) -> String {
        self.app
            .clone()
            .or_else(|| env::var("BITFRAC_APP").ok())
            .unwrap_or_else(|| DEFAULT_APP.into())
    }

    /// Decimals from `--decimals`, else from `--currency`, else 18 (ETH).
    fn unit_decimals(&self) -> Result<(u8, Option<Currency>)> {
        if let Some(decimals) = &self.decimals {
            let decimals = decimals.parse().with_context(|| format!("invalid --decimals {decimals}"))?;
            return Ok((decimals, None));
        }
        match &self.currency {
            Some(symbol) => {
                let currency: Currency = symbol.parse()?;
                Ok((currency.decimals(), Some(currency)))
            }
            None => Ok((Currency::Eth.decimals(), Some(Currency::Eth))),
        }
    }
}

fn print_usage() {
    println!(
        r#"bitfrac - BitFrac DApp wallet session core

USAGE:
    bitfrac <command> [args] [options]

COMMANDS:
    chains                      List known networks
    units <amount>              Convert a decimal amount to the smallest unit
    units <value> --format      Convert a smallest-unit value back to decimal
    estimate <amount> [days]    Staking reward estimate (all tiers if no days)
    demo                        Walk a scripted wallet through a session
    init                        Save config (app, chain, contract addresses)
    config                      Show the effective config

OPTIONS:
    -a, --app <name>            App name (default: bitfrac, env: BITFRAC_APP)
    -c, --chain-id <id>         Expected chain id, hex or decimal
    --token/--presale/--revenue/--stablecoin <addr>
                                Contract addresses
    --currency <symbol>         BTC, ETH, USDT_on_ETH, XRP, DOGE, USDT
    -d, --decimals <n>          Explicit unit decimals
    --delay-ms <ms>             Simulated approval delay for demo (default 250)
    --json                      Compact JSON output
    --pretty                    Pretty-printed JSON output
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT:
    BITFRAC_ROOT                Base directory for saved config
    BITFRAC_LOG_JSON=1          JSON log lines on stderr
    RUST_LOG                    Log filter (default: info)
"#
    );
}

fn cmd_chains() -> Result<Value> {
    let chains: Vec<Value> = known_networks()
        .into_iter()
        .map(|network| {
            json!({
                "chainId": network.chain_id,
                "hex": network.hex_chain_id(),
                "name": network.name,
            })
        })
        .collect();
    Ok(json!({ "chains": chains }))
}

fn cmd_units(opts: &ParsedArgs) -> Result<Value> {
    let input = opts.arg(0, "amount")?;
    let (decimals, currency) = opts.unit_decimals()?;
    let currency = currency.map(|c| c.symbol());

    if opts.format {
        let value: u128 = input.parse().with_context(|| format!("invalid integer value {input}"))?;
        return Ok(json!({
            "value": input,
            "decimals": decimals,
            "currency": currency,
            "amount": format_units(value, decimals),
        }));
    }

    let value = parse_units(input, decimals)?;
    Ok(json!({
        "amount": input,
        "decimals": decimals,
        "currency": currency,
        "value": value.to_string(),
    }))
}

fn cmd_estimate(opts: &ParsedArgs) -> Result<Value> {
    let amount: f64 = opts
        .arg(0, "amount")?
        .parse()
        .context("amount must be a number")?;

    if let Some(days) = opts.positional.get(1) {
        let days: u32 = days.parse().with_context(|| format!("invalid days {days}"))?;
        let reward = estimate_reward(amount, days)?;
        let apy = tier(days).map(|t| t.apy);
        return Ok(json!({ "amount": amount, "days": days, "apy": apy, "reward": reward }));
    }

    let tiers = TIERS
        .iter()
        .map(|t| -> Result<Value> {
            let reward = estimate_reward(amount, t.days)?;
            Ok(json!({ "days": t.days, "label": t.label, "apy": t.apy, "reward": reward }))
        })
        .collect::<Result<Vec<Value>>>()?;
    Ok(json!({ "amount": amount, "minDays": MIN_STAKING_DAYS, "tiers": tiers }))
}

const DEMO_ACCOUNT: &str = "0xABC0000000000000000000000000000000000001";
const DEMO_SECOND_ACCOUNT: &str = "0xABC0000000000000000000000000000000000002";

fn step(name: &str, snapshot: &SessionSnapshot) -> Value {
    debug!(step = name, state = snapshot.connection_state.as_str(), "demo step");
    json!({ "step": name, "status": snapshot.describe(), "snapshot": snapshot })
}

/// Drive a `MockProvider` through connect, chain switch, account switch and
/// revocation. Runs on a current-thread runtime since the session is `!Send`.
fn cmd_demo(opts: &ParsedArgs) -> Result<Value> {
    let delay = Duration::from_millis(opts.delay_ms.unwrap_or(250));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(run_demo(opts, delay))
}

async fn run_demo(opts: &ParsedArgs, delay: Duration) -> Result<Value> {
    let provider = Rc::new(MockProvider::new([DEMO_ACCOUNT], SEPOLIA_CHAIN_ID));
    let config = SessionConfig::new(opts.app()).with_expected_chain(SEPOLIA_CHAIN_ID);
    let session = WalletSession::new(Some(provider.clone()), config);
    let mut steps = vec![step("initial", &session.snapshot())];

    // Two clicks while the wallet popup is open share one request.
    let gate = provider.hold_approval();
    let (first, second, _) = futures::join!(session.connect(), session.connect(), async {
        tokio::time::sleep(delay).await;
        gate.approve();
    });
    let connected = first?;
    second?;
    info!(requests = provider.account_requests(), "demo: connected");
    steps.push(step("connect", &connected));

    let signer = session.signer().ok_or_else(|| anyhow!("connected session has no signer"))?;
    let signature = signer.sign_message(b"BitFrac demo").await?;
    let tx_hash = format!("0x{}", "ab".repeat(32));
    let registration = InvestmentRegistration::prepare(Some(&signer), "ETH", "0.5", &tx_hash)?;

    let mut pump = session
        .event_pump()
        .ok_or_else(|| anyhow!("provider listeners were not registered"))?;

    provider.set_chain_id(1);
    provider.emit_chain_changed(1);
    pump.drain().await;
    steps.push(step("chainChanged", &session.snapshot()));

    provider.emit(ProviderEvent::AccountsChanged(vec![DEMO_SECOND_ACCOUNT.into()]));
    pump.drain().await;
    steps.push(step("accountsChanged", &session.snapshot()));
    let stale_signer_valid = signer.is_valid();

    provider.emit_accounts_changed(Vec::<String>::new());
    pump.drain().await;
    steps.push(step("walletLocked", &session.snapshot()));

    Ok(json!({
        "steps": steps,
        "accountRequests": provider.account_requests(),
        "subscriptions": provider.subscriptions(),
        "signature": signature,
        "registration": { "call": registration, "args": registration.args() },
        "firstSignerValidAfterSwitch": stale_signer_valid,
    }))
}

fn apply_flags(mut config: AppConfig, opts: &ParsedArgs) -> Result<AppConfig> {
    if let Some(app) = &opts.app {
        config.app = app.clone();
    }
    if let Some(raw) = &opts.chain_id {
        config.expected_chain_id = Some(parse_chain_id(raw)?);
    }
    let contracts = &mut config.contracts;
    if let Some(v) = &opts.token { contracts.token = Some(v.clone()); }
    if let Some(v) = &opts.presale { contracts.presale = Some(v.clone()); }
    if let Some(v) = &opts.revenue { contracts.revenue_distribution = Some(v.clone()); }
    if let Some(v) = &opts.stablecoin { contracts.stablecoin = Some(v.clone()); }
    config.validate()?;
    Ok(config)
}

fn cmd_init(opts: &ParsedArgs) -> Result<Value> {
    let config = apply_flags(AppConfig::from_env()?, opts)?;
    let path = config_path(&config.app);
    config.save(&path)?;
    info!(path = %path.display(), "config saved");
    Ok(json!({ "path": path.display().to_string(), "config": config }))
}

fn cmd_config(opts: &ParsedArgs) -> Result<Value> {
    let path = config_path(&opts.app());
    let saved = path.exists();
    let base = if saved { AppConfig::load(&path)? } else { AppConfig::new(opts.app()) };
    let config = apply_flags(base.apply_env()?, opts)?;
    Ok(json!({ "path": path.display().to_string(), "saved": saved, "config": config }))
}
