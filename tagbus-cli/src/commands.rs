use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio::time::Instant;
use tracing::info;

use tagbus_client::{Connection, TcpTransport, Transport};
use tagbus_config::TagbusConfig;
use tagbus_core::{FromArgs, Interval, Port, Record, RecordType, Subnet, Tag, Time, Value};
use tagbus_telemetry::MetricsRecorder;

#[derive(Parser)]
#[command(name = "tagbus", version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/tagbus.yaml when present
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Overrides telemetry.log_level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the reference exchange against a peer that echoes test1 as test2/test2b
    Demo(DemoArgs),
    /// Send a single event
    Send(SendArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Peer as host:port; overrides connection.endpoint
    #[arg(short, long)]
    pub endpoint: Option<String>,
    /// Give up on a phase after this many seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,
    /// Print Prometheus counters when done
    #[arg(long)]
    pub print_metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    #[arg(short, long)]
    pub endpoint: Option<String>,
    #[arg(long)]
    pub event: String,
    /// Argument as TAG:TEXT, e.g. count:3, port:5555/tcp, subnet:10.0.0.0/8
    #[arg(short, long = "arg", value_name = "TAG:TEXT")]
    pub args: Vec<String>,
}

type AtomicArgs = (
    i64,
    u64,
    Time,
    Interval,
    bool,
    f64,
    String,
    Port,
    std::net::IpAddr,
    Subnet,
    std::net::IpAddr,
    Subnet,
);

fn open(
    config: &TagbusConfig,
    metrics: Option<Arc<MetricsRecorder>>,
) -> Connection<TcpTransport> {
    let conn = Connection::with_config(TcpTransport::from_config(&config.connection), config);
    match metrics {
        Some(metrics) => conn.with_metrics(metrics),
        None => conn,
    }
}

/// Parses one `TAG:TEXT` command-line argument.
pub fn parse_arg(raw: &str) -> anyhow::Result<Value> {
    let (tag, text) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("argument '{raw}' is not of the form TAG:TEXT"))?;
    let tag: Tag = tag.parse()?;
    Value::parse(tag, text).with_context(|| format!("invalid argument '{raw}'"))
}

async fn poll_until<T: Transport>(
    conn: &mut Connection<T>,
    received: &AtomicUsize,
    target: usize,
    args: &DemoArgs,
) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    loop {
        conn.process_input()?;
        if received.load(Ordering::SeqCst) >= target {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "timed out after {}s with {} of {target} events",
                args.timeout_secs,
                received.load(Ordering::SeqCst)
            );
        }
        tokio::time::sleep(Duration::from_millis(args.poll_interval_ms)).await;
    }
}

pub async fn run_demo(
    args: DemoArgs,
    config: TagbusConfig,
    metrics: Option<Arc<MetricsRecorder>>,
) -> anyhow::Result<()> {
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.connection.endpoint.clone());
    let mut conn = open(&config, metrics.clone());
    let received = Arc::new(AtomicUsize::new(0));

    let counter = received.clone();
    conn.register_untyped("test2", move |values| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        println!("==== atomic a {n} ====");
        for value in &values {
            println!("{} {value}", value.tag());
        }
    })?;

    let counter = received.clone();
    conn.register_typed("test2b", move |a: AtomicArgs| {
        println!("==== atomic b {} ====", counter.load(Ordering::SeqCst));
        println!("int {}", a.0);
        println!("count {}", a.1);
        println!("time {:.4}", a.2.as_secs());
        println!("interval {}", a.3);
        println!("bool {}", a.4);
        println!("double {}", a.5);
        println!("string {}", a.6);
        println!("port {}", a.7);
        println!("addr {}", a.8);
        println!("subnet {}", a.9);
        println!("addr {}", a.10);
        println!("subnet {}", a.11);
    })?;

    let rec = RecordType::create(["a", "b"])?;
    let counter = received.clone();
    let signature = <(Record,)>::signature().with_record_type(0, rec.clone());
    conn.register_typed_with("test4", signature, move |(r,): (Record,)| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        println!("==== record {n} ====");
        println!("{r}");
        for field in r.record_type().fields() {
            match r.get(field) {
                Ok(Some(value)) => println!("{field} {} {value}", value.tag()),
                _ => println!("{field} <unset>"),
            }
        }
    })?;

    conn.connect(&endpoint)?;

    conn.send(
        "test1",
        &[
            Value::Int(-10),
            Value::count(2)?,
            Value::Time(Time::now()),
            Value::interval(120.0),
            Value::Bool(false),
            Value::Double(1.5),
            Value::from("Servus"),
            Value::parse(Tag::Port, "5555/tcp")?,
            Value::parse(Tag::Addr, "6.7.6.5")?,
            Value::parse(Tag::Subnet, "192.168.0.0/16")?,
            Value::parse(Tag::Addr, "2001:db8:85a3::8a2e:370:7334")?,
            Value::parse(Tag::Subnet, "2001:db8:85a3::/48")?,
        ],
    )?;
    poll_until(&mut conn, &received, 2, &args).await?;
    info!("Atomic phase complete");

    let record = Record::new(&rec)
        .with("a", 42i64)?
        .with("b", Value::parse(Tag::Addr, "6.6.7.7")?)?;
    received.store(0, Ordering::SeqCst);
    conn.send("test3", &[Value::Record(record)])?;
    poll_until(&mut conn, &received, 2, &args).await?;
    info!("Record phase complete");

    let optional = RecordType::create(["one", "a", "b", "c", "d"])?;
    let sparse = Record::new(&optional)
        .with("a", 13i64)?
        .with("c", "helloworld")?;
    conn.send("test5", &[Value::Record(sparse)])?;
    conn.close();

    if args.print_metrics {
        if let Some(metrics) = metrics {
            println!("{}", metrics.gather_metrics()?);
        }
    }
    Ok(())
}

pub fn run_send(
    args: SendArgs,
    config: TagbusConfig,
    metrics: Option<Arc<MetricsRecorder>>,
) -> anyhow::Result<()> {
    let values = args
        .args
        .iter()
        .map(|raw| parse_arg(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let endpoint = args
        .endpoint
        .unwrap_or_else(|| config.connection.endpoint.clone());

    let mut conn = open(&config, metrics);
    conn.connect(&endpoint)?;
    conn.send(&args.event, &values)?;
    info!(event = %args.event, argc = values.len(), %endpoint, "Event sent");
    conn.close();
    Ok(())
}
