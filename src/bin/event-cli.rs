use clap::{Parser, ValueEnum};
use serde_json::{json, Value};
use uuid::Uuid;

use event_http_protocol::{Context, HttpMessage, Message, Protocol};

#[derive(Parser)]
#[command(name = "event-cli")]
#[command(about = "Send a single event over HTTP and print the reply", long_about = None)]
struct Cli {
    /// Destination URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Event type attribute
    #[arg(short = 't', long = "type", default_value = "com.example.ping")]
    event_type: String,

    /// Event source attribute
    #[arg(short, long, default_value = "/event-cli")]
    source: String,

    /// Event id (random if omitted)
    #[arg(long)]
    id: Option<String>,

    /// Event data, sent as JSON when it parses as JSON
    #[arg(short, long, default_value = "{}")]
    data: String,

    #[arg(short, long, value_enum, default_value_t = Mode::Binary)]
    mode: Mode,

    /// Extra request header, as name=value (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Binary,
    Structured,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let id = cli.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut builder = Protocol::builder().target(&cli.url);
    for header in &cli.headers {
        let (name, value) = header
            .split_once('=')
            .ok_or_else(|| format!("header '{}' is not name=value", header))?;
        builder = builder.header(name.trim(), value.trim());
    }
    let protocol = builder.build()?;

    let data: Option<Value> = serde_json::from_str(&cli.data).ok();
    let message = match cli.mode {
        Mode::Binary => {
            let (content_type, payload) = match &data {
                Some(value) => ("application/json", serde_json::to_vec(value)?),
                None => ("text/plain", cli.data.clone().into_bytes()),
            };
            HttpMessage::binary(
                [("id", id.as_str()), ("type", cli.event_type.as_str()), ("source", cli.source.as_str())],
                Some(content_type),
                payload,
            )?
        }
        Mode::Structured => {
            let content_type = if data.is_some() { "application/json" } else { "text/plain" };
            let event = json!({
                "specversion": "1.0",
                "id": id,
                "type": cli.event_type,
                "source": cli.source,
                "datacontenttype": content_type,
                "data": data.unwrap_or_else(|| Value::String(cli.data.clone())),
            });
            HttpMessage::structured(serde_json::to_vec(&event)?)
        }
    };

    let mut reply = protocol.request(&Context::new(), Box::new(message)).await?;
    println!("Sent event {}", id);
    for (name, value) in reply.headers() {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }

    let body = reply.read_body().await?;
    if !body.is_empty() {
        match serde_json::from_slice::<Value>(&body) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", String::from_utf8_lossy(&body)),
        }
    }
    Box::new(reply).finish(None)?;
    Ok(())
}
