//! Line-delimited JSON bridge between the presentation layer and the
//! command handlers. One request per input line; each produces any pending
//! event lines followed by exactly one response line.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::{self, AppState};
use crate::error::{ManagerError, Result};
use crate::manager::ManagerEvent;
use crate::transport::Connector;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    command: String,
    #[serde(default)]
    args: Value,
}

fn args<T: DeserializeOwned + Default>(args: Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(args)?)
}

fn required<T: DeserializeOwned>(args: Value) -> Result<T> {
    Ok(serde_json::from_value(args)?)
}

fn reply<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

async fn dispatch<C: Connector>(state: &mut AppState<C>, command: &str, raw: Value) -> Result<Value> {
    use commands::{config, resources, session};

    match command {
        "load_settings" => reply(config::load_settings(state.settings_path.as_deref())),
        "save_settings" => {
            let settings: config::ConnectionSettings = required(raw)?;
            config::save_settings(state.settings_path.as_deref(), &settings)?;
            Ok(Value::Null)
        }
        "connect" => {
            session::connect(state, args(raw)?).await?;
            Ok(Value::Null)
        }
        "disconnect" => reply(session::disconnect(state).await?),
        "load_all" => reply(session::load_all(state).await?),
        "save_all" => reply(session::save_all(state).await?),
        "get_resources" => reply(resources::get_resources(state)),
        "set_config_value" => reply(resources::set_config_value(state, required(raw)?)?),
        "replace_records" => reply(resources::replace_records(state, required(raw)?)?),
        "set_raid_schedule" => reply(resources::set_raid_schedule(state, required(raw)?)?),
        "set_raid_guard" => reply(resources::set_raid_guard(state, required(raw)?)?),
        "token_buckets" => reply(resources::token_buckets(state)?),
        "filter_server_log" => reply(resources::filter_server_log(state, args(raw)?)?),
        "classify_value" => reply(resources::classify_value(required(raw)?)),
        other => Err(ManagerError::Custom(format!("Unknown command: {other}"))),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, value: &impl Serialize) -> Result<()> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}

fn describe(event: &ManagerEvent) -> (&'static str, String) {
    match event {
        ManagerEvent::Connected { host, port } => ("ftp", format!("Connected to {host}:{port}")),
        ManagerEvent::Reconnected { host, port } => {
            ("ftp", format!("Session dropped, reconnected to {host}:{port}"))
        }
        ManagerEvent::Fetched { path, bytes } => ("load", format!("RETR {path} ({bytes} bytes)")),
        ManagerEvent::Stored { path, bytes } => ("save", format!("STOR {path} ({bytes} bytes)")),
        ManagerEvent::Failed { action, error } => ("error", format!("{action} failed: {error}")),
    }
}

/// Serve requests from `input` until it closes.
pub async fn serve<C, R, W>(
    state: &mut AppState<C>,
    events: &mut mpsc::UnboundedReceiver<ManagerEvent>,
    input: R,
    mut output: W,
) -> Result<()>
where
    C: Connector,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut input = BufReader::new(input);
    let mut line = Vec::new();

    loop {
        line.clear();
        if input.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        // Raw bytes, so invalid UTF-8 is reported like any other bad line
        let (id, command, outcome) = match serde_json::from_slice::<Request>(&line) {
            Ok(request) => {
                let outcome = dispatch(state, &request.command, request.args).await;
                (request.id, Some(request.command), outcome)
            }
            Err(e) => (
                Value::Null,
                None,
                Err(ManagerError::Custom(format!("Malformed request: {e}"))),
            ),
        };

        let mut reported = false;
        while let Ok(event) = events.try_recv() {
            reported |= matches!(event, ManagerEvent::Failed { .. });
            let (prefix, message) = describe(&event);
            state.log(prefix, &message);
            write_line(&mut output, &event).await?;
        }

        let response = match outcome {
            Ok(data) => json!({ "id": id, "ok": true, "data": data }),
            Err(e) => {
                if !reported {
                    let command = command.as_deref().unwrap_or("request");
                    state.log("error", &format!("{command}: {e}"));
                }
                json!({ "id": id, "ok": false, "error": e })
            }
        };
        write_line(&mut output, &response).await?;
    }

    Ok(())
}
