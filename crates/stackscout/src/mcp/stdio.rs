use crate::prelude::{eprintln, *};
use crate::remote::Transport;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::Server;

pub async fn run_stdio<T: Transport>(server: Server<T>) -> Result<()> {
    if server.verbose {
        eprintln!("StackScout MCP server reading JSON-RPC from stdin");
    }

    let shutdown = server.shutdown.clone();
    let result = serve(tokio::io::stdin(), tokio::io::stdout(), Arc::new(server)).await;

    // stdin is closed and every answer is written; stop any stray job polls
    shutdown.cancel();
    result
}

/// Answer newline-delimited requests. Each request runs on its own task so a
/// long `recommend_stack` poll does not hold up catalog lookups; responses are
/// written in completion order and notifications get none.
async fn serve<T, R, W>(input: R, mut output: W, server: Arc<Server<T>>) -> Result<()>
where
    T: Transport,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if server.verbose {
                    eprintln!("Received: {line}");
                }

                let server = Arc::clone(&server);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Some(response) = super::handle_request(&line, &server).await else {
                        return;
                    };
                    match serde_json::to_string(&response) {
                        Ok(json) => {
                            // the receiver only goes away once the writer failed
                            let _ = tx.send(json);
                        }
                        Err(e) => log::error!("failed to encode response: {e}"),
                    }
                });
            }
            Some(json) = rx.recv() => write_line(&mut output, &json, server.verbose).await?,
        }
    }

    // EOF: drain what is still in flight
    drop(tx);
    while let Some(json) = rx.recv().await {
        write_line(&mut output, &json, server.verbose).await?;
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, json: &str, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!("Sending: {json}");
    }
    output.write_all(json.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
