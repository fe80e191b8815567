//! Line-delimited JSON-RPC transport
//!
//! One request per `\n`-terminated line in, one response per line out.
//! Requests are handled strictly in arrival order.

use {
    crate::{
        dispatcher::Dispatcher,
        error::McpError,
        logging::{self, McpConnectionId},
    },
    futures_util::FutureExt,
    std::{any::Any, panic::AssertUnwindSafe, time::Instant},
    tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    tracing::Instrument,
};

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// Only I/O failures on the stream itself end the loop early.
pub async fn serve<R, W>(dispatcher: &Dispatcher, reader: R, writer: W) -> Result<(), McpError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let connection_id = McpConnectionId::new();
    let span = logging::connection_span(&connection_id);
    run(dispatcher, reader, writer, &connection_id).instrument(span).await
}

async fn run<R, W>(
    dispatcher: &Dispatcher,
    mut reader: R,
    mut writer: W,
    connection_id: &McpConnectionId,
) -> Result<(), McpError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    logging::log_connection_opened(connection_id);
    let started = Instant::now();
    let mut handled = 0u64;
    let mut buf = Vec::with_capacity(4096);

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        handled += 1;

        let line = buf.trim_ascii();
        let response = match AssertUnwindSafe(dispatcher.handle_line(line)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                logging::log_handler_panic(&panic_message(panic.as_ref()));
                Some(McpError::Internal("request handler panicked".into()).to_json_rpc_error(None))
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
            logging::log_response_sent(out.len());
        }
    }

    logging::log_connection_closed(connection_id, started.elapsed(), handled);
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
