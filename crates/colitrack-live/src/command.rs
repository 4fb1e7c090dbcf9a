//! Operator commands read from stdin.
//!
//! One command per line:
//!
//! | Line | Effect |
//! |------|--------|
//! | `track CODE` or `CODE` | Start tracking `CODE` |
//! | `stop` | Stop tracking |
//! | `refresh` | Re-fetch agencies and parcels |
//! | `quit` | Exit |

use colitrack_types::TrackingCode;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Track a shipment.
    Track(TrackingCode),
    /// Stop tracking.
    Stop,
    /// Re-fetch the entity layer.
    Refresh,
    /// Leave the live loop.
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments: {line:?}"));
    }
    let command = match (head.to_lowercase().as_str(), arg) {
        ("stop", None) => Command::Stop,
        ("refresh", None) => Command::Refresh,
        ("quit" | "exit", None) => Command::Quit,
        ("track", Some(raw)) => Command::Track(parse_code(raw)?),
        ("track", None) => return Err(String::from("track needs a tracking code")),
        (_, None) => Command::Track(parse_code(head)?),
        _ => return Err(format!("unknown command: {line:?}")),
    };
    Ok(Some(command))
}

fn parse_code(raw: &str) -> Result<TrackingCode, String> {
    TrackingCode::parse(raw).ok_or_else(|| format!("invalid tracking code: {raw:?}"))
}

/// The code to track at startup: the last valid argument.
///
/// Invalid arguments are logged and skipped.
pub fn initial_code<I>(args: I) -> Option<TrackingCode>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().fold(None, |last, raw| match TrackingCode::parse(&raw) {
        Some(code) => Some(code),
        None => {
            warn!(arg = raw, "ignoring invalid tracking code argument");
            last
        }
    })
}

/// Forward commands read from `input` until it ends or the receiver is
/// dropped. End of input is not a quit; the process keeps serving until
/// interrupted.
pub async fn read_commands<R>(input: R, tx: mpsc::Sender<Command>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read command input");
                break;
            }
        };
        match parse_command(&line) {
            Ok(Some(command)) => {
                if tx.send(command).await.is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(message) => warn!("{message}"),
        }
    }
    debug!("command input closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn code(raw: &str) -> TrackingCode {
        TrackingCode::parse(raw).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("track COL123").unwrap(),
            Some(Command::Track(code("COL123")))
        );
        assert_eq!(
            parse_command("  COL123 ").unwrap(),
            Some(Command::Track(code("COL123")))
        );
        assert_eq!(parse_command("STOP").unwrap(), Some(Command::Stop));
        assert_eq!(parse_command("refresh").unwrap(), Some(Command::Refresh));
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_command("track").is_err());
        assert!(parse_command("track A B").is_err());
        assert!(parse_command("stop now").is_err());
    }

    #[test]
    fn last_valid_argument_wins() {
        let args = (0..40)
            .map(|i| format!("COL{i:03}"))
            .chain(["not a code".to_owned(), String::new()]);
        assert_eq!(initial_code(args), Some(code("COL039")));
        assert_eq!(initial_code(Vec::<String>::new()), None);
        assert_eq!(initial_code(vec![String::new()]), None);
    }

    #[tokio::test]
    async fn reader_forwards_valid_commands() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"COL123\n\nbogus words here\nstop\n";
        read_commands(input, tx).await;
        assert_eq!(rx.recv().await, Some(Command::Track(code("COL123"))));
        assert_eq!(rx.recv().await, Some(Command::Stop));
        // The sender is dropped at end of input.
        assert_eq!(rx.recv().await, None);
    }
}
