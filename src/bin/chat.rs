//! Interactive terminal client for the resume gateway
//!
//! Lines typed at the prompt start a new task when nothing is pending and
//! answer the pending prompt otherwise. `/retry` resends a request that got
//! no answer, `/abandon` drops the pending task, `/quit` exits.

use resume_gateway::client::{
    ClientError, ControllerState, Effect, HttpTransport, InteractionController, Update,
};
use resume_gateway::config::ClientConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resume_gateway=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    let session_id = uuid::Uuid::new_v4().to_string();
    let transport = HttpTransport::new(&config.server_url, config.request_timeout)?;
    let controller = InteractionController::new(transport);

    println!("Connected to {} as session {session_id}", config.server_url);
    println!("Describe the document you need. /retry, /abandon and /quit are available.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let result = match line {
            "" => continue,
            "/quit" => break,
            "/retry" => controller.retry(&session_id).await,
            "/abandon" => controller.abandon(&session_id).await,
            text => controller.submit(&session_id, text).await,
        };

        match result {
            Ok(update) => show(&update),
            Err(ClientError::Usage(e)) => println!("! {e}"),
            Err(ClientError::Transport(e)) => {
                println!("! {e}");
                println!("  Nothing was lost. Type /retry to send it again.");
            }
        }
    }

    Ok(())
}

fn show(update: &Update) {
    for effect in &update.output {
        match effect {
            Effect::ShowPrompt(affordance) => println!("{}", affordance.render()),
            Effect::ShowResult(result) => {
                println!("Done.");
                if let Some(path) = result.get("path").and_then(|p| p.as_str()) {
                    println!("  Saved to {path}");
                } else {
                    println!("  {result}");
                }
            }
            Effect::ShowFailure(failure) => match &failure.code {
                Some(code) => println!("Stopped ({code}): {}", failure.message),
                None => println!("Stopped: {}", failure.message),
            },
            Effect::ShowError { code, message } => println!("! {message} ({code})"),
            Effect::SessionReset { dropped: true } => println!("Pending task abandoned."),
            Effect::SessionReset { dropped: false } => println!("Nothing was pending."),
            Effect::SendStart { .. } | Effect::SendResume { .. } | Effect::SendReset => {}
        }
    }

    if update.state.can_retry() {
        println!("  Type /retry to send it again.");
    } else if let ControllerState::Idle { .. } = update.state {
        println!("Ready for a new request.");
    }
}
