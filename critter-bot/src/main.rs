//! Critter bot entry point.
//!
//! Wires configuration, credentials, the counter store, and the persona
//! together, then serves a `$`-prefixed command loop on stdin standing in
//! for the host chat platform.

use critter_bot::commands::{display_author, CommandHandler, Reply};
use critter_bot::config::BotConfig;
use critter_bot::cowsay::CowFormatter;
use critter_bot::error::BotError;
use critter_core::CommandRouter;
use critter_llm::providers::gemini::{GeminiChat, GeminiClient};
use critter_store::{AuthorizedUserToken, CounterStore, SheetsStore, StaticToken, TokenProvider};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands:\n  \
    $session <campaign>        Increment the campaign's session number\n  \
    $add <crit type> <name>    Log a crit for a character (e.g. $add 20 Morbo)\n  \
    $sounds <on|off>           Toggle sound attachments on crit replies\n  \
    $cowsay [message]          Have a cow say something\n  \
    $cowchat [message]         Talk to the cow\n  \
    $help                      Show this help\n  \
    $quit                      Exit";

#[tokio::main]
async fn main() -> Result<(), BotError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let handler = match build_handler().await {
        Ok(handler) => handler,
        Err(error) => {
            tracing::error!(error = %error, "startup failed");
            return Err(error);
        }
    };

    run_repl(handler).await
}

async fn build_handler() -> Result<CommandHandler, BotError> {
    let config = BotConfig::load()?;
    let (entities, metrics) = config.build_registries()?;
    let router = CommandRouter::new(entities, metrics, config.campaigns.clone());

    let token: Arc<dyn TokenProvider> = match (
        &config.auth.authorized_user_path,
        &config.auth.static_token,
    ) {
        (Some(path), _) => Arc::new(AuthorizedUserToken::load(path)?),
        (None, Some(token)) => Arc::new(StaticToken::new(token.clone())),
        (None, None) => {
            return Err(critter_bot::config::ConfigError::InvalidValue {
                field: "auth",
                reason: "authorized_user_path or static_token must be provided".to_string(),
            }
            .into())
        }
    };
    // Prove the credential is usable before accepting commands.
    token.bearer_token().await?;
    tracing::info!("store credential verified");

    let sheets = SheetsStore::new(
        config.spreadsheet_id.clone(),
        token,
        config.timeout(),
        config.retry_policy(),
    )?;
    let store = CounterStore::new(Arc::new(sheets));

    let gemini = GeminiClient::new(config.persona.api_key.clone(), config.timeout())?;
    let chat = Arc::new(GeminiChat::new(gemini, config.persona_config()));
    tracing::info!(model = %config.persona.model, "persona initialized");

    let cow = CowFormatter::new(config.cowsay_path.clone());

    Ok(CommandHandler::new(
        router,
        store,
        chat,
        cow,
        config.session_cell.clone(),
        config.assets.warning_image.clone(),
    ))
}

async fn run_repl(handler: CommandHandler) -> Result<(), BotError> {
    let author = std::env::var("USER")
        .map(|name| display_author(&name))
        .unwrap_or_else(|_| "someone".to_string());

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{}\n\n", HELP).as_bytes())
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(command_line) = line.strip_prefix('$') else {
            stdout
                .write_all(b"Commands start with '$'. Try $help.\n")
                .await?;
            continue;
        };

        let mut words = command_line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let result = match command {
            "session" => match args.as_slice() {
                [campaign] => handler.session(campaign).await,
                _ => usage("$session <campaign>"),
            },
            "add" => match args.as_slice() {
                [metric, subject] => handler.add(metric, subject, &author).await,
                _ => usage("$add <crit type> <character>"),
            },
            "sounds" => match args.as_slice() {
                [status] => Ok(handler.sounds(status)),
                _ => usage("$sounds <on|off>"),
            },
            "cowsay" => handler.cowsay(rest(&args).as_deref()).await,
            "cowchat" => handler.cowchat(rest(&args).as_deref(), &author).await,
            "help" => {
                stdout.write_all(format!("{}\n", HELP).as_bytes()).await?;
                continue;
            }
            "quit" | "exit" => break,
            other => {
                stdout
                    .write_all(format!("Unknown command: ${}\n{}\n", other, HELP).as_bytes())
                    .await?;
                continue;
            }
        };

        match result {
            Ok(reply) => render(&mut stdout, &reply).await?,
            Err(error) => {
                tracing::error!(error = %error, command, "command failed");
                stdout
                    .write_all(format!("Something went wrong: {}\n", error).as_bytes())
                    .await?;
            }
        }
    }

    Ok(())
}

// Rejoining loses original spacing; cowsay does not care.
fn rest(args: &[&str]) -> Option<String> {
    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}

fn usage(text: &str) -> Result<Reply, BotError> {
    Ok(Reply {
        title: "Usage".to_string(),
        body: text.to_string(),
        color: None,
        image: None,
        sound: None,
    })
}

async fn render(stdout: &mut tokio::io::Stdout, reply: &Reply) -> Result<(), BotError> {
    let mut out = String::new();
    if !reply.title.is_empty() {
        out.push_str(&format!("== {} ==\n", reply.title));
    }
    if !reply.body.is_empty() {
        out.push_str(reply.body.trim_end());
        out.push('\n');
    }
    if let Some(image) = &reply.image {
        out.push_str(&format!("[image: {}]\n", image.display()));
    }
    if let Some(sound) = &reply.sound {
        out.push_str(&format!("[sound: {}]\n", sound.display()));
    }
    stdout.write_all(out.as_bytes()).await?;
    Ok(())
}
