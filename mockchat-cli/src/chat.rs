//! Interactive chat loop
//!
//! Reads lines from stdin and renders controller events as they arrive.
//! Both sources are polled from one task so output never interleaves
//! mid-line. On end of input the loop keeps rendering until every
//! outstanding reply has landed.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use console::style;
use mockchat_core::auth::{self, Route, SessionStore};
use mockchat_core::chat::{
    Attachment, Author, ChatEvent, ChatSessionController, Composer, ConversationId, ReplyState,
};
use mockchat_core::config::Config;
use mockchat_core::Error;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    New,
    List,
    Select(usize),
    Delete(Option<usize>),
    Attach(String),
    Detach(usize),
    Files,
    Model(Option<String>),
    History,
    Logout,
    Quit,
    Say(String),
    Invalid(String),
}

fn parse_index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg) {
        ("help", _) => Command::Help,
        ("new", _) => Command::New,
        ("list", _) => Command::List,
        ("select", arg) => parse_index(arg)
            .map(Command::Select)
            .unwrap_or_else(|| Command::Invalid("usage: /select <n>".into())),
        ("delete", "") => Command::Delete(None),
        ("delete", arg) => parse_index(arg)
            .map(|n| Command::Delete(Some(n)))
            .unwrap_or_else(|| Command::Invalid("usage: /delete [n]".into())),
        ("attach", "") => Command::Invalid("usage: /attach <path>".into()),
        ("attach", arg) => Command::Attach(arg.to_string()),
        ("detach", arg) => parse_index(arg)
            .map(Command::Detach)
            .unwrap_or_else(|| Command::Invalid("usage: /detach <n>".into())),
        ("files", _) => Command::Files,
        ("model", "") | ("models", _) => Command::Model(None),
        ("model", arg) => Command::Model(Some(arg.to_string())),
        ("history", _) => Command::History,
        ("logout", _) => Command::Logout,
        ("quit", _) | ("exit", _) => Command::Quit,
        (other, _) => Command::Invalid(format!("unknown command /{}; try /help", other)),
    }
}

enum Flow {
    Continue,
    Stop,
}

/// "Just now", "5m ago", "3h ago", "2d ago", then the date
fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        then.format("%Y-%m-%d").to_string()
    }
}

fn print_help() {
    println!("{}", style("Commands:").bold());
    for (cmd, what) in [
        ("/new", "start a new conversation"),
        ("/list", "list conversations"),
        ("/select <n>", "switch to conversation n"),
        ("/delete [n]", "delete conversation n (default: current)"),
        ("/attach <path>", "attach a file to the next message"),
        ("/detach <n>", "remove pending attachment n"),
        ("/files", "show pending attachments"),
        ("/model [name]", "show or choose the model"),
        ("/history", "show the current conversation"),
        ("/logout", "sign out and leave"),
        ("/quit", "leave"),
    ] {
        println!("  {:<16} {}", style(cmd).cyan(), what);
    }
}

fn conversation_at(
    controller: &ChatSessionController,
    n: usize,
) -> mockchat_core::Result<ConversationId> {
    controller
        .conversations()
        .get(n - 1)
        .map(|c| c.id.clone())
        .ok_or_else(|| Error::NotFound(format!("conversation {}", n)))
}

fn current_id(controller: &ChatSessionController) -> mockchat_core::Result<ConversationId> {
    controller
        .current_conversation_id()
        .ok_or_else(|| Error::NotFound("no conversation selected; use /new".to_string()))
}

fn print_list(controller: &ChatSessionController) {
    let current = controller.current_conversation_id();
    let now = Utc::now();
    let conversations = controller.conversations();
    if conversations.is_empty() {
        println!("{}", style("No conversations. Use /new.").dim());
    }
    for (i, c) in conversations.iter().enumerate() {
        let marker = if current.as_ref() == Some(&c.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}. {}  {}  {}",
            marker,
            i + 1,
            style(&c.title).bold(),
            style(&c.last_message_preview).dim(),
            style(format_relative(c.updated_at, now)).dim()
        );
    }
}

fn print_history(controller: &ChatSessionController) -> mockchat_core::Result<()> {
    let id = current_id(controller)?;
    for message in controller.messages(&id).unwrap_or_default() {
        let who = match message.author {
            Author::User => style("you").green().bold(),
            Author::Assistant => style("assistant").cyan().bold(),
        };
        println!("{}: {}", who, message.body);
        for file in &message.attachments {
            println!("    [{}] {}", file.media_type, file.name);
        }
    }
    Ok(())
}

fn handle_command(
    controller: &ChatSessionController,
    sessions: &SessionStore,
    composer: &mut Composer,
    command: Command,
) -> mockchat_core::Result<Flow> {
    match command {
        Command::Help => print_help(),
        Command::New => {
            controller.create_conversation();
            println!("{}", style("Started a new conversation.").green());
        }
        Command::List => print_list(controller),
        Command::Select(n) => {
            let id = conversation_at(controller, n)?;
            controller.select_conversation(&id)?;
            print_history(controller)?;
        }
        Command::Delete(n) => {
            let id = match n {
                Some(n) => conversation_at(controller, n)?,
                None => current_id(controller)?,
            };
            controller.delete_conversation(&id);
            println!("{}", style("Conversation deleted.").yellow());
        }
        Command::Attach(path) => {
            let path = Path::new(&path);
            if !path.is_file() {
                return Err(Error::NotFound(format!("file {}", path.display())));
            }
            let attachment = Attachment::from_path(path)?;
            println!("Attached {} ({})", attachment.name, attachment.media_type);
            composer.attach(attachment);
        }
        Command::Detach(n) => {
            let removed = composer
                .detach(n - 1)
                .ok_or_else(|| Error::NotFound(format!("attachment {}", n)))?;
            println!("Removed {}", removed.name);
        }
        Command::Files => {
            if composer.attachments().is_empty() {
                println!("{}", style("No pending attachments.").dim());
            }
            for (i, file) in composer.attachments().iter().enumerate() {
                println!("  {}. {} ({})", i + 1, file.name, file.media_type);
            }
        }
        Command::Model(None) => {
            let selected = controller.selected_model();
            for model in controller.available_models() {
                let marker = if model == &selected { "*" } else { " " };
                println!("{} {}", marker, model);
            }
        }
        Command::Model(Some(name)) => {
            controller.select_model(&name)?;
            println!("Model set to {}", style(&name).bold());
        }
        Command::History => print_history(controller)?,
        Command::Logout => {
            controller.cancel_pending();
            sessions.end_session()?;
            println!("{}", style("Signed out.").green());
            return Ok(Flow::Stop);
        }
        Command::Quit => return Ok(Flow::Stop),
        Command::Say(text) => {
            composer.set_text(text);
            controller.send_draft(composer)?;
        }
        Command::Invalid(reason) => println!("{}", style(reason).yellow()),
    }
    Ok(Flow::Continue)
}

fn render_event(controller: &ChatSessionController, event: ChatEvent) {
    match event {
        ChatEvent::MessageAppended {
            conversation_id,
            message_id,
            author: Author::Assistant,
        } => {
            let body = controller
                .messages(&conversation_id)
                .and_then(|messages| messages.into_iter().find(|m| m.id == message_id))
                .map(|m| m.body);
            if let Some(body) = body {
                println!("{}: {}", style("assistant").cyan().bold(), body);
            }
        }
        ChatEvent::ReplyStateChanged {
            state: ReplyState::AwaitingReply,
            ..
        } => {
            println!(
                "{}",
                style(format!("{} is typing...", controller.selected_model())).dim()
            );
        }
        ChatEvent::ReplyFailed { reason, .. } => {
            println!("{} {}", style("reply failed:").red(), reason);
        }
        _ => {}
    }
}

fn any_awaiting(controller: &ChatSessionController) -> bool {
    controller
        .conversations()
        .iter()
        .any(|c| controller.reply_state(&c.id) == Some(ReplyState::AwaitingReply))
}

/// Run the chat until /quit, /logout or end of input
pub async fn run_chat(sessions: &SessionStore, config: &Config) -> Result<()> {
    let session = match auth::route(sessions) {
        Route::Chat(session) => session,
        Route::Login => bail!("not signed in; run `mockchat login` or `mockchat register` first"),
    };

    let controller = ChatSessionController::with_canned_replies(config.chat.clone());
    let mut events = controller.subscribe();
    controller.create_conversation();

    println!(
        "Signed in as {} <{}>. Type {} for commands.",
        style(&session.display_name).bold(),
        session.email,
        style("/help").cyan()
    );
    if !config.chat.greeting.is_empty() {
        println!(
            "{}: {}",
            style("assistant").cyan().bold(),
            config.chat.greeting
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut composer = Composer::new();
    let mut stdin_open = true;

    loop {
        if !stdin_open && !any_awaiting(&controller) {
            break;
        }

        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                let command = parse_command(line.trim_end());
                match handle_command(&controller, sessions, &mut composer, command) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Stop) => break,
                    Err(e) if e.is_user_recoverable() => {
                        println!("{} {}", style("!").red().bold(), e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            event = events.recv() => match event {
                Ok(event) => render_event(&controller, event),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} chat events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Replies that landed between the last poll and the idle check
    loop {
        match events.try_recv() {
            Ok(event) => render_event(&controller, event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    Ok(())
}
