//! Direct message commands.

use std::path::PathBuf;

use bazaar_core::{MessageId, ThreadId};
use bazaar_storefront::messaging::{Post, Thread};
use bazaar_storefront::{AppContext, AppError};
use clap::Subcommand;

use super::say;

#[derive(Subcommand)]
pub enum DmAction {
    /// List your conversations
    Threads,
    /// Open a conversation with another member
    Open { username: String },
    /// Show a conversation and mark it read
    Read { thread: ThreadId },
    /// Send a message
    Send {
        thread: ThreadId,
        #[arg(default_value = "")]
        text: String,
        /// Attach a file (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Edit one of your messages
    Edit { post: MessageId, text: String },
    /// Delete a message
    DeletePost { post: MessageId },
    /// Delete a whole conversation
    DeleteThread { thread: ThreadId },
}

fn thread_line(thread: &Thread, ctx: &AppContext) -> String {
    let partner = ctx
        .dm()
        .me()
        .ok()
        .and_then(|me| thread.partner(me))
        .map_or("?", |m| m.username.as_str());
    let last = thread
        .last_message_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!("#{:<5} {partner:<20} {last}", thread.id)
}

fn print_post(post: &Post) {
    let who = post
        .sender
        .as_ref()
        .map(|s| s.username.clone())
        .or_else(|| post.sender_id.map(|id| format!("member #{id}")))
        .unwrap_or_default();
    let id = post.id.map(|id| id.to_string()).unwrap_or_default();
    let edited = if post.edited_at.is_some() { " (edited)" } else { "" };
    say(&format!("[{id}] {who}: {}{edited}", post.content));
    for attachment in &post.attachments {
        say(&format!("      {} {}", attachment.file_type, attachment.file_url));
    }
}

pub async fn run(ctx: &AppContext, action: DmAction) -> Result<(), AppError> {
    let dm = ctx.dm();
    match action {
        DmAction::Threads => {
            let threads = dm.list_threads().await?;
            if threads.is_empty() {
                say("No conversations.");
            }
            for thread in &threads {
                say(&thread_line(thread, ctx));
            }
        }
        DmAction::Open { username } => {
            let thread = dm.open_thread(&username).await?;
            say(&thread_line(&thread, ctx));
        }
        DmAction::Read { thread } => {
            for post in dm.load_conversation(thread).await? {
                print_post(&post);
            }
        }
        DmAction::Send {
            thread,
            text,
            files,
        } => print_post(&dm.send_post(thread, &text, &files).await?),
        DmAction::Edit { post, text } => print_post(&dm.edit_post(post, &text).await?),
        DmAction::DeletePost { post } => {
            dm.delete_post(post).await?;
            say("Deleted.");
        }
        DmAction::DeleteThread { thread } => {
            dm.delete_thread(thread).await?;
            say("Conversation deleted.");
        }
    }
    Ok(())
}
