//! `chat` and `ask`: course questions answered from the catalog.

use std::io::Write;
use std::path::Path;

use color_eyre::eyre::Result;
use coursewise_catalog::Catalog;
use coursewise_core::{ChatReply, ConversationHandler, OpenRouterClient, Session};
use coursewise_shared::{AppConfig, COL_COMPETENCY, COL_PROFICIENCY, COL_PROVIDER, CourseRecord};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::{LoginArgs, catalog_path, clip, login};

fn handler(config: &AppConfig, catalog: Option<&Path>) -> Result<ConversationHandler<OpenRouterClient>> {
    let path = catalog_path(config, catalog);
    let catalog = Catalog::load(&path)?;
    let client = OpenRouterClient::from_config(config)?;
    info!(
        courses = catalog.len(),
        model = client.model(),
        moderation = config.openrouter.moderation,
        "conversation ready"
    );
    Ok(ConversationHandler::new(client, catalog).with_moderation(config.openrouter.moderation))
}

pub(crate) async fn cmd_ask(
    config: &AppConfig,
    catalog: Option<&Path>,
    args: &LoginArgs,
    text: &str,
) -> Result<()> {
    let mut session = login(config, args)?;
    let handler = handler(config, catalog)?;

    let reply = handler.process_user_message(&mut session, text).await?;
    print_reply(&reply);
    Ok(())
}

pub(crate) async fn cmd_chat(config: &AppConfig, catalog: Option<&Path>, args: &LoginArgs) -> Result<()> {
    let mut session = login(config, args)?;
    let handler = handler(config, catalog)?;

    println!();
    println!("  Ask about our courses. /reset starts over, /quit exits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset_conversation();
                println!("  (new conversation)");
                continue;
            }
            _ => {}
        }

        // A failed turn is reported and the conversation goes on.
        match handler.process_user_message(&mut session, text).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => {
                warn!(error = %e, "turn failed");
                println!("  error: {e}");
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &ChatReply) {
    println!();
    println!("bot> {}", reply.reply);
    if !reply.courses.is_empty() {
        println!();
        println!("  Matched courses:");
        for course in &reply.courses {
            print_course(course);
        }
    }
    println!();
}

fn print_course(course: &CourseRecord) {
    println!(
        "    - {} [{}] {} / {}",
        clip(course.title(), 48),
        course.get(COL_COMPETENCY),
        course.get(COL_PROFICIENCY),
        course.get(COL_PROVIDER)
    );
    if !course.url().is_empty() {
        println!("      {}", course.url());
    }
}
