//! Terminal rendering of transcript messages and product cards.

use console::style;

use malim_types::catalog::ProductCard;
use malim_types::chat::{ChatMessage, ChatMode, MessageRole};

use crate::cli::catalog::format_price;

/// Longest description shown on a card before it is cut.
const CARD_DESCRIPTION_CHARS: usize = 80;

pub fn print_banner() {
    println!();
    println!(
        "  {} {}",
        style("✿").magenta().bold(),
        style("Malim · asesora de estilo").bold()
    );
    println!(
        "  {}",
        style("Type /help for commands, /quit to leave.").dim()
    );
    println!();
}

/// Print `messages[from..]` and return the new high-water mark.
///
/// User messages are skipped; the shopper already sees what they typed.
pub fn print_new(messages: &[ChatMessage], from: usize) -> usize {
    for message in messages.iter().skip(from) {
        print_message(message);
    }
    messages.len()
}

pub fn print_message(message: &ChatMessage) {
    match message.role {
        MessageRole::User => {}
        MessageRole::System => {
            println!("  {}", style(&message.content).red());
            println!();
        }
        MessageRole::Assistant => {
            let label = match message.mode {
                Some(ChatMode::Recommendation) => style("Mia ✨").magenta().bold(),
                Some(ChatMode::AuthRequired) => style("Mia 🔒").magenta().bold(),
                _ => style("Mia").magenta().bold(),
            };
            println!("  {label}");
            for line in message.content.lines() {
                println!("  {line}");
            }
            println!();
            for card in &message.products {
                print_card(card);
            }
            if !message.products.is_empty() {
                println!();
            }
        }
    }
}

fn print_card(card: &ProductCard) {
    let price = if card.offer > 0.0 {
        format!(
            "{} {} -{}%",
            style(format_price(card.final_price)).green().bold(),
            style(format_price(card.price)).dim(),
            card.offer
        )
    } else {
        style(format_price(card.price)).bold().to_string()
    };

    println!(
        "  {} {}  {}",
        style("▸").cyan(),
        style(&card.name).cyan().bold(),
        price
    );
    let mut details = vec![card.category.clone()];
    if !card.colors.is_empty() {
        details.push(card.colors.join(", "));
    }
    details.push(card.sku.clone());
    println!("    {}", style(details.join(" · ")).dim());
    if !card.description.is_empty() {
        println!("    {}", truncate(&card.description, CARD_DESCRIPTION_CHARS));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
