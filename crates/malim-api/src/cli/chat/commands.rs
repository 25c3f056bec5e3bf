//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Exit,
    /// Start over with just the greeting.
    New,
    Login,
    Logout,
    /// Set the name, WhatsApp and email sent along with requests.
    Profile,
    /// Attach an image file, with an optional caption.
    Image { path: String, caption: String },
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/ayuda" | "/?" => ChatCommand::Help,
        "/exit" | "/quit" | "/salir" | "/q" => ChatCommand::Exit,
        "/new" | "/nueva" => ChatCommand::New,
        "/login" => ChatCommand::Login,
        "/logout" => ChatCommand::Logout,
        "/profile" | "/perfil" => ChatCommand::Profile,
        "/image" | "/imagen" | "/img" => match arg.split_once(char::is_whitespace) {
            _ if arg.is_empty() => ChatCommand::Unknown(format!("{cmd} requires a file path")),
            Some((path, caption)) => ChatCommand::Image {
                path: path.to_string(),
                caption: caption.trim().to_string(),
            },
            None => ChatCommand::Image {
                path: arg.to_string(),
                caption: String::new(),
            },
        },
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    let rows = [
        ("/help", "Show this help message"),
        ("/new", "Start a new conversation"),
        ("/imagen <path> [text]", "Send an image, optionally with a message"),
        ("/perfil", "Set your name, WhatsApp and email"),
        ("/login", "Sign in with email and password"),
        ("/logout", "Sign out and start over"),
        ("/quit", "End the chat"),
    ];
    for (command, description) in rows {
        println!("  {:<24} {}", style(command).cyan(), description);
    }
    println!();
}
