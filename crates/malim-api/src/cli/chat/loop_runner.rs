//! The chat loop: input, slash commands, turns and sign-in.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};
use secrecy::{ExposeSecret, SecretString};

use malim_core::chat::TurnOutcome;
use malim_core::chat::attachment;
use malim_types::chat::{ImageAttachment, UserProfile};
use malim_types::error::AuthError;

use super::commands::{self, ChatCommand};
use super::renderer;
use crate::cli::catalog::spinner;
use crate::state::{AppState, ConcreteChatSession, ConcreteProductCache};

/// Run an interactive conversation until `/quit` or end of input.
///
/// The catalog stays subscribed for the whole conversation so that product
/// cards resolve against the live collection.
pub async fn run_chat_loop(state: &AppState) -> Result<()> {
    let mut session = state.chat_session()?;
    let mut cache = state.product_cache()?;
    cache.initialize().await;

    renderer::print_banner();
    let mut shown = renderer::print_new(session.messages(), 0);

    loop {
        if session.auth_prompt_visible() {
            prompt_login(&mut session, &mut cache).await;
            shown = renderer::print_new(session.messages(), shown);
        }

        let line: String = match Input::new()
            .with_prompt(style("Tú").bold().to_string())
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            // Ctrl-D or a closed terminal ends the chat.
            Err(_) => break,
        };
        cache.sync_pending().await;

        match commands::parse(&line) {
            Some(ChatCommand::Help) => commands::print_help(),
            Some(ChatCommand::Exit) => break,
            Some(ChatCommand::New) => {
                session.new_conversation();
                println!();
                shown = renderer::print_new(session.messages(), 0);
            }
            Some(ChatCommand::Login) => {
                login(&mut session, &mut cache).await;
                shown = renderer::print_new(session.messages(), shown);
            }
            Some(ChatCommand::Logout) => {
                session.logout();
                println!("  {} Sesión cerrada", style("✓").green().bold());
                println!();
                shown = renderer::print_new(session.messages(), 0);
            }
            Some(ChatCommand::Profile) => {
                if let Err(err) = edit_profile(&mut session) {
                    println!("  {} {err}", style("✗").red().bold());
                }
            }
            Some(ChatCommand::Image { path, caption }) => match read_image(Path::new(&path)).await {
                Ok(image) => {
                    submit(&mut session, &mut cache, &caption, Some(image)).await;
                    shown = renderer::print_new(session.messages(), shown);
                }
                Err(err) => println!("  {} {err:#}", style("✗").red().bold()),
            },
            Some(ChatCommand::Unknown(cmd)) => {
                println!(
                    "  {} Unknown command {}. Type {} for the list.",
                    style("?").yellow().bold(),
                    style(cmd).yellow(),
                    style("/help").cyan()
                );
            }
            None => {
                submit(&mut session, &mut cache, &line, None).await;
                shown = renderer::print_new(session.messages(), shown);
            }
        }
    }

    cache.unsubscribe();
    println!();
    println!("  {}", style("¡Hasta pronto! 💝").magenta());
    println!();
    Ok(())
}

async fn submit(
    session: &mut ConcreteChatSession,
    cache: &mut ConcreteProductCache,
    text: &str,
    image: Option<ImageAttachment>,
) {
    println!();
    let spinner = spinner("Mia está escribiendo...");
    let result = session.submit(text, image, cache).await;
    spinner.finish_and_clear();

    match result {
        Ok(TurnOutcome::AuthAlreadyRequested) => {
            println!(
                "  {}",
                style("Tu mensaje se enviará en cuanto inicies sesión (/login).").dim()
            );
            println!();
        }
        Ok(outcome) => tracing::debug!(?outcome, "turn finished"),
        Err(err) => println!("  {} {err}", style("✗").red().bold()),
    }
}

/// Ask whether to sign in now; declining hides the prompt but keeps the
/// pending message for a later `/login`.
async fn prompt_login(session: &mut ConcreteChatSession, cache: &mut ConcreteProductCache) {
    let proceed = Confirm::new()
        .with_prompt("¿Iniciar sesión ahora?")
        .default(true)
        .interact()
        .unwrap_or(false);

    if proceed {
        login(session, cache).await;
    } else {
        session.dismiss_auth_prompt();
        println!(
            "  {}",
            style("Puedes iniciar sesión más tarde con /login.").dim()
        );
        println!();
    }
}

async fn login(session: &mut ConcreteChatSession, cache: &mut ConcreteProductCache) {
    let credentials = Input::<String>::new()
        .with_prompt("Email")
        .interact_text()
        .and_then(|email| {
            Password::new()
                .with_prompt("Contraseña")
                .interact()
                .map(|password| (email, SecretString::from(password)))
        });
    let (email, password) = match credentials {
        Ok(credentials) => credentials,
        Err(err) => {
            tracing::debug!(error = %err, "sign-in input aborted");
            session.dismiss_auth_prompt();
            return;
        }
    };

    let spinner = spinner("Iniciando sesión...");
    let result = session
        .sign_in(email.trim(), password.expose_secret(), cache)
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(replayed) => {
            println!();
            println!("  {} Sesión iniciada", style("✓").green().bold());
            if replayed.is_some() {
                println!("  {}", style("Enviando tu mensaje pendiente...").dim());
            }
            println!();
        }
        Err(AuthError::InvalidCredentials) => {
            println!(
                "  {} Correo o contraseña incorrectos",
                style("✗").red().bold()
            );
            println!();
        }
        Err(err) => {
            println!("  {} {err}", style("✗").red().bold());
            println!();
        }
    }
}

fn edit_profile(session: &mut ConcreteChatSession) -> Result<()> {
    let current = session.profile().cloned();

    let name: String = Input::new()
        .with_prompt("Nombre")
        .with_initial_text(current.as_ref().map(|p| p.name.clone()).unwrap_or_default())
        .interact_text()?;
    let whatsapp: String = Input::new()
        .with_prompt("WhatsApp")
        .with_initial_text(current.as_ref().map(|p| p.whatsapp.clone()).unwrap_or_default())
        .interact_text()?;
    let email: String = Input::new()
        .with_prompt("Email (opcional)")
        .with_initial_text(current.and_then(|p| p.email).unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    session.set_profile(UserProfile {
        name: name.trim().to_string(),
        whatsapp: whatsapp.trim().to_string(),
        email: Some(email.trim().to_string()).filter(|e| !e.is_empty()),
    });
    println!("  {} Perfil guardado", style("✓").green().bold());
    println!();
    Ok(())
}

/// Read an image file and encode it as an attachment.
async fn read_image(path: &Path) -> Result<ImageAttachment> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let mime = attachment::mime_for_extension(extension)
        .with_context(|| format!("unsupported image type '{}'", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(attachment::from_bytes(mime, &bytes)?)
}
