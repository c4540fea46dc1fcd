use std::sync::Arc;

use color_eyre::eyre::{Result, eyre};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use study_master::ai::GameMasterAI;
use study_master::app::{App, HELP};
use study_master::logging;
use study_master::save::SaveManager;
use study_master::session::GameSession;
use study_master::settings::{Settings, data_dir, default_settings_path};

async fn print_lines(stdout: &mut tokio::io::Stdout, lines: &[String]) -> Result<()> {
    for line in lines {
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings_path = default_settings_path();
    let settings = Settings::load_settings_from_file(&settings_path).unwrap_or_default();

    logging::init(&data_dir(), settings.debug_mode)
        .map_err(|e| eyre!("Failed to initialize logger: {e}"))?;
    log::info!("Starting study_master");

    let ai = GameMasterAI::from_settings(&settings);
    match settings.api_key() {
        Some(api_key) if !Settings::validate_api_key(&api_key).await => {
            log::warn!("The configured OpenAI API key could not be validated");
        }
        Some(_) => log::info!("OpenAI API key validated"),
        None => log::warn!(
            "Running without an API key; set one in {}",
            settings_path.display()
        ),
    }

    let session = GameSession::new(Arc::new(ai), settings, SaveManager::default());
    let mut app = App::new(session).with_settings_path(settings_path);
    let mut summaries = app
        .session_mut()
        .take_summary_receiver()
        .ok_or_else(|| eyre!("Summary channel already taken"))?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_lines(&mut stdout, &[HELP.to_string()]).await?;

    while app.is_running() {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let output = app.handle_line(&line).await;
                print_lines(&mut stdout, &output).await?;
            }
            Some(update) = summaries.recv() => {
                app.handle_summary(update);
            }
        }
    }

    log::info!("Shutting down");
    Ok(())
}
