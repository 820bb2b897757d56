use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Confirm, Input};

use crate::client::cleanup::CleanupHandler;
use crate::client::http::HttpTransport;
use crate::client::submitter::Submitter;
use crate::client::Transport;
use crate::config::{self, Config};
use crate::core::controller::{Controller, StateKind, UploadMethod};
use crate::core::filename;
use crate::core::view::ResultView;
use crate::models::UploadDraft;

#[derive(Parser)]
#[command(name = "genrescope", about = "Music genre classification client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch the desktop app
    #[arg(long)]
    pub gui: bool,

    /// Classification service URL (overrides the config file)
    #[arg(long, global = true, env = "GENRESCOPE_SERVER")]
    pub server: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload an audio file (.mp3, .wav, .ogg) and show its genres
    Upload {
        file: PathBuf,
        /// Defaults to the title guessed from the file name
        #[arg(long = "song-name")]
        song_name: Option<String>,
        /// Defaults to the artist guessed from the file name
        #[arg(long)]
        artist: Option<String>,
        /// Delete the file from the server after showing the result
        #[arg(long)]
        delete_after: bool,
    },
    /// Submit a YouTube link and show its genres
    Link {
        url: String,
        #[arg(long = "song-name")]
        song_name: String,
        #[arg(long)]
        artist: String,
        /// Delete the file from the server after showing the result
        #[arg(long)]
        delete_after: bool,
    },
    /// Download a previously uploaded file
    Download {
        filename: String,
        /// Destination path (defaults to the filename in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a previously uploaded file from the server
    Delete { filename: String },
    /// Check that the classification service is running
    Health,
    /// Edit the configuration file
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::load_config();
    if let Some(server) = cli.server {
        cfg.server.base_url = server;
    }

    match cli.command {
        Some(Commands::Upload {
            file,
            song_name,
            artist,
            delete_after,
        }) => {
            let mut song_name = song_name.unwrap_or_default();
            let mut artist = artist.unwrap_or_default();
            filename::fill_missing(&mut song_name, &mut artist, filename::guess_from_path(&file));
            cmd_classify(
                &cfg,
                UploadMethod::File,
                UploadDraft::with_file(file, &song_name, &artist),
                delete_after,
            )
        }
        Some(Commands::Link {
            url,
            song_name,
            artist,
            delete_after,
        }) => cmd_classify(
            &cfg,
            UploadMethod::Link,
            UploadDraft::with_link(&url, &song_name, &artist),
            delete_after,
        ),
        Some(Commands::Download { filename, output }) => cmd_download(&cfg, &filename, output),
        Some(Commands::Delete { filename }) => cmd_delete(&cfg, &filename),
        Some(Commands::Health) => cmd_health(&cfg),
        Some(Commands::Config) => cmd_config(cfg),
        None => {
            if cli.gui {
                #[cfg(feature = "gui")]
                {
                    crate::gui::launch(cfg)
                }
                #[cfg(not(feature = "gui"))]
                {
                    anyhow::bail!(
                        "GUI support is not enabled. Rebuild with: cargo build --features gui"
                    );
                }
            } else {
                println!("Usage: genrescope <COMMAND> or genrescope --gui");
                println!("Run genrescope --help for more information.");
                Ok(())
            }
        }
    }
}

fn transport(cfg: &Config) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(HttpTransport::new(&cfg.server)?))
}

fn cmd_classify(
    cfg: &Config,
    method: UploadMethod,
    draft: UploadDraft,
    delete_after: bool,
) -> Result<()> {
    let transport = transport(cfg)?;
    let submitter = Submitter::new(transport.clone(), cfg.link.policy());
    let mut controller = Controller::new(cfg.pacing.pacing());

    controller.choose(method);
    let request = submitter.prepare(&draft)?;
    let ticket = controller
        .begin_upload()
        .context("no upload form is active")?;

    println!("Processing your upload...");
    match submitter.send(&request) {
        Ok(result) => {
            controller.upload_succeeded(ticket, result, Instant::now());
        }
        Err(e) => {
            controller.upload_failed(ticket, e.user_message());
            anyhow::bail!("{}", controller.error().unwrap_or_default());
        }
    }
    announce(controller.kind());

    // 커버 이미지를 미리 받아본다. 실패해도 결과 표시는 계속한다.
    let cover_ok = controller
        .result()
        .map(|r| r.cover_image_url.clone())
        .filter(|url| !url.is_empty())
        .map(|url| transport.fetch_url(&url).is_ok());
    controller.mark_prepared(ticket);

    let mut last = controller.kind();
    while last != StateKind::Results {
        let wait = controller
            .next_wakeup(Instant::now())
            .context("upload session stalled")?;
        std::thread::sleep(wait);
        controller.tick(Instant::now());
        if controller.kind() != last {
            last = controller.kind();
            announce(last);
        }
    }

    if let Some(result) = controller.result() {
        print_result(&ResultView::new(result, transport.base_url()), cover_ok);
    }

    if delete_after {
        CleanupHandler::new(transport).reset(&mut controller);
        match controller.error() {
            Some(message) => eprintln!("{}", message),
            None => println!("Uploaded file removed from the server."),
        }
    }
    Ok(())
}

fn announce(kind: StateKind) {
    match kind {
        StateKind::Uploaded => println!("Uploaded Successfully!"),
        StateKind::Analyzing => println!("Analyzing your music..."),
        _ => {}
    }
}

fn print_result(view: &ResultView, cover_ok: Option<bool>) {
    println!();
    println!("{}", view.title);
    println!("{}", view.byline);

    match (&view.cover_url, cover_ok) {
        (Some(url), Some(true)) => println!("Cover: {}", url),
        (Some(url), _) => println!("Cover: {} (unavailable)", url),
        (None, _) => println!("Cover: none"),
    }

    if !view.genres.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["#", "Predicted Genre", "Confidence", ""]);
        for row in &view.genres {
            let bar = "█".repeat((row.fraction * 20.0).round() as usize);
            table.add_row(vec![
                Cell::new(row.rank),
                Cell::new(&row.name),
                Cell::new(crate::core::view::format_percent(row.confidence)),
                Cell::new(bar),
            ]);
        }
        println!("{table}");
    }

    match &view.audio_url {
        Some(url) => println!("Audio: {}", url),
        None => println!("Audio: not available"),
    }
}

fn cmd_download(cfg: &Config, filename: &str, output: Option<PathBuf>) -> Result<()> {
    let transport = transport(cfg)?;
    let data = transport
        .fetch_audio(filename)
        .with_context(|| format!("{}를 다운로드할 수 없습니다", filename))?;
    let dest = output.unwrap_or_else(|| PathBuf::from(filename));
    write_file(&dest, &data)?;
    println!("Saved {} bytes to {}", data.len(), dest.display());
    Ok(())
}

fn write_file(dest: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, data).with_context(|| format!("{}에 쓸 수 없습니다", dest.display()))
}

fn cmd_delete(cfg: &Config, filename: &str) -> Result<()> {
    let cleanup = CleanupHandler::new(transport(cfg)?);
    match cleanup.delete(filename) {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", crate::client::cleanup::user_message(&e)),
    }
}

fn cmd_health(cfg: &Config) -> Result<()> {
    let transport = transport(cfg)?;
    let status = transport
        .health()
        .with_context(|| format!("{} is not responding", transport.base_url()))?;
    println!("{}: {}", transport.base_url(), status);
    Ok(())
}

fn cmd_config(mut cfg: Config) -> Result<()> {
    println!("Classification service settings\n");

    cfg.server.base_url = Input::new()
        .with_prompt("Server URL")
        .with_initial_text(cfg.server.base_url.clone())
        .interact_text()?;

    cfg.server.timeout_secs = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(cfg.server.timeout_secs)
        .interact_text()?;

    cfg.pacing.uploaded_ms = Input::new()
        .with_prompt("Minimum time on \"uploaded\" (ms)")
        .default(cfg.pacing.uploaded_ms)
        .interact_text()?;

    cfg.pacing.analyzing_ms = Input::new()
        .with_prompt("Minimum time on \"analyzing\" (ms)")
        .default(cfg.pacing.analyzing_ms)
        .interact_text()?;

    cfg.link.youtube_only = Confirm::new()
        .with_prompt("Only accept YouTube links?")
        .default(cfg.link.youtube_only)
        .interact()?;

    config::save_config(&cfg)?;
    println!("\nSettings saved!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_command() {
        let cli = Cli::try_parse_from([
            "genrescope",
            "upload",
            "song.mp3",
            "--song-name",
            "Test",
            "--artist",
            "Tester",
            "--server",
            "http://localhost:5001",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://localhost:5001"));
        match cli.command {
            Some(Commands::Upload {
                file,
                song_name,
                artist,
                delete_after,
            }) => {
                assert_eq!(file, PathBuf::from("song.mp3"));
                assert_eq!(song_name.as_deref(), Some("Test"));
                assert_eq!(artist.as_deref(), Some("Tester"));
                assert!(!delete_after);
            }
            _ => panic!("expected upload command"),
        }
    }

    #[test]
    fn test_link_requires_metadata() {
        assert!(Cli::try_parse_from(["genrescope", "link", "https://youtu.be/abc"]).is_err());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a").join("b.mp3");
        write_file(&dest, b"data").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");
    }
}
