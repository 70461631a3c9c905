//! Console host: stands in for the browser so the background service, a page
//! context and the popup/options flows can be driven from stdin.

use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    background::{BackgroundService, TabUpdate},
    classifier::BlockRule,
    config::BlockerConfig,
    game::{Board, Outcome},
    messaging::{TabId, TabRegistry},
    options::OptionsPage,
    overlay::{OverlayController, OverlaySurface},
    popup::Popup,
    store::{KeyValueStore, Preferences},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

const HOST_TAB: TabId = 1;

const HELP: &str = "commands:
  visit <url>       load a page in the tab
  play <1-9>        take a cell on the overlay board
  allow             whitelist the blocked domain
  toggle            flip blocking on/off
  duration <min>    set the block duration (1-60)
  status            print preferences and overlay state
  help              show this list
  quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Visit(String),
    Play(usize),
    Allow,
    Toggle,
    Duration(String),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "visit" | "open" => {
            if arg.is_empty() {
                bail!("visit needs a url");
            }
            Command::Visit(arg.to_string())
        }
        "play" => {
            let cell: usize = arg
                .parse()
                .with_context(|| format!("'{arg}' is not a cell number"))?;
            if !(1..=9).contains(&cell) {
                bail!("cells are numbered 1-9");
            }
            Command::Play(cell - 1)
        }
        "allow" => Command::Allow,
        "toggle" => Command::Toggle,
        "duration" => Command::Duration(arg.to_string()),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(anyhow!("unknown command '{other}'; try 'help'")),
    };
    Ok(Some(command))
}

/// Prints the overlay to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSurface;

impl OverlaySurface for ConsoleSurface {
    fn mount(&self, domain: &str, duration_minutes: u32) {
        println!("== XO Blocker: {domain} is blocked for {duration_minutes} min ==");
        println!("Play Tic-Tac-Toe until the timer ends");
    }

    fn render_timer(&self, text: &str) -> bool {
        print!("\r{text}    ");
        io::stdout().flush().is_ok()
    }

    fn render_board(&self, board: &Board, interactive: bool) {
        println!();
        for row in board.render_rows() {
            println!("  {row}");
        }
        if interactive {
            println!("your move (play 1-9)");
        }
    }

    fn show_outcome(&self, outcome: Outcome) {
        println!("{}", outcome.message());
    }

    fn navigate(&self, url: &str) {
        println!("\nnavigating to {url}");
    }

    fn unmount(&self) {}
}

pub async fn serve<S: KeyValueStore>(prefs: Preferences<S>, config: BlockerConfig) -> Result<()> {
    let tabs = TabRegistry::new();
    let service = BackgroundService::new(prefs.clone(), Arc::new(BlockRule::default()), tabs.clone());
    let (background, updates, service_task) = service.spawn();

    let surface = Arc::new(ConsoleSurface);
    let popup = Popup::new(background.clone());
    let options = OptionsPage::new(prefs.clone());
    let mut page: Option<OverlayController<S, ConsoleSurface>> = None;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            Command::Visit(url) => {
                // A navigation destroys the previous page context.
                if let Some(previous) = page.take() {
                    previous.teardown().await;
                }
                let controller = OverlayController::new(
                    prefs.clone(),
                    background.clone(),
                    Arc::clone(&surface),
                    &config,
                );
                tokio::spawn(controller.clone().run(tabs.attach(HOST_TAB)));
                page = Some(controller);
                updates
                    .send(TabUpdate::complete(HOST_TAB, url))
                    .map_err(|_| anyhow!("background service stopped"))?;
            }
            Command::Play(cell) => match &page {
                Some(controller) => {
                    if let Err(err) = controller.play(cell).await {
                        println!("{err}");
                    }
                }
                None => println!("no page loaded"),
            },
            Command::Allow => match &page {
                Some(controller) => match controller.request_whitelist().await {
                    Some(domain) => println!("{domain} will not be blocked on future visits"),
                    None => println!("nothing is blocked"),
                },
                None => println!("no page loaded"),
            },
            Command::Toggle => {
                let view = popup.toggle().await;
                println!("{}", view.status_text());
            }
            Command::Duration(input) => match options.save_duration(&input).await {
                Ok((minutes, status)) => println!("{status} ({minutes} min)"),
                Err(err) => println!("{err}"),
            },
            Command::Status => {
                let overlay = match &page {
                    Some(controller) => Some(controller.snapshot().await),
                    None => None,
                };
                let preferences = prefs.snapshot().await;
                let status = json!({
                    "preferences": preferences,
                    "overlay": overlay,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    if let Some(controller) = page.take() {
        controller.teardown().await;
    }
    tabs.detach(HOST_TAB);
    // The service runs until every message handle and the update feed are gone.
    drop(popup);
    drop(background);
    drop(updates);
    service_task
        .await
        .context("background service task failed")?;
    log_info!("host stopped");
    Ok(())
}
