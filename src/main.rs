use std::fmt;

use clap::Parser;
use colored::Colorize;
use error_stack::fmt::{Charset, ColorMode};
use error_stack::{Report, ResultExt};

use crate::config::{AppConfig, OrganizeConfig};
use crate::dialoguer::{Choice, Dialoguer};
use crate::organizer::commands::OrganizeCommands;
use crate::organizer::Flow;
use crate::plex::account::PlexTv;

mod auth;
mod config;
mod dialoguer;
mod organizer;
mod plex;

#[derive(Debug)]
pub struct PlexOrganizeError;
impl fmt::Display for PlexOrganizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plex organize error")
    }
}
impl std::error::Error for PlexOrganizeError {}

pub type PlexOrganizeResult<T> = error_stack::Result<T, PlexOrganizeError>;

/// Sort, upgrade and analyze the playlists of your Plex Media Servers
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Plex playlist organizer")]
struct Cli {}

pub struct Suggestion(String);

impl Suggestion {
    pub fn set_report() {
        Report::set_charset(Charset::Utf8);
        Report::set_color_mode(ColorMode::Color);
        Report::install_debug_hook::<Self>(|Self(value), context| {
            context.push_body(format!("{}: {value}", "suggestion".yellow()))
        });
    }
}

async fn run() -> PlexOrganizeResult<()> {
    let _cli = Cli::parse();

    Suggestion::set_report();

    let config = OrganizeConfig::load()
        .change_context(PlexOrganizeError)
        .attach(Suggestion(format!(
            "Check the file set in {} or remove it to use the defaults",
            AppConfig::CONFIG_PATH_ENV
        )))?;
    match &config.source {
        Some(path) => log::debug!("Loaded config from {}", path.display()),
        None => log::debug!("No config file found, using defaults"),
    }
    log::debug!("Using client identifier {}", config.client_identifier);

    let tv = PlexTv::new(&config.client_identifier).change_context(PlexOrganizeError)?;
    Dialoguer::clear();
    let Some(account) = auth::login(&tv, &config.auth, &mut auth::DialoguerPrompt)
        .await
        .change_context(PlexOrganizeError)?
    else {
        return Ok(());
    };

    let resources = account
        .resources()
        .await
        .change_context(PlexOrganizeError)?;
    if resources.is_empty() {
        return Err(Report::new(PlexOrganizeError)
            .attach_printable(format!(
                "No Plex Media Servers found for {}",
                account.username
            ))
            .attach(Suggestion(
                "Make sure a server is claimed by this account and online".to_string(),
            )));
    }
    let names = resources
        .iter()
        .map(|resource| resource.name.clone())
        .collect::<Vec<_>>();
    let resource = match Dialoguer::question(
        "Select resource to connect to".to_string(),
        &names,
        false,
    )
    .change_context(PlexOrganizeError)?
    {
        Choice::Item(index) => &resources[index],
        Choice::None | Choice::Abort => return Ok(()),
    };

    let server = account
        .connect(resource)
        .await
        .change_context(PlexOrganizeError)
        .attach(Suggestion(
            "Check that the server is running and reachable from this machine".to_string(),
        ))?;
    println!("Connected to {}.", resource.name.clone().green());

    loop {
        Dialoguer::clear();
        let flow = OrganizeCommands::execute(&server, &config)
            .await
            .change_context(PlexOrganizeError)?;
        if flow == Flow::Aborted {
            break;
        }
        println!();
        let again = Dialoguer::select_yes_or_no(
            "Do you want to organize another playlist?".to_string(),
            true,
        )
        .change_context(PlexOrganizeError)?;
        if !again {
            break;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> PlexOrganizeResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    run().await
}
