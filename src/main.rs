//! Todo Board CLI
//!
//! Command-line shell over the task store and the auth helper. Every command
//! validates its input before anything is sent.

use anyhow::{Result, anyhow};
use clap::Parser;
use std::sync::Arc;
use todo_board::api::{HttpTaskService, TaskService};
use todo_board::auth::AuthClient;
use todo_board::cli::{Cli, Command};
use todo_board::config::ClientConfig;
use todo_board::error::StoreError;
use todo_board::format::{OutputFormat, format_task_markdown, format_tasks_markdown, state_to_json};
use todo_board::logging::{self, LogTarget};
use todo_board::session::{FileStore, Session};
use todo_board::store::{StoreOptions, TaskStore};
use todo_board::types::{SignInCredentials, SignUpCredentials, Task, TaskPatch};
use todo_board::validation::{self, TaskFormInput};
use tracing::debug;

fn print_task(task: &Task, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(task)?),
        OutputFormat::Markdown => print!("{}", format_task_markdown(task)),
    }
    Ok(())
}

fn print_store(store: &TaskStore, format: OutputFormat) -> Result<()> {
    let state = store.state();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state_to_json(&state))?),
        OutputFormat::Markdown => print!("{}", format_tasks_markdown(&state)),
    }
    Ok(())
}

/// Turn an auth failure from the backend into an actionable message.
fn explain(err: StoreError) -> anyhow::Error {
    if let Some(api) = err.api().filter(|api| api.is_unauthorized()) {
        return anyhow!(
            "{} (not signed in or session expired; run `todo-board sign-in`)",
            api.detail
        );
    }
    err.into()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = ClientConfig::resolve(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(path) = &cli.token_path {
        config.session.token_path = path.clone();
    }
    debug!(
        base_url = %config.api.base_url,
        token_path = %config.session.token_path.display(),
        "Configuration resolved"
    );

    let storage = Arc::new(FileStore::new(&config.session.token_path));
    let session = Arc::new(Session::open(storage)?);
    let format = OutputFormat::from(cli.format);

    let auth = AuthClient::new(&config.api, Arc::clone(&session))?;
    let service = Arc::new(HttpTaskService::new(&config.api, Arc::clone(&session))?);
    let store = TaskStore::with_options(
        Arc::clone(&service) as Arc<dyn TaskService>,
        StoreOptions::from(&config.store),
    );

    match cli.command {
        Command::SignIn(args) => {
            validation::validate_email(&args.email)?;
            let response = auth
                .sign_in(&SignInCredentials {
                    email: args.email.trim().to_string(),
                    password: args.password,
                })
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response.user)?),
                OutputFormat::Markdown => println!("Signed in as {}", response.user.email),
            }
        }
        Command::SignUp(args) => {
            validation::validate_email(&args.email)?;
            let confirmation = args
                .confirm_password
                .clone()
                .unwrap_or_else(|| args.password.clone());
            validation::validate_new_password(&args.password, &confirmation)?;
            let response = auth
                .sign_up(&SignUpCredentials {
                    email: args.email.trim().to_string(),
                    password: args.password,
                    name: args.name.filter(|n| !n.trim().is_empty()),
                })
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response.user)?),
                OutputFormat::Markdown => println!("Account created for {}", response.user.email),
            }
        }
        Command::SignOut => {
            auth.sign_out()?;
            println!("Signed out");
        }
        Command::Status => {
            let authenticated = auth.is_authenticated();
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "authenticated": authenticated,
                        "api_url": config.api.base_url,
                    })
                ),
                OutputFormat::Markdown if authenticated => {
                    println!("Signed in ({})", config.api.base_url)
                }
                OutputFormat::Markdown => println!("Not signed in ({})", config.api.base_url),
            }
        }
        Command::Health => {
            let health = service.health().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
                OutputFormat::Markdown => println!("{}: {}", config.api.base_url, health.status),
            }
        }
        Command::List(args) => {
            store
                .set_view(args.filter, args.search.unwrap_or_default())
                .await
                .map_err(explain)?;
            print_store(&store, format)?;
        }
        Command::Show { id } => {
            let task = service.get(&id).await?;
            print_task(&task, format)?;
        }
        Command::Add(args) => {
            let data = validation::task_form(&TaskFormInput {
                title: &args.title,
                description: args.description.as_deref(),
                due_date: None,
            })?;
            let task = store.create(&data).await.map_err(explain)?;
            print_task(&task, format)?;
        }
        Command::Edit(args) => {
            let patch = TaskPatch {
                title: args
                    .title
                    .as_deref()
                    .map(validation::validate_title)
                    .transpose()?,
                description: args
                    .description
                    .as_deref()
                    .map(validation::normalize_description)
                    .transpose()?,
            };
            if patch.is_empty() {
                return Err(anyhow!("nothing to change: pass --title and/or --description"));
            }
            // The full update is built from the local record.
            store.fetch_task(&args.id).await.map_err(explain)?;
            let task = store.update(&args.id, &patch).await.map_err(explain)?;
            print_task(&task, format)?;
        }
        Command::Delete { id } => {
            store.delete(&id).await.map_err(explain)?;
            println!("Deleted {}", id);
        }
        Command::Toggle { id } => {
            store.fetch_task(&id).await.map_err(explain)?;
            let completed = store.toggle_complete(&id).await.map_err(explain)?;
            match store.task(&id) {
                Some(task) => print_task(&task, format)?,
                None => println!("{} is now {}", id, if completed { "completed" } else { "active" }),
            }
        }
    }

    Ok(())
}
