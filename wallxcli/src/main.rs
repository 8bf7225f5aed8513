use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use wallxcli::WallxCliApp;

#[derive(Parser)]
#[command(name = "wallxcli")]
#[command(about = "wallx - browse, search and collect wallpapers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List random wallpapers
    Random {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Search wallpapers
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },
    /// List the first page of a category
    Category { id: String },
    /// Show one wallpaper
    Show { id: String },
    /// List the category catalog
    Categories,
    /// Turn a prompt into a wallpaper
    Generate { prompt: String },
    /// Show the theme, or flip it
    Theme {
        #[arg(value_parser = ["toggle"])]
        action: Option<String>,
    },
    /// Sign in with email and password
    Login { email: String },
    /// Create an account
    Signup { email: String },
    /// Sign out
    Logout,
    /// Send a password reset email
    Reset { email: String },
    /// Show the signed-in user
    Whoami,
    /// Interactive browser (default)
    Browse,
}

fn init_logging() {
    let mut rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_owned()
        } else {
            "info".to_owned()
        }
    });
    for loud_crate in ["attohttpc", "rustls"] {
        if !rust_log.contains(&format!("{loud_crate}=")) {
            rust_log += &format!(",{loud_crate}=warn");
        }
    }

    std::env::set_var("RUST_LOG", rust_log);
    env_logger::init(); // Log to stderr
}

fn read_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut password = String::new();
    io::stdin().read_line(&mut password).context("Failed to read password")?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut app = WallxCliApp::new()?;

    match cli.command.unwrap_or(Command::Browse) {
        Command::Random { count } => app.random(count),
        Command::Search { query, page, per_page } => app.search(&query, page, per_page),
        Command::Category { id } => app.category(&id),
        Command::Show { id } => app.show(&id),
        Command::Categories => app.categories()?,
        Command::Generate { prompt } => app.generate(&prompt),
        Command::Theme { action } => app.theme(action.is_some()),
        Command::Login { email } => {
            let password = read_password()?;
            app.login(&email, &password)?
        }
        Command::Signup { email } => {
            let password = read_password()?;
            app.signup(&email, &password)?
        }
        Command::Logout => app.logout()?,
        Command::Reset { email } => app.reset(&email)?,
        Command::Whoami => app.whoami(),
        Command::Browse => {
            println!("wallx started successfully!");
            app.browse()?
        }
    }

    Ok(())
}
