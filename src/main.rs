use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cirrus::config::AppConfig;
use cirrus::db::duckdb_service::{self, city_service};
use cirrus::db::entities::user::Theme;
use cirrus::llm::{GeminiBackend, ImageGenerator, LlmClient};
use cirrus::services::auth_service::AuthManager;
use cirrus::services::theme_service::ThemeManager;
use cirrus::weather::WeatherClient;

#[derive(Parser, Debug)]
#[command(author, version, about = "City weather tracker core", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        username: String,
        password: String,
        /// Preferred color scheme: light, dark, or default
        #[arg(long, default_value = "default")]
        theme: String,
    },
    /// Log in and persist the session
    Login { username: String, password: String },
    /// Clear the persisted session
    Logout,
    /// Show the current session user
    Whoami,
    /// Set a new password for an account
    ResetPassword {
        username: String,
        new_password: String,
    },
    /// Update the session user's profile
    Profile { name: String, bio: String },
    /// Manage the session user's tracked cities
    City {
        #[command(subcommand)]
        action: CityCommand,
    },
    /// Manage the session user's generated theme
    Theme {
        #[command(subcommand)]
        action: ThemeCommand,
    },
    /// Weather questions and answers for a city
    Ask {
        /// Free-text city query, e.g. "Chicago,US"
        query: String,
        /// Ask a specific question instead of generating suggestions
        #[arg(long)]
        question: Option<String>,
    },
    /// Generate a city scene image reflecting current weather
    Image {
        /// Free-text city query, e.g. "Chicago,US"
        query: String,
        /// Time of day to depict
        #[arg(long, default_value = "daytime")]
        time_of_day: String,
        /// Output file for the image bytes
        #[arg(short, long, default_value = "city.png")]
        output: String,
    },
}

#[derive(Subcommand, Debug)]
enum CityCommand {
    /// Resolve a free-text query and track the best match
    Add { query: String },
    /// Stop tracking a city by name
    Remove { name: String },
    /// List tracked cities in the order they were added
    List,
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    /// Generate a theme from a description and store it
    Generate { description: String },
    /// Print the active theme spec
    Show,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "cirrus.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stderr so CLI output stays clean
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    init_logging();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let pool = duckdb_service::open_pool(&config.database_path)?;
    let auth = Arc::new(AuthManager::load(pool.clone()).await?);
    let themes = ThemeManager::new(auth.clone());

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let backend = Arc::new(GeminiBackend::new(&config.gemini_model, timeout)?);
    let llm = LlmClient::new(
        backend,
        config.gemini_api_key_primary.clone(),
        config.gemini_api_key_backup.clone(),
    );

    match args.command {
        Command::Register {
            username,
            password,
            theme,
        } => {
            let theme = Theme::parse(&theme.to_uppercase());
            if auth.register(&username, &password, theme).await? {
                println!("Registered {username}.");
            } else {
                println!("Registration failed: username taken or input blank.");
            }
        }
        Command::Login { username, password } => {
            if auth.login(&username, &password).await? {
                println!("Logged in as {username}.");
            } else {
                println!("Login failed.");
            }
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out.");
        }
        Command::Whoami => match auth.current_user().await {
            Some(user) => {
                println!("{} (id {})", user.username, user.id);
                if let Some(name) = &user.name {
                    println!("name: {name}");
                }
                if let Some(bio) = &user.bio {
                    println!("bio: {bio}");
                }
            }
            None => println!("Not logged in."),
        },
        Command::ResetPassword {
            username,
            new_password,
        } => {
            if auth.reset_password(&username, &new_password).await? {
                println!("Password updated for {username}.");
            } else {
                println!("Password reset failed: unknown user or blank password.");
            }
        }
        Command::Profile { name, bio } => {
            if auth.update_profile(&name, &bio).await? {
                println!("Profile updated.");
            } else {
                println!("Log in before updating the profile.");
            }
        }
        Command::City { action } => {
            let Some(user) = auth.current_user().await else {
                println!("Log in before managing cities.");
                return Ok(());
            };
            let weather = WeatherClient::new(&config.weather_api_key, timeout)?;

            match action {
                CityCommand::Add { query } => {
                    let candidates = weather.search_city(&query).await?;
                    let Some(candidate) = candidates.into_iter().next() else {
                        println!("No city matched \"{query}\".");
                        return Ok(());
                    };
                    let city = city_service::upsert_city(
                        pool.clone(),
                        candidate.name.clone(),
                        candidate.lat,
                        candidate.lon,
                        candidate.country.clone(),
                        candidate.state.clone(),
                    )
                    .await?;
                    city_service::add_city_to_user(pool.clone(), user.username.clone(), city.id)
                        .await?;
                    println!(
                        "Tracking {}, {} ({:.4}, {:.4}).",
                        city.name, city.country, city.latitude, city.longitude
                    );
                }
                CityCommand::Remove { name } => {
                    let cities =
                        city_service::get_user_cities(pool.clone(), user.username.clone()).await?;
                    match cities
                        .into_iter()
                        .find(|c| c.name.eq_ignore_ascii_case(&name))
                    {
                        Some(city) => {
                            city_service::remove_city_from_user(
                                pool.clone(),
                                user.username.clone(),
                                city.id,
                            )
                            .await?;
                            println!("Removed {}.", city.name);
                        }
                        None => println!("\"{name}\" is not a tracked city."),
                    }
                }
                CityCommand::List => {
                    let cities =
                        city_service::get_user_cities(pool.clone(), user.username.clone()).await?;
                    if cities.is_empty() {
                        println!("No tracked cities.");
                    }
                    for city in cities {
                        let state = city.state.as_deref().unwrap_or("-");
                        println!(
                            "{:>4}  {}, {} ({})  {:.4}, {:.4}",
                            city.id, city.name, city.country, state, city.latitude, city.longitude
                        );
                    }
                }
            }
        }
        Command::Theme { action } => {
            let Some(user) = auth.current_user().await else {
                println!("Log in before managing themes.");
                return Ok(());
            };

            match action {
                ThemeCommand::Generate { description } => {
                    let spec = llm.generate_theme_spec(&description).await;
                    themes.save_for_user(&user.username, &spec).await?;
                    println!("{}", spec.to_json());
                }
                ThemeCommand::Show => {
                    let spec = themes.load_for_user(&user.username).await;
                    println!("{}", spec.to_json());
                }
            }
        }
        Command::Ask { query, question } => {
            let weather = WeatherClient::new(&config.weather_api_key, timeout)?;
            let candidates = weather.search_city(&query).await?;
            let Some(candidate) = candidates.into_iter().next() else {
                println!("No city matched \"{query}\".");
                return Ok(());
            };
            let conditions = weather
                .current_conditions(candidate.lat, candidate.lon)
                .await?;
            let summary = conditions.summary();
            println!("{}, {}: {summary}", candidate.name, candidate.country);

            match question {
                Some(question) => {
                    let answer = llm.generate_answer(&summary, &question).await;
                    println!("{answer}");
                }
                None => {
                    for question in llm.generate_questions(&summary).await {
                        println!("- {question}");
                    }
                }
            }
        }
        Command::Image {
            query,
            time_of_day,
            output,
        } => {
            let weather = WeatherClient::new(&config.weather_api_key, timeout)?;
            let candidates = weather.search_city(&query).await?;
            let Some(candidate) = candidates.into_iter().next() else {
                println!("No city matched \"{query}\".");
                return Ok(());
            };
            let conditions = weather
                .current_conditions(candidate.lat, candidate.lon)
                .await?;

            let generator = ImageGenerator::new(
                &config.gemini_image_model,
                &config.gemini_api_key_primary,
                timeout,
            )?;
            let bytes = generator
                .generate_city_image(
                    &candidate.name,
                    candidate.state.as_deref().unwrap_or(""),
                    &candidate.country,
                    &conditions.summary(),
                    &time_of_day,
                )
                .await?;
            std::fs::write(&output, &bytes)?;
            println!("Wrote {} bytes to {output}.", bytes.len());
        }
    }

    Ok(())
}
