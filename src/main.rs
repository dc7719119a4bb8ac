//! Apex game forecasting CLI
//!
//! Trains winner, spread and total-points models from stored results and
//! predicts upcoming games.

use clap::{Parser, Subcommand};
use apex::{Config, Result};

#[derive(Parser)]
#[command(name = "apex")]
#[command(about = "Game outcome, spread and total forecasting", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Show database and model status
    Status,
    /// Train all three models on completed games
    Train {
        /// First game date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<chrono::NaiveDate>,
        /// Last game date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<chrono::NaiveDate>,
        /// Train on the last N days instead (default from config)
        #[arg(long, conflicts_with = "start")]
        days: Option<i64>,
    },
    /// Predict a single matchup
    Predict {
        /// Home team name, abbreviation or alias
        home: String,
        /// Away team name, abbreviation or alias
        away: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict and store all scheduled games in the coming days
    Generate {
        /// Days ahead to look (default from config)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Record actual results for finished games
    Reconcile,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config, &config),
        Commands::Status => commands::status(&config),
        Commands::Train { start, end, days } => commands::train(&config, start, end, days),
        Commands::Predict { home, away, format } => {
            commands::predict(&config, &home, &away, format)
        }
        Commands::Generate { days } => commands::generate(&config, days),
        Commands::Reconcile => commands::reconcile(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use apex::data::Database;
    use apex::model::PredictorModel;
    use apex::predict::{ModelManager, PredictionGenerator};
    use apex::{ApexError, DateRange, PredictionKind};
    use chrono::{Local, NaiveDate};

    fn open_database(config: &Config) -> Result<Database> {
        if let Some(parent) = std::path::Path::new(&config.data.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Database::open(&config.data.database_path)
    }

    pub fn init(config_path: &str, config: &Config) -> Result<()> {
        config.save(config_path)?;
        println!("Wrote config to {}", config_path);

        open_database(config)?;
        std::fs::create_dir_all(&config.data.models_dir)?;
        println!(
            "Created database at {} and models directory {}",
            config.data.database_path, config.data.models_dir
        );

        println!("\nNext steps:");
        println!("  1. Load teams and game results into the database");
        println!("  2. Run 'apex train' to train the models");
        println!("  3. Run 'apex predict \"Team A\" \"Team B\"' to make predictions");

        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = open_database(config)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:         {}", config.data.database_path);
        println!("  Teams:        {}", stats.team_count);
        println!(
            "  Games:        {} ({} completed, {} scheduled)",
            stats.game_count, stats.completed_count, stats.scheduled_count
        );
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:        {} to {}", earliest, latest);
        }
        println!(
            "  Predictions:  {} ({} reconciled)",
            stats.prediction_count, stats.reconciled_count
        );

        let mut manager = ModelManager::new(db, config);
        manager.load_models();

        println!("\nModels ({})", config.data.models_dir);
        println!("───────────────────────────────");
        for model in manager.models() {
            let status = match model.state().metrics() {
                Some(metrics) => format!("ready, {}", metrics),
                None if model.is_ready() => "ready".to_string(),
                None => "not trained".to_string(),
            };
            println!("  {:<20} {}", model.name(), status);
        }

        Ok(())
    }

    pub fn train(
        config: &Config,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        days: Option<i64>,
    ) -> Result<()> {
        let range = match (start, end, days) {
            (None, None, days) => DateRange::trailing_days(
                Local::now().date_naive(),
                days.unwrap_or(config.training.lookback_days),
            ),
            (_, end, Some(days)) => {
                DateRange::trailing_days(end.unwrap_or_else(|| Local::now().date_naive()), days)
            }
            (start, end, None) => DateRange::new(start, end),
        };

        let db = open_database(config)?;
        let mut manager = ModelManager::new(db, config);

        println!("Training models on games {}", range);
        if !manager.train_all_models(range) {
            return Err(ApexError::Training {
                model: "all".to_string(),
                message: "no model could be trained, see log for details".to_string(),
            });
        }

        for model in manager.models() {
            match model.state().metrics() {
                Some(metrics) => println!("  {:<20} {}", model.name(), metrics),
                None => println!("  {:<20} failed", model.name()),
            }
        }
        println!("Models saved to {}", config.data.models_dir);

        Ok(())
    }

    pub fn predict(config: &Config, home: &str, away: &str, format: OutputFormat) -> Result<()> {
        let db = open_database(config)?;
        let home_team = db
            .find_team_by_name(home)?
            .ok_or_else(|| ApexError::UnknownTeam(home.to_string()))?;
        let away_team = db
            .find_team_by_name(away)?
            .ok_or_else(|| ApexError::UnknownTeam(away.to_string()))?;

        let mut manager = ModelManager::new(db, config);
        if manager.load_models() == 0 {
            log::warn!("No trained models found, predictions use neutral defaults");
        }

        let prediction = manager.predict_game(home_team.id, away_team.id);

        match format {
            OutputFormat::Table => {
                println!("{} vs {}", home_team.name, away_team.name);
                println!("───────────────────────────────");
                println!(
                    "  Home win:  {:>6.1}%   (confidence {:.2})",
                    prediction.home_win_probability * 100.0,
                    prediction.confidence_for(PredictionKind::Winner)
                );
                println!(
                    "  Spread:    {:>+6.1}    (confidence {:.2})",
                    prediction.predicted_spread,
                    prediction.confidence_for(PredictionKind::Spread)
                );
                println!(
                    "  Total:     {:>6.1}    (confidence {:.2})",
                    prediction.predicted_total,
                    prediction.confidence_for(PredictionKind::Total)
                );
                let winner = if prediction.predicted_winner() == home_team.id {
                    &home_team.name
                } else {
                    &away_team.name
                };
                println!("  Pick:      {}", winner);
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "home": home_team.name,
                    "away": away_team.name,
                    "prediction": prediction,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                println!("home,away,home_win_prob,spread,total,winner_conf,spread_conf,total_conf");
                println!(
                    "{},{},{:.3},{:.1},{:.1},{:.2},{:.2},{:.2}",
                    home_team.name,
                    away_team.name,
                    prediction.home_win_probability,
                    prediction.predicted_spread,
                    prediction.predicted_total,
                    prediction.confidence_for(PredictionKind::Winner),
                    prediction.confidence_for(PredictionKind::Spread),
                    prediction.confidence_for(PredictionKind::Total)
                );
            }
        }

        Ok(())
    }

    pub fn generate(config: &Config, days: Option<i64>) -> Result<()> {
        let db = open_database(config)?;
        let mut manager = ModelManager::new(db, config);
        if manager.load_models() == 0 {
            log::warn!("No trained models found, predictions use neutral defaults");
        }

        let days = days.unwrap_or(config.prediction.days_ahead);
        let generator = PredictionGenerator::new(&manager, config.reconcile.clone());
        let report = generator.generate_upcoming(Local::now().date_naive(), days)?;

        println!(
            "Predicted {} of {} scheduled games in the next {} days ({} failed)",
            report.stored, report.found, days, report.failed
        );
        Ok(())
    }

    pub fn reconcile(config: &Config) -> Result<()> {
        let db = open_database(config)?;
        let manager = ModelManager::new(db, config);
        let generator = PredictionGenerator::new(&manager, config.reconcile.clone());

        let report = generator.reconcile()?;
        println!("{}", report);
        Ok(())
    }
}
