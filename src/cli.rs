use crate::admission::AdmissionController;
use crate::catalog::{CatalogSearch, InMemoryCatalog};
use crate::config::Config;
use crate::coordinator::{GenerationCoordinator, GenerationOutcome};
use crate::error::GenerationError;
use crate::orchestrator::ProviderOrchestrator;
use crate::providers::Provider;
use crate::types::{
    CarbUnit, CatalogEntry, DEFAULT_RECIPE_COUNT, DEFAULT_SERVINGS, GeneratedRecipe,
    GenerationMode, GenerationRequest, Language, SearchPreferences, Tier,
};
use crate::{log_debug, log_error};

use anyhow::{Context, Result, anyhow};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand, crate_version};
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOG_FILE: &str = "kitchen-helper-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "kitchen-helper: recipes from the ingredients you have",
    long_about = "kitchen-helper looks up a curated recipe catalog first and generates new recipes with a hosted or local model when nothing fits.",
    disable_version_flag = true,
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log debug messages to a file
    #[arg(short = 'l', long = "log", global = true, help = "Log debug messages to a file")]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(long = "log-file", global = true, help = "Specify a custom log file path")]
    pub log_file: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(long = "config", global = true, help = "Path to a config.toml")]
    pub config: Option<PathBuf>,

    /// Display the version
    #[arg(short = 'v', long = "version", global = true, help = "Display the version")]
    pub version: bool,
}

/// Fields of a recipe request
#[derive(Args, Clone, Debug)]
pub struct RequestArgs {
    /// Available ingredients, comma separated or repeated
    #[arg(required = true, value_delimiter = ',')]
    pub ingredients: Vec<String>,

    #[arg(short, long, default_value_t = DEFAULT_SERVINGS, help = "Number of servings (1-10)")]
    pub servings: u8,

    #[arg(
        short = 'n',
        long = "count",
        default_value_t = DEFAULT_RECIPE_COUNT,
        help = "Number of recipes to generate (1-5)"
    )]
    pub count: u8,

    #[arg(
        short,
        long = "diet",
        value_delimiter = ',',
        help = "Diet tags such as vegan, low-carb, diabetic"
    )]
    pub diet: Vec<String>,

    #[arg(long, default_value = "KE", help = "Carbohydrate unit: KE or BE")]
    pub unit: CarbUnit,

    #[arg(long, default_value = "en", help = "Output language: en or de")]
    pub language: Language,

    #[arg(short, long, default_value = "free", help = "Subscription tier of the caller")]
    pub tier: Tier,
}

impl RequestArgs {
    fn build(&self, mode: GenerationMode) -> Result<GenerationRequest, GenerationError> {
        GenerationRequest::builder(self.ingredients.iter().cloned())
            .servings(self.servings)
            .recipe_count(self.count)
            .diet_tags(self.diet.iter().cloned())
            .carb_unit(self.unit)
            .language(self.language)
            .tier(self.tier)
            .mode(mode)
            .build()
    }
}

/// Catalog filters
#[derive(Args, Clone, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PreferenceArgs {
    #[arg(long, help = "Only vegetarian catalog recipes")]
    pub vegetarian: bool,
    #[arg(long, help = "Only vegan catalog recipes")]
    pub vegan: bool,
    #[arg(long, help = "Only gluten-free catalog recipes")]
    pub gluten_free: bool,
    #[arg(long, help = "Only low-carb catalog recipes")]
    pub low_carb: bool,
    #[arg(long, help = "Only low-glycemic catalog recipes")]
    pub low_gi: bool,
    #[arg(long, help = "Only diabetic-friendly catalog recipes")]
    pub diabetic_friendly: bool,
    #[arg(long, help = "Only quick catalog recipes")]
    pub quick: bool,
    #[arg(long, help = "Maximum carbohydrate grams per serving")]
    pub max_carbs: Option<f64>,
    #[arg(long, help = "Maximum glycemic index")]
    pub max_gi: Option<u8>,
}

impl From<&PreferenceArgs> for SearchPreferences {
    fn from(args: &PreferenceArgs) -> Self {
        Self {
            vegetarian: args.vegetarian,
            vegan: args.vegan,
            gluten_free: args.gluten_free,
            low_carb: args.low_carb,
            low_gi: args.low_gi,
            diabetic_friendly: args.diabetic_friendly,
            quick: args.quick,
            max_carbs: args.max_carbs,
            max_gi: args.max_gi,
        }
    }
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Find or generate recipes for a set of ingredients
    #[command(
        about = "Find or generate recipes",
        long_about = "Look up the curated catalog for a matching recipe and generate new ones when nothing fits."
    )]
    Generate {
        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        preferences: PreferenceArgs,

        /// Stream tokens from the local backend as they arrive
        #[arg(long, help = "Stream tokens from the local backend as they arrive")]
        stream: bool,

        /// Print the result as JSON
        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },

    /// Search the curated catalog only
    #[command(about = "Search the curated catalog only")]
    Search {
        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        preferences: PreferenceArgs,

        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },

    /// Check which generation backends are usable
    #[command(about = "Check which generation backends are usable")]
    Probe,

    /// Show or update provider settings
    #[command(
        about = "Show or update provider settings",
        long_about = "Show the current configuration, or update settings for one provider and save them."
    )]
    Config {
        #[arg(short, long, help = "Provider to update: gemini or ollama")]
        provider: Option<String>,

        #[arg(long, help = "API key for the provider")]
        api_key: Option<String>,

        #[arg(long, help = "Model for the provider")]
        model: Option<String>,

        #[arg(long, help = "Base URL for the provider")]
        base_url: Option<String>,

        #[arg(long, help = "Request timeout in seconds")]
        timeout: Option<u64>,

        #[arg(long, help = "Maximum concurrent generations")]
        max_concurrent: Option<usize>,

        #[arg(long, help = "JSON seed file for the curated catalog")]
        catalog: Option<PathBuf>,
    },
}

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Yellow.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Main function to parse arguments and handle the command
pub async fn main() -> Result<()> {
    let cli = parse_args();

    if cli.version {
        println!(
            "{} {} {}",
            "kitchen-helper".green().bold(),
            "version".cyan(),
            crate_version!().yellow()
        );
        return Ok(());
    }

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
    } else {
        crate::logger::disable_logging();
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::get_config_path()?,
    };

    if let Some(command) = cli.command {
        handle_command(command, &config_path).await
    } else {
        let _ = Cli::parse_from(["kitchen-helper", "--help"]);
        Ok(())
    }
}

fn load_config(path: &std::path::Path) -> Result<Config> {
    let mut config = Config::load_from(path)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    log_debug!("Configuration loaded from {}", path.display());
    Ok(config)
}

fn load_catalog(config: &Config) -> Result<Option<CatalogSearch>> {
    let Some(seed) = &config.catalog.seed_path else {
        return Ok(None);
    };
    let catalog = InMemoryCatalog::load_json(seed)
        .with_context(|| format!("Failed to load catalog from {}", seed.display()))?;
    Ok(Some(CatalogSearch::new(Arc::new(catalog))))
}

async fn build_coordinator(config: &Config) -> Result<GenerationCoordinator> {
    let admission = Arc::new(AdmissionController::new(config.admission.max_concurrent));
    let orchestrator = ProviderOrchestrator::from_config(config).await?;
    let mut coordinator = GenerationCoordinator::new(admission, Arc::new(orchestrator));
    if let Some(catalog) = load_catalog(config)? {
        coordinator = coordinator.with_catalog(catalog);
    }
    Ok(coordinator)
}

/// Cancel `token` on Ctrl-C
fn cancel_on_interrupt(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

fn user_facing(err: &GenerationError, catalog_fallback: bool) -> anyhow::Error {
    if let Some(raw) = err.raw_output() {
        log_debug!("Raw backend output: {raw}");
    }
    log_error!("Generation failed: {err}");
    anyhow!(err.user_message(catalog_fallback))
}

/// Handle the command based on parsed arguments
pub async fn handle_command(command: Commands, config_path: &std::path::Path) -> Result<()> {
    match command {
        Commands::Generate {
            request,
            preferences,
            stream,
            json,
        } => {
            let config = load_config(config_path)?;
            if stream {
                handle_stream(&config, &request, json).await
            } else {
                handle_generate(&config, &request, &preferences, json).await
            }
        }
        Commands::Search {
            request,
            preferences,
            json,
        } => {
            let config = load_config(config_path)?;
            handle_search(&config, &request, &preferences, json).await
        }
        Commands::Probe => {
            let config = load_config(config_path)?;
            handle_probe(&config).await
        }
        Commands::Config {
            provider,
            api_key,
            model,
            base_url,
            timeout,
            max_concurrent,
            catalog,
        } => handle_config(
            config_path,
            provider,
            api_key,
            model,
            base_url,
            timeout,
            max_concurrent,
            catalog,
        ),
    }
}

async fn handle_generate(
    config: &Config,
    args: &RequestArgs,
    preferences: &PreferenceArgs,
    json: bool,
) -> Result<()> {
    let request = args.build(GenerationMode::Batch)?;
    let coordinator = build_coordinator(config).await?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let outcome = coordinator
        .generate(&request, &SearchPreferences::from(preferences), &cancel)
        .await
        .map_err(|e| user_facing(&e, coordinator.has_catalog()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        GenerationOutcome::Catalog { recipe } => print_catalog_entry(&recipe, request.carb_unit()),
        GenerationOutcome::Generated { recipes } => {
            for recipe in &recipes {
                print_generated_recipe(recipe, request.carb_unit());
            }
        }
    }
    Ok(())
}

async fn handle_stream(config: &Config, args: &RequestArgs, json: bool) -> Result<()> {
    let request = args.build(GenerationMode::Streaming)?;
    let coordinator = build_coordinator(config).await?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let mut stream = coordinator
        .generate_streaming(&request, cancel)
        .await
        .map_err(|e| user_facing(&e, coordinator.has_catalog()))?;

    let mut stdout = std::io::stdout();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(|e| user_facing(&e, coordinator.has_catalog()))?;
        if !json {
            print!("{fragment}");
            stdout.flush()?;
        }
    }
    println!();

    let recipes = stream
        .finish()
        .await
        .map_err(|e| user_facing(&e, coordinator.has_catalog()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else {
        println!(
            "{}",
            format!("Parsed {} recipes from the stream", recipes.len()).green()
        );
    }
    Ok(())
}

async fn handle_search(
    config: &Config,
    args: &RequestArgs,
    preferences: &PreferenceArgs,
    json: bool,
) -> Result<()> {
    let request = args.build(GenerationMode::Batch)?;
    let Some(catalog) = load_catalog(config)? else {
        return Err(anyhow!(
            "No catalog configured. Set one with `kitchen-helper config --catalog <file>`."
        ));
    };

    let preferences = SearchPreferences::from(preferences)
        .merged(SearchPreferences::from_diet_tags(request.diet_tags()));
    let hit = catalog.search(&request, &preferences).await?;

    match (hit, json) {
        (Some(entry), true) => println!("{}", serde_json::to_string_pretty(&entry)?),
        (Some(entry), false) => print_catalog_entry(&entry, request.carb_unit()),
        (None, true) => println!("null"),
        (None, false) => println!("{}", "No matching catalog recipe".yellow()),
    }
    Ok(())
}

async fn handle_probe(config: &Config) -> Result<()> {
    let orchestrator = ProviderOrchestrator::from_config(config).await?;

    let gemini = if orchestrator.is_fast_configured() {
        "configured".green()
    } else {
        "no API key".yellow()
    };
    let ollama = if orchestrator.is_local_available() {
        "reachable".green()
    } else {
        "unreachable".red()
    };

    let ollama_config = config.provider_config(Provider::Ollama);
    println!("{:<8} {gemini}", Provider::Gemini.name().bold());
    println!(
        "{:<8} {ollama} ({})",
        Provider::Ollama.name().bold(),
        ollama_config.effective_base_url(Provider::Ollama)
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_config(
    config_path: &std::path::Path,
    provider: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout: Option<u64>,
    max_concurrent: Option<usize>,
    catalog: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load_from(config_path)?;
    let mut changed = false;

    if let Some(name) = provider {
        let provider: Provider = name.parse()?;
        config.update(provider, api_key, model, base_url, timeout);
        changed = true;
    } else if api_key.is_some() || model.is_some() || base_url.is_some() || timeout.is_some() {
        return Err(anyhow!("--provider is required when changing provider settings"));
    }

    if let Some(max) = max_concurrent {
        config.admission.max_concurrent = max;
        changed = true;
    }
    if let Some(path) = catalog {
        config.catalog.seed_path = Some(path);
        changed = true;
    }

    if changed {
        config.validate()?;
        config.save_to(config_path)?;
        println!(
            "{} {}",
            "Configuration saved to".green(),
            config_path.display()
        );
    } else {
        let mut shown = config.clone();
        for provider_config in shown.providers.values_mut() {
            if provider_config.has_api_key() {
                provider_config.api_key = "********".to_string();
            }
        }
        println!("{}", toml::to_string_pretty(&shown)?);
    }
    Ok(())
}

fn print_generated_recipe(recipe: &GeneratedRecipe, unit: CarbUnit) {
    println!("{}", recipe.name.green().bold());
    if !recipe.description.is_empty() {
        println!("{}", recipe.description);
    }

    let units = recipe
        .nutrition_per_serving
        .carb_units(unit)
        .map_or_else(String::new, |v| format!(", {v} {unit}"));
    println!(
        "{} {}/5  {} {}  {} {:.0} kcal, {:.0} g carbs{units}",
        "difficulty".cyan(),
        recipe.difficulty,
        "time".cyan(),
        recipe.cooking_time,
        "per serving".cyan(),
        recipe.nutrition_per_serving.calories,
        recipe.nutrition_per_serving.carbs,
    );

    for ingredient in &recipe.ingredients {
        println!("  - {} {}", ingredient.amount, ingredient.name);
    }
    if !recipe.method.is_empty() {
        println!("{}", recipe.method);
    }
    if !recipe.leftover_tips.is_empty() {
        println!("{} {}", "leftovers:".yellow(), recipe.leftover_tips);
    }
    if let Some(provider) = recipe.provider {
        println!("{}", format!("generated by {provider}").dimmed());
    }
    println!();
}

fn print_catalog_entry(entry: &CatalogEntry, unit: CarbUnit) {
    println!(
        "{} {}",
        entry.name.green().bold(),
        format!("(catalog, score {:.0})", entry.quality_score).dimmed()
    );
    if !entry.description.is_empty() {
        println!("{}", entry.description);
    }
    println!(
        "{} {} min  {} {} kcal, {:.0} g carbs, {} {unit}, GI {}",
        "time".cyan(),
        entry.total_time_min(),
        "per serving".cyan(),
        entry.nutrition.calories,
        entry.nutrition.carbs,
        entry.carb_units(unit),
        entry.gi
    );
    for ingredient in &entry.ingredients {
        println!("  - {} {}", ingredient.amount, ingredient.name);
    }
    for (step, instruction) in entry.instructions.iter().enumerate() {
        println!("{}. {instruction}", step + 1);
    }
}
