mod auth;
mod browser;
mod catalog;
mod config;
mod favorites;
mod models;
mod query;
mod storage;
mod tui;
mod welcome;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use auth::{AuthSession, FirebaseProvider};
use catalog::Catalog;
use config::Config;
use favorites::Favorites;
use models::{ExperienceLevel, JobListing, JobType, SalaryRange, SortMode};
use query::QueryState;
use storage::SqliteStore;
use welcome::FirstVisitGate;

#[derive(Parser)]
#[command(name = "jobseeker")]
#[command(about = "Find your next dream job - search, filter and save job listings")]
struct Cli {
    /// Seed for the listing catalog (fixes the "posted" text across runs)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search listings and print one page of results
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Browse listings interactively
    Browse {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Show listing details
    Show {
        /// Job ID
        id: u32,
    },

    /// Open a listing's application page in the browser
    Apply {
        /// Job ID
        id: u32,
    },

    /// Save or unsave a listing
    Save {
        /// Job ID
        id: u32,
    },

    /// List saved listings
    Favorites,

    /// Sign in, sign up or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Show where state is kept and who is signed in
    Status,
}

#[derive(Args)]
struct QueryArgs {
    /// Match against job titles
    #[arg(short, long, default_value = "")]
    query: String,

    /// Match against city, state, zip code or country
    #[arg(short, long, default_value = "")]
    location: String,

    /// Job type (full-time, part-time, contract, internship)
    #[arg(short = 't', long = "type")]
    job_type: Option<JobType>,

    /// Experience level (entry-level, mid-level, senior-level, executive)
    #[arg(short, long)]
    experience: Option<ExperienceLevel>,

    /// Salary range (under-50k, 50k-75k, 75k-100k, over-100k)
    #[arg(short, long)]
    salary: Option<SalaryRange>,

    /// Only remote listings
    #[arg(long)]
    remote: bool,

    /// Sort order (newest, oldest, salary)
    #[arg(long, default_value = "newest")]
    sort: SortMode,

    /// Page number, starting at 1
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
}

impl From<QueryArgs> for QueryState {
    fn from(args: QueryArgs) -> Self {
        QueryState {
            search_query: args.query,
            location_query: args.location,
            job_type: args.job_type,
            experience: args.experience,
            salary: args.salary,
            remote_only: args.remote,
            sort: args.sort,
            current_page: args.page,
        }
    }
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Path to a file holding the password
        #[arg(short, long)]
        password_file: String,
    },

    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,

        /// Path to a file holding the password
        #[arg(short, long)]
        password_file: String,

        /// Full name
        #[arg(short, long)]
        name: String,
    },

    /// Sign in with a Google account (reads GOOGLE_ID_TOKEN)
    Google,

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    let store = SqliteStore::open_default_or_in_memory(&config)?;

    if FirstVisitGate::new(&store).check_and_mark() {
        print_welcome();
    }

    let catalog = match cli.seed.or(config.seed) {
        Some(seed) => Catalog::from_seed(seed),
        None => Catalog::random(),
    };

    match cli.command {
        Commands::Search { query } => {
            let state = QueryState::from(query);
            let results = query::apply(catalog.listings(), &state);
            let favorites = Favorites::load(&store);

            println!("{} Jobs Found", results.total_matched);
            if state.location_query.is_empty() {
                println!("All locations");
            } else {
                println!("Jobs in \"{}\"", state.location_query);
            }

            if results.total_matched == 0 {
                println!("\nNo jobs found. Try adjusting your search criteria or filters.");
            } else if results.page.is_empty() {
                println!(
                    "\nPage {} is past the last page ({}).",
                    state.current_page, results.total_pages
                );
            } else {
                println!();
                println!(
                    "{:<5} {:<2} {:<36} {:<18} {:<22} {:<11} {:>12}",
                    "ID", "", "TITLE", "COMPANY", "LOCATION", "TYPE", "POSTED"
                );
                println!("{}", "-".repeat(112));
                for job in &results.page {
                    print_row(job, favorites.is_favorite(job.id));
                }
                println!("\nPage {} of {}", state.current_page, results.total_pages);
            }
        }

        Commands::Browse { query } => {
            let favorites = Favorites::load(&store);
            let mut session = AuthSession::new(&store);
            tui::run_browse(&catalog, QueryState::from(query), favorites, &mut session)?;
        }

        Commands::Show { id } => {
            let favorites = Favorites::load(&store);
            match catalog.get(id) {
                Some(job) => print_job(job, favorites.is_favorite(id)),
                None => println!("Job #{} not found.", id),
            }
        }

        Commands::Apply { id } => {
            let job = catalog
                .get(id)
                .ok_or_else(|| anyhow!("Job #{} not found", id))?;
            browser::open_link(&job.apply_link)?;
            println!("Opening {} ...", job.apply_link);
        }

        Commands::Save { id } => {
            let job = catalog
                .get(id)
                .ok_or_else(|| anyhow!("Job #{} not found", id))?;
            let mut favorites = Favorites::load(&store);
            favorites.toggle(id);
            if favorites.is_favorite(id) {
                println!("Saved #{} - {}", id, job.title);
            } else {
                println!("Removed #{} - {} from saved jobs", id, job.title);
            }
        }

        Commands::Favorites => {
            let favorites = Favorites::load(&store);
            let saved: Vec<&JobListing> = favorites
                .ids()
                .iter()
                .filter_map(|id| catalog.get(*id))
                .collect();
            if saved.is_empty() {
                println!("No saved jobs.");
            } else {
                println!("Saved jobs ({}):", saved.len());
                for job in saved {
                    print_row(job, true);
                }
            }
        }

        Commands::Auth { command } => {
            let mut session = AuthSession::new(&store);
            if !matches!(command, AuthCommands::Logout | AuthCommands::Whoami) {
                let provider = FirebaseProvider::from_config(&config)?;
                tracing::debug!("authenticating via {}", auth::AuthProvider::name(&provider));
                session = session.with_provider(Box::new(provider));
            }
            session.start();

            match command {
                AuthCommands::Login { email, password_file } => {
                    let password = read_password(&password_file)?;
                    match session.login(&email, &password) {
                        Ok(user) => println!("Logged in! Welcome back, {}.", user.display_name),
                        Err(e) => println!("{}", e),
                    }
                }

                AuthCommands::Signup { email, password_file, name } => {
                    let password = read_password(&password_file)?;
                    match session.signup(&email, &password, &name) {
                        Ok(user) => println!("Account created! Signed in as {}.", user.display_name),
                        Err(e) => println!("{}", e),
                    }
                }

                AuthCommands::Google => match session.sign_in_with_external_provider() {
                    Ok(user) => println!("Signed in with Google as {} <{}>", user.display_name, user.email),
                    Err(_) => println!("Google login failed"),
                },

                AuthCommands::Logout => {
                    if session.current_user().is_some() {
                        session.logout();
                        println!("Signed out.");
                    } else {
                        println!("Not signed in.");
                    }
                }

                AuthCommands::Whoami => match session.current_user() {
                    Some(user) => {
                        println!("{} <{}>", user.display_name, user.email);
                        println!("Signed in: {}", user.signed_in_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"));
                    }
                    None => println!("Not signed in."),
                },
            }

            session.stop();
        }

        Commands::Status => {
            if let Some(path) = store.path() {
                println!("State kept in {}", path.display());
            }
            println!("Listings: {}", catalog.len());
            println!("Saved jobs: {}", Favorites::load(&store).ids().len());
            let mut session = AuthSession::new(&store);
            session.start();
            match session.current_user() {
                Some(user) => println!("Signed in as {} <{}>", user.display_name, user.email),
                None => println!("Not signed in"),
            }
            session.stop();
        }
    }

    Ok(())
}

fn print_welcome() {
    eprintln!("Welcome to JobSeeker!");
    eprintln!("Discover hundreds of job opportunities from top companies worldwide. Start your career journey today!");
    eprintln!("  * Browse 100+ job listings");
    eprintln!("  * Save your favorite jobs      (jobseeker save <id>)");
    eprintln!("  * Advanced search filters      (jobseeker search --help)");
    eprintln!();
}

fn print_row(job: &JobListing, saved: bool) {
    println!(
        "{:<5} {:<2} {:<36} {:<18} {:<22} {:<11} {:>12}",
        job.id,
        if saved { "♥" } else { "" },
        truncate(&job.title, 34),
        truncate(&job.company, 16),
        truncate(&job.location, 20),
        job.job_type,
        job.posted
    );
}

fn print_job(job: &JobListing, saved: bool) {
    println!("Job #{}", job.id);
    println!("Title: {}", job.title);
    println!("Company: {} (rated {:.1})", job.company, job.rating);
    if job.is_remote {
        println!("Location: {}, {} (Remote)", job.location, job.country);
    } else {
        println!("Location: {}, {}", job.location, job.country);
    }
    println!("Salary: {} ({})", job.salary, job.salary_range);
    println!("Type: {} - {}", job.job_type, job.schedule);
    println!("Experience: {}", job.experience_level);
    println!("Posted: {}", job.posted);
    println!("Apply: {}", job.apply_link);
    println!("Saved: {}", if saved { "yes" } else { "no" });
    println!("\n{}", textwrap::fill(&job.description, 80));
    println!("\nRequirements:");
    for requirement in &job.requirements {
        println!("  - {}", requirement);
    }
}

fn read_password(password_file: &str) -> Result<String> {
    // Expand ~ in path
    let path = if let Some(rest) = password_file.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(password_file)
    };
    let password = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read password file: {}", path.display()))?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Google", 16), "Google");
        assert_eq!(truncate("Amazon Delivery Station", 10), "Amazon ...");
        assert_eq!(truncate("£35,000 - £45,000", 8), "£35,0...");
    }

    #[test]
    fn test_query_args_parse_into_state() {
        let cli = Cli::parse_from([
            "jobseeker", "search", "-q", "engineer", "--type", "full-time", "--salary", "over-100k",
            "--remote", "--sort", "oldest", "-p", "2",
        ]);
        let Commands::Search { query } = cli.command else {
            panic!("expected search");
        };
        let state = QueryState::from(query);
        assert_eq!(state.search_query, "engineer");
        assert_eq!(state.job_type, Some(JobType::FullTime));
        assert_eq!(state.salary, Some(SalaryRange::Over100k));
        assert!(state.remote_only);
        assert_eq!(state.sort, SortMode::Oldest);
        assert_eq!(state.current_page, 2);
        assert_eq!(state.experience, None);
    }

    #[test]
    fn test_query_args_defaults_match_fresh_state() {
        let cli = Cli::parse_from(["jobseeker", "search"]);
        let Commands::Search { query } = cli.command else {
            panic!("expected search");
        };
        assert_eq!(QueryState::from(query), QueryState::default());
    }

    #[test]
    fn test_bad_enum_value_is_rejected() {
        assert!(Cli::try_parse_from(["jobseeker", "search", "--type", "gig"]).is_err());
    }

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(Cli::try_parse_from(["jobseeker", "search", "--page", "0"]).is_err());
        assert!(Cli::try_parse_from(["jobseeker", "browse", "-p", "1"]).is_ok());
    }

    #[test]
    fn test_global_seed() {
        let cli = Cli::parse_from(["jobseeker", "show", "3", "--seed", "7"]);
        assert_eq!(cli.seed, Some(7));
    }
}
