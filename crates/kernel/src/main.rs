//! Seminars command-line query tool.
//!
//! Builds one bag from the command-line filters, runs it against
//! PostgreSQL and prints every record as one JSON line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use seminars_kernel::bag::EventRelated;
use seminars_kernel::config::Config;
use seminars_kernel::models::{Category, Event, Organizer, Place, Record, Registration, Speaker};
use seminars_kernel::store::PgStore;
use seminars_kernel::{BagBuilder, db};

#[derive(Debug, Parser)]
#[command(name = "seminars", version, about = "Query seminar records")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Events (topics, single events and dates).
    Events(EventArgs),
    /// Registrations for events.
    Registrations(RegistrationArgs),
    Categories(RelatedArgs),
    Organizers(RelatedArgs),
    Speakers(RelatedArgs),
    Places(RelatedArgs),
}

/// Filters every record type supports.
#[derive(Debug, Args)]
struct CommonArgs {
    /// Comma-separated container uids.
    #[arg(long, global = true, default_value = "")]
    containers: String,

    /// Sub-container levels to include below each container.
    #[arg(long, global = true, default_value_t = 0)]
    recursion: u32,

    /// Comma-separated uids to limit to.
    #[arg(long, global = true, default_value = "")]
    uids: String,

    /// Sort expression, e.g. "title DESC, uid".
    #[arg(long, global = true, default_value = "")]
    order_by: String,

    /// "count" or "offset,count"; defaults to one page.
    #[arg(long, global = true)]
    limit: Option<String>,

    /// Include hidden records.
    #[arg(long, global = true)]
    show_hidden: bool,
}

#[derive(Debug, Args)]
struct EventArgs {
    /// Time frame key, e.g. "currentAndUpcoming".
    #[arg(long)]
    time_frame: Option<String>,

    /// Full-text search terms.
    #[arg(long, default_value = "")]
    search: String,

    #[arg(long, default_value = "")]
    categories: String,

    #[arg(long, default_value = "")]
    organizers: String,

    #[arg(long, default_value = "")]
    places: String,

    #[arg(long, default_value = "")]
    speakers: String,

    #[arg(long, default_value = "")]
    event_types: String,

    #[arg(long, default_value = "")]
    cities: String,

    #[arg(long, default_value = "")]
    countries: String,

    #[arg(long, default_value = "")]
    languages: String,

    #[arg(long, default_value_t = 0.0)]
    max_price: f64,

    #[arg(long, default_value_t = 0.0)]
    min_price: f64,

    #[arg(long, default_value_t = 0)]
    age: i64,

    /// Only events with free seats.
    #[arg(long)]
    vacancies: bool,

    #[arg(long, conflicts_with = "dates_and_singles")]
    topics_only: bool,

    #[arg(long)]
    dates_and_singles: bool,

    #[arg(long)]
    ignore_canceled: bool,
}

#[derive(Debug, Args)]
struct RegistrationArgs {
    /// Event uid.
    #[arg(long)]
    event: Option<i64>,

    #[arg(long, conflicts_with = "unpaid")]
    paid: bool,

    #[arg(long)]
    unpaid: bool,

    #[arg(long, conflicts_with = "regular")]
    on_queue: bool,

    #[arg(long)]
    regular: bool,

    /// Front-end user uid, registered directly or as an additional person.
    #[arg(long)]
    attendee: Option<u32>,

    /// Sort expression on the registered event's columns.
    #[arg(long)]
    order_by_event: Option<String>,
}

#[derive(Debug, Args)]
struct RelatedArgs {
    /// Comma-separated event uids.
    #[arg(long, default_value = "")]
    events: String,

    /// Order by position on the event.
    #[arg(long)]
    sort_by_relation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let store = db::connect_store(&config)
        .await
        .context("failed to initialize record store")?;
    info!("Database connection established");

    match &cli.command {
        Command::Events(args) => {
            let mut builder = BagBuilder::<Event>::new();
            apply_event_args(&mut builder, args)?;
            run(builder, &cli.common, &config, &store).await
        }
        Command::Registrations(args) => {
            let mut builder = BagBuilder::<Registration>::new();
            apply_registration_args(&mut builder, args)?;
            run(builder, &cli.common, &config, &store).await
        }
        Command::Categories(args) => {
            run_related::<Category>(args, &cli.common, &config, &store).await
        }
        Command::Organizers(args) => {
            run_related::<Organizer>(args, &cli.common, &config, &store).await
        }
        Command::Speakers(args) => {
            run_related::<Speaker>(args, &cli.common, &config, &store).await
        }
        Command::Places(args) => {
            run_related::<Place>(args, &cli.common, &config, &store).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seminars=info,seminars_kernel=info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn apply_event_args(builder: &mut BagBuilder<Event>, args: &EventArgs) -> Result<()> {
    if let Some(frame) = &args.time_frame {
        builder.set_time_frame(frame)?;
    }
    builder
        .limit_to_full_text_search(&args.search)
        .limit_to_categories(&args.categories)
        .limit_to_organizers(&args.organizers)
        .limit_to_places(&args.places)
        .limit_to_speakers(&args.speakers)
        .limit_to_event_types(&args.event_types)
        .limit_to_cities(&args.cities)
        .limit_to_countries(&args.countries)
        .limit_to_languages(&args.languages);
    builder
        .limit_to_maximum_price(args.max_price)?
        .limit_to_minimum_price(args.min_price)?
        .limit_to_age(args.age)?;

    if args.vacancies {
        builder.limit_to_events_with_vacancies();
    }
    if args.topics_only {
        builder.limit_to_topic_records();
    }
    if args.dates_and_singles {
        builder.limit_to_date_and_single_records();
    }
    if args.ignore_canceled {
        builder.ignore_canceled_events();
    }
    Ok(())
}

fn apply_registration_args(
    builder: &mut BagBuilder<Registration>,
    args: &RegistrationArgs,
) -> Result<()> {
    if let Some(event) = args.event {
        builder.limit_to_seminar(event)?;
    }
    if args.paid {
        builder.limit_to_paid();
    } else if args.unpaid {
        builder.limit_to_unpaid();
    }
    if args.on_queue {
        builder.limit_to_on_queue();
    } else if args.regular {
        builder.limit_to_regular();
    }
    builder.limit_to_attendee(args.attendee);
    if let Some(order) = &args.order_by_event {
        builder.set_order_by_event_column(order)?;
    }
    Ok(())
}

async fn run_related<R: EventRelated>(
    args: &RelatedArgs,
    common: &CommonArgs,
    config: &Config,
    store: &PgStore,
) -> Result<()> {
    let mut builder = BagBuilder::<R>::new();
    builder.limit_to_events(&args.events)?;
    if args.sort_by_relation {
        builder.sort_by_relation_order()?;
    }
    run(builder, common, config, store).await
}

async fn run<R: Record>(
    mut builder: BagBuilder<R>,
    common: &CommonArgs,
    config: &Config,
    store: &PgStore,
) -> Result<()> {
    builder
        .set_containers(&common.containers, common.recursion)
        .limit_to_uids(&common.uids)?;
    if !common.order_by.is_empty() {
        builder.set_order_by(&common.order_by)?;
    }
    let limit = common
        .limit
        .clone()
        .unwrap_or_else(|| config.page_size.to_string());
    builder.set_limit(&limit)?;
    if common.show_hidden {
        builder.show_hidden_records();
    }

    let bag = builder.build(store).await.context("failed to build bag")?;
    for record in &bag {
        println!("{}", serde_json::to_string(record)?);
    }
    eprintln!("{} / {}", bag.count(), bag.count_without_limit());
    Ok(())
}
