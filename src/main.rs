use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use adbook::remote::memory::InMemoryService;
use adbook::scroll::{ManualVisibility, VisibilitySource};
use adbook::{
    Direction, ExportStatus, OrderBy, QueryState, ReviewSession, Search, SearchField,
    SessionConfig, SortField, decode_params,
};

#[derive(Parser)]
#[command(name = "adbook")]
#[command(about = "Billing review for ad campaigns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List line items for a view
    #[command(visible_alias = "ls")]
    List {
        /// Raw location query string, e.g. "searchField=line_item&searchValue=Car"
        #[arg(short, long)]
        query: Option<String>,

        /// Filter to one campaign
        #[arg(short, long, conflicts_with = "query")]
        campaign: Option<u64>,

        /// Search field: line_item or campaign
        #[arg(long, requires = "search_value", conflicts_with = "query")]
        search_field: Option<String>,

        /// Search text
        #[arg(long, requires = "search_field", conflicts_with = "query")]
        search_value: Option<String>,

        /// Sort field (canonical name, e.g. billableAmount)
        #[arg(short = 'o', long, conflicts_with = "query", value_parser = parse_sort_field)]
        order_by: Option<SortField>,

        /// Sort descending instead of ascending
        #[arg(long, requires = "order_by", conflicts_with = "query")]
        desc: bool,

        /// How many pages to scroll in (0 = all)
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },

    /// Edit a line item's adjustments
    Adjust {
        /// Line item id
        id: u64,
        /// New adjustments value
        value: f64,
    },

    /// Toggle a line item's reviewed flag
    Review {
        /// Line item id
        id: u64,
        /// Un-review instead of review
        #[arg(long)]
        revoke: bool,
    },

    /// Toggle a campaign's reviewed flag, cascading to its line items
    ReviewCampaign {
        /// Campaign id
        id: u64,
        /// Un-review instead of review
        #[arg(long)]
        revoke: bool,
    },

    /// Export line items as CSV and wait for the job to finish
    Export {
        /// Restrict to one campaign
        #[arg(short, long)]
        campaign: Option<u64>,
    },
}

fn parse_sort_field(s: &str) -> Result<SortField, String> {
    SortField::from_canonical(s).ok_or_else(|| {
        let valid: Vec<&str> = SortField::ALL.iter().map(|f| f.canonical()).collect();
        format!("unknown sort field '{s}', expected one of: {}", valid.join(", "))
    })
}

fn new_session() -> ReviewSession<InMemoryService> {
    ReviewSession::with_config(
        InMemoryService::with_sample_data(),
        SessionConfig {
            debounce: Duration::from_millis(50),
            page_size: Some(25),
        },
    )
}

fn print_view(session: &ReviewSession<InMemoryService>) {
    if let Some(campaign) = session.cache().campaign() {
        let flag = if campaign.reviewed { "[reviewed]" } else { "" };
        println!("campaign #{}: {} {flag}", campaign.id, campaign.name);
    }
    println!(
        "{:>5}  {:<28} {:>14} {:>14} {:>12} {:>14}  {}",
        "id", "name", "booked", "actual", "adjustments", "billable", "reviewed"
    );
    for item in session.cache().line_items() {
        println!(
            "{:>5}  {:<28} {:>14.2} {:>14.2} {:>12.2} {:>14.2}  {}",
            item.id,
            item.name,
            item.booked_amount,
            item.actual_amount,
            item.adjustments,
            item.billable_amount(),
            if item.reviewed { "yes" } else { "no" }
        );
    }
    println!(
        "-- {} of set loaded, billable total {:.2}{}",
        session.cache().len(),
        session.cache().total(),
        if session.cache().has_next_page() {
            " (more available)"
        } else {
            ""
        }
    );
}

async fn cmd_list(state: QueryState, pages: usize) -> adbook::Result<()> {
    let mut session = new_session();
    session.set_query_state(state).await;

    // Scroll the sentinel in and out through the abstract visibility
    // contract, one exposure per extra page
    let observer = ManualVisibility::new();
    let exposures: Rc<RefCell<Vec<bool>>> = Rc::default();
    let sink = Rc::clone(&exposures);
    let _subscription = observer.on_visibility_change(Box::new(move |visible| {
        sink.borrow_mut().push(visible);
    }));

    let mut loaded_pages = 1;
    while session.cache().has_next_page() && (pages == 0 || loaded_pages < pages) {
        observer.notify(true);
        observer.notify(false);
        for visible in exposures.borrow_mut().drain(..) {
            session.handle_visibility(visible).await;
        }
        loaded_pages += 1;
    }

    if let Some(error) = session.take_last_error() {
        eprintln!("warning: {error}");
    }
    print_view(&session);
    Ok(())
}

async fn cmd_adjust(id: u64, value: f64) -> adbook::Result<()> {
    let mut session = new_session();
    session.set_query_state(QueryState::default()).await;

    // Make sure the target row is cached before editing
    while session.cache().get(id).is_none() && session.cache().has_next_page() {
        session.handle_visibility(true).await;
        session.handle_visibility(false).await;
    }

    session.edit_adjustments(id, value, Instant::now())?;
    session.flush_pending_edits().await;
    if let Some(error) = session.take_last_error() {
        eprintln!("warning: {error}");
    } else {
        let item = session
            .cache()
            .get(id)
            .ok_or_else(|| adbook::AdbookError::LineItemNotFound(id.to_string()))?;
        println!(
            "line item #{id} adjustments set to {value:.2}, billable {:.2}, view total {:.2}",
            item.billable_amount(),
            session.cache().total()
        );
    }
    Ok(())
}

async fn cmd_review(id: u64, revoke: bool) -> adbook::Result<()> {
    // One shared backend: the lookup session and the campaign-view session
    // must observe the same records
    let service = InMemoryService::with_sample_data();

    let mut lookup = ReviewSession::new(service.clone());
    lookup.set_query_state(QueryState::default()).await;
    while lookup.cache().get(id).is_none() && lookup.cache().has_next_page() {
        lookup.handle_visibility(true).await;
        lookup.handle_visibility(false).await;
    }
    let campaign_id = lookup
        .cache()
        .get(id)
        .ok_or_else(|| adbook::AdbookError::LineItemNotFound(id.to_string()))?
        .campaign_id;

    let mut session = ReviewSession::new(service);
    session
        .set_query_state(QueryState {
            campaign: Some(campaign_id),
            ..Default::default()
        })
        .await;
    session.toggle_review(id, !revoke).await?;
    if let Some(error) = session.take_last_error() {
        eprintln!("warning: {error}");
    }
    print_view(&session);
    Ok(())
}

async fn cmd_review_campaign(id: u64, revoke: bool) -> adbook::Result<()> {
    let mut session = new_session();
    session
        .set_query_state(QueryState {
            campaign: Some(id),
            ..Default::default()
        })
        .await;
    session.toggle_campaign_review(!revoke).await?;
    if let Some(error) = session.take_last_error() {
        eprintln!("warning: {error}");
    }
    print_view(&session);
    Ok(())
}

async fn cmd_export(campaign: Option<u64>) -> adbook::Result<()> {
    let mut session = new_session();
    session
        .set_query_state(QueryState {
            campaign,
            ..Default::default()
        })
        .await;

    let token = session.submit_export().await?;
    println!("export submitted, token {token}");

    loop {
        let exportation = session.poll_export(&token).await?;
        if exportation.status == ExportStatus::Finished {
            println!(
                "export finished: {}",
                exportation.url.as_deref().unwrap_or("(no url)")
            );
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List {
            query,
            campaign,
            search_field,
            search_value,
            order_by,
            desc,
            pages,
        } => {
            let state = match query {
                Some(query) => decode_params(&query),
                None => {
                    let search = match (search_field, search_value) {
                        (Some(field), Some(value)) => match field.parse::<SearchField>() {
                            Ok(field) => Some(Search { field, value }),
                            Err(e) => {
                                eprintln!("error: {e}");
                                return ExitCode::FAILURE;
                            }
                        },
                        _ => None,
                    };
                    QueryState {
                        campaign,
                        search,
                        order_by: order_by.map(|field| OrderBy {
                            field,
                            direction: if desc { Direction::Desc } else { Direction::Asc },
                        }),
                    }
                }
            };
            cmd_list(state, pages).await
        }
        Commands::Adjust { id, value } => cmd_adjust(id, value).await,
        Commands::Review { id, revoke } => cmd_review(id, revoke).await,
        Commands::ReviewCampaign { id, revoke } => cmd_review_campaign(id, revoke).await,
        Commands::Export { campaign } => cmd_export(campaign).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
