use super::ui;
use crate::core::{CategoryFilter, CurrencySnapshot, FinanceStore, LoadState, NumberLocale, QuoteRow};
use anyhow::{Result, anyhow};
use comfy_table::Cell;
use std::time::Duration;
use tracing::debug;

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Renders one category as a table of quotes.
pub fn render_category(category: CategoryFilter, rows: &[QuoteRow], snapshot: &CurrencySnapshot) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Currency"),
        ui::header_cell("Buy"),
        ui::header_cell("Sell"),
        ui::header_cell("Variation"),
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(row.code.as_str()),
            Cell::new(&row.name),
            ui::amount_cell(&row.buy),
            ui::amount_cell(&row.sell),
            ui::variation_cell(&row.variation, row.direction),
        ]);
    }

    let mut output = format!(
        "{}\n\n",
        ui::style_text(&category.to_string(), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n{}",
        ui::style_text(
            &format!(
                "Updated at {}",
                snapshot.fetched_at().format("%Y-%m-%d %H:%M:%S UTC")
            ),
            ui::StyleType::Subtle
        )
    ));
    output
}

fn stale_rows(locale: &NumberLocale, snapshot: &CurrencySnapshot, category: CategoryFilter) -> Vec<QuoteRow> {
    snapshot
        .entries(category)
        .iter()
        .map(|(code, quote)| QuoteRow::new(locale, *code, quote))
        .collect()
}

fn print_categories(categories: &[CategoryFilter], render: impl Fn(CategoryFilter) -> String) {
    let count = categories.len();
    for (i, category) in categories.iter().enumerate() {
        println!("{}", render(*category));
        if i + 1 < count {
            ui::print_separator();
        }
    }
}

/// Waits for the store to settle, reloading up to `retries` times after a
/// failure.
pub async fn settle(store: &FinanceStore, retries: usize) -> LoadState {
    let pb = ui::new_spinner("Fetching quotes...");
    let mut state = store.wait_until_settled().await;

    let mut attempt = 0;
    while let Some(error) = state.error() {
        if attempt >= retries {
            break;
        }
        attempt += 1;
        debug!("Attempt {}/{} failed: {}. Retrying...", attempt, retries, error);
        tokio::time::sleep(RETRY_DELAY).await;
        store.reload();
        state = store.wait_until_settled().await;
    }
    pb.finish_and_clear();
    state
}

/// Settles the store, then prints the requested categories.
pub async fn run(store: &FinanceStore, categories: &[CategoryFilter], retries: usize) -> Result<()> {
    match settle(store, retries).await {
        LoadState::Loaded(snapshot) => {
            print_categories(categories, |category| {
                render_category(category, &store.display_rows(category), &snapshot)
            });
            Ok(())
        }
        LoadState::Failed { error, previous } => {
            eprintln!("{}", ui::style_text(&error, ui::StyleType::Error));
            if let Some(snapshot) = previous {
                eprintln!(
                    "{}",
                    ui::style_text("Showing last known quotes", ui::StyleType::Warning)
                );
                print_categories(categories, |category| {
                    let rows = stale_rows(store.locale(), &snapshot, category);
                    render_category(category, &rows, &snapshot)
                });
            }
            Err(anyhow!(error))
        }
        LoadState::Idle | LoadState::Loading => Err(anyhow!("Quotes were never requested")),
    }
}
