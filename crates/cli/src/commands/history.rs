//! `fieldscribe history`: Search one HCP's interactions by name and date range.

use fieldscribe_core::HistoryQuery;
use fieldscribe_core::interaction::parse_calendar_date;

use super::{CmdResult, Output, load_config, open_store, print_record};

pub struct Args {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

impl Args {
    fn to_query(&self) -> Result<HistoryQuery, String> {
        Ok(HistoryQuery {
            start_date: self.from.as_deref().map(date_arg).transpose()?,
            end_date: self.to.as_deref().map(date_arg).transpose()?,
            page: self.page,
            ..HistoryQuery::for_name(&self.name).with_page_size(self.page_size)
        })
    }
}

fn date_arg(value: &str) -> Result<chrono::NaiveDate, String> {
    parse_calendar_date(value).ok_or_else(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

pub async fn run(args: Args, output: Output) -> CmdResult {
    let query = args.to_query()?;
    let config = load_config()?;
    let store = open_store(&config).await?;

    let page = store.fetch(&query).await?;
    if output.is_json() {
        return output.json(&page);
    }

    if page.records.is_empty() {
        println!("  No interactions found for '{}'.", args.name);
        return Ok(());
    }

    println!(
        "  '{}': page {} of {} ({} interactions)\n",
        args.name, page.current_page, page.total_pages, page.total_records
    );
    for record in &page.records {
        print_record(record);
        println!();
    }
    Ok(())
}
